//! Result aggregation: the script → result-reference map and its
//! fire-once completion trigger.
//!
//! Every insert is followed by an explicit completion check; when the map
//! reaches the expected cardinality the sink is notified exactly once with
//! the finalized entries. There is no hidden write-interception — callers
//! see a plain `insert` and the trigger lives right next to it.

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Downstream consumer of the finalized result map.
///
/// The engine only guarantees *when* this fires (once, at full
/// cardinality); what publishing means — printing, posting, persisting —
/// is the implementor's business.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Receive the finalized `(script, reference)` pairs, in completion order.
    async fn publish(&self, results: &[(String, String)]);
}

struct Inner {
    entries: Vec<(String, String)>,
    published: bool,
}

/// Owns the result-reference map for one run.
///
/// Keys are unique, insertion order is completion order, and the map never
/// grows past the expected script count.
pub struct ResultAggregator {
    expected: usize,
    inner: Mutex<Inner>,
    sink: Box<dyn ResultSink>,
}

impl ResultAggregator {
    pub fn new(expected: usize, sink: Box<dyn ResultSink>) -> Self {
        Self {
            expected,
            inner: Mutex::new(Inner {
                entries: Vec::with_capacity(expected),
                published: false,
            }),
            sink,
        }
    }

    /// How many scripts this run expects references from.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// True once every expected reference has arrived.
    pub async fn is_complete(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.entries.len() >= self.expected
    }

    /// Record one script's result reference, then check for completion.
    ///
    /// Duplicate keys and inserts past the expected total are ignored.
    /// The insert that reaches full cardinality publishes to the sink —
    /// level-triggered, and only ever once per run.
    pub async fn insert(&self, script: String, reference: String) {
        let snapshot = {
            let mut inner = self.inner.lock().await;
            if inner.entries.len() >= self.expected {
                return;
            }
            if inner.entries.iter().any(|(s, _)| *s == script) {
                return;
            }
            inner.entries.push((script, reference));
            if inner.entries.len() == self.expected && !inner.published {
                inner.published = true;
                Some(inner.entries.clone())
            } else {
                None
            }
        };
        // Publish outside the lock; the sink may be slow or re-entrant.
        if let Some(entries) = snapshot {
            self.sink.publish(&entries).await;
        }
    }

    /// Copy of the entries collected so far, in completion order.
    pub async fn snapshot(&self) -> Vec<(String, String)> {
        self.inner.lock().await.entries.clone()
    }
}
