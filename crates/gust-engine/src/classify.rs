//! Output classification: separate progress noise from meaningful output
//! and pull structured result identifiers out of the stream.
//!
//! Classification is chunk-wise, not line-wise: the tool prints its
//! metadata block (script identity + result reference) and its startup
//! banner as multi-line writes, and the extraction patterns match against
//! the whole chunk. The classifier never fails — unmatched or malformed
//! input is forwarded or dropped, nothing else.

use std::sync::Arc;

use regex::Regex;

use crate::results::ResultAggregator;

/// Heuristic for the tool's decorative startup banner.
///
/// Kept behind a trait because the detection is cosmetic and fragile: it
/// matches the exact character set of an ASCII-art block that the wrapped
/// tool is free to redraw in any release. Swap the implementation, not the
/// classifier, when that happens.
pub trait BannerFilter: Send + Sync {
    fn is_banner(&self, chunk: &str) -> bool;
}

/// Default banner detection for the tool's box-drawing logo.
///
/// A chunk is the banner when it contains the trailing `.io` marker and
/// everything before the marker (after dropping `\r`) draws only from a
/// small set of art characters.
pub struct AsciiArtBanner;

impl AsciiArtBanner {
    const MARKER: &'static str = ".io";
    const ART_CHARS: &'static str = " \t\n/\\|‾_()";
}

impl BannerFilter for AsciiArtBanner {
    fn is_banner(&self, chunk: &str) -> bool {
        let Some(idx) = chunk.find(Self::MARKER) else {
            return false;
        };
        let head = chunk[..idx].replace('\r', "");
        !head.trim().is_empty() && head.chars().all(|c| Self::ART_CHARS.contains(c))
    }
}

/// Classifies raw stdout chunks from a running script.
///
/// Holds the extraction and progress patterns pre-compiled; one classifier
/// is shared by every process in a run.
pub struct Classifier {
    aggregator: Option<Arc<ResultAggregator>>,
    debug: bool,
    banner: Box<dyn BannerFilter>,
    script_line: Regex,
    output_line: Regex,
    cloud_wrapped: Regex,
    progress: Vec<Regex>,
}

impl Classifier {
    /// New classifier. `aggregator` of `None` disables result-reference
    /// extraction; `debug` forwards everything verbatim.
    pub fn new(aggregator: Option<Arc<ResultAggregator>>, debug: bool) -> Self {
        Self::with_banner_filter(aggregator, debug, Box::new(AsciiArtBanner))
    }

    pub fn with_banner_filter(
        aggregator: Option<Arc<ResultAggregator>>,
        debug: bool,
        banner: Box<dyn BannerFilter>,
    ) -> Self {
        Self {
            aggregator,
            debug,
            banner,
            script_line: Regex::new(r"(?m)^\s*script:\s*(.+?)\s*$").expect("static regex"),
            output_line: Regex::new(r"(?m)^\s*output:\s*(.+?)\s*$").expect("static regex"),
            cloud_wrapped: Regex::new(r"^cloud\s*\((.+)\)\s*$").expect("static regex"),
            progress: vec![
                // "running (0m01.0s), 10/10 VUs, 37 complete and 0 interrupted iterations"
                Regex::new(r"^running \([^)]*\), \d+(/\d+)? VUs").expect("static regex"),
                // "default   [  45% ] 10 VUs  0m04.5s/0m10.0s"
                Regex::new(r"\[\s*\d+%\s*\]").expect("static regex"),
                // "init [>---------] loading test script" and the run-phase twin
                Regex::new(r"^\s*(init|run)\s*\[").expect("static regex"),
                Regex::new(r"\d+ complete and \d+ interrupted iterations").expect("static regex"),
            ],
        }
    }

    /// Classify one chunk. Returns the text to forward to the visible log,
    /// or `None` to suppress the chunk entirely. May record a result
    /// reference in the aggregator as a side effect.
    pub async fn process_chunk(&self, chunk: &str) -> Option<String> {
        // 1. Metadata extraction, while the map still has room.
        if let Some(agg) = &self.aggregator {
            if !agg.is_complete().await {
                if let Some((script, reference)) = self.extract_reference(chunk) {
                    agg.insert(script, reference).await;
                    if !self.debug {
                        return None;
                    }
                }
            }
        }

        // 2. Decorative startup banner.
        if !self.debug && self.banner.is_banner(chunk) {
            return None;
        }

        // 3. Verbatim in debug mode; otherwise drop transient progress lines.
        if self.debug {
            return Some(chunk.to_string());
        }

        let lines: Vec<&str> = chunk.lines().collect();
        let kept: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|line| !self.is_progress(line))
            .collect();

        // Filtering emptied a multi-line chunk: forward nothing rather
        // than blank noise.
        if kept.is_empty() && lines.len() > 1 {
            return None;
        }

        let mut out = kept.join("\n");
        if out.trim().is_empty() {
            return None;
        }
        if chunk.ends_with('\n') {
            out.push('\n');
        }
        Some(out)
    }

    /// Pull a `script:` identity and an `output:` reference out of one
    /// chunk. Both lines must be present; the reference value may be
    /// wrapped as `cloud (<url>)` or stand bare.
    fn extract_reference(&self, chunk: &str) -> Option<(String, String)> {
        let script = self.script_line.captures(chunk)?[1].to_string();
        let raw = self.output_line.captures(chunk)?[1].to_string();
        let reference = match self.cloud_wrapped.captures(&raw) {
            Some(caps) => caps[1].to_string(),
            None => raw,
        };
        Some((script, reference))
    }

    fn is_progress(&self, line: &str) -> bool {
        self.progress.iter().any(|re| re.is_match(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultSink;
    use async_trait::async_trait;

    struct NullSink;

    #[async_trait]
    impl ResultSink for NullSink {
        async fn publish(&self, _results: &[(String, String)]) {}
    }

    fn aggregator(expected: usize) -> Arc<ResultAggregator> {
        Arc::new(ResultAggregator::new(expected, Box::new(NullSink)))
    }

    const BANNER: &str = "\
          /\\      |‾‾| /‾‾/   /‾‾/   \n\
     /\\  /  \\     |  |/  /   /  /    \n\
    /  \\/    \\    |     (   /   ‾‾\\  \n\
   /          \\   |  |\\  \\ |  (‾)  | \n\
  / __________ \\  |__| \\__\\ \\_____/ .io\n";

    const METADATA: &str = "\
  execution: local\n\
     script: a.js\n\
     output: cloud (https://app.example.test/runs/123)\n";

    #[tokio::test]
    async fn metadata_chunk_is_recorded_and_suppressed() {
        let agg = aggregator(1);
        let classifier = Classifier::new(Some(agg.clone()), false);

        let forwarded = classifier.process_chunk(METADATA).await;
        assert_eq!(forwarded, None);
        assert_eq!(
            agg.snapshot().await,
            vec![("a.js".to_string(), "https://app.example.test/runs/123".to_string())]
        );
    }

    #[tokio::test]
    async fn metadata_chunk_forwards_verbatim_in_debug() {
        let agg = aggregator(1);
        let classifier = Classifier::new(Some(agg.clone()), true);

        let forwarded = classifier.process_chunk(METADATA).await;
        assert_eq!(forwarded.as_deref(), Some(METADATA));
        // Still recorded.
        assert_eq!(agg.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn bare_url_reference_is_accepted() {
        let agg = aggregator(1);
        let classifier = Classifier::new(Some(agg.clone()), false);

        let chunk = "script: b.js\noutput: https://app.example.test/runs/9\n";
        assert_eq!(classifier.process_chunk(chunk).await, None);
        assert_eq!(
            agg.snapshot().await,
            vec![("b.js".to_string(), "https://app.example.test/runs/9".to_string())]
        );
    }

    #[tokio::test]
    async fn extraction_stops_at_full_cardinality() {
        let agg = aggregator(1);
        let classifier = Classifier::new(Some(agg.clone()), false);

        classifier.process_chunk(METADATA).await;
        // Map is full: the same shape of chunk is now classified like any
        // other output and forwarded.
        let chunk = "script: late.js\noutput: https://app.example.test/runs/7\n";
        let forwarded = classifier.process_chunk(chunk).await;
        assert!(forwarded.is_some());
        assert_eq!(agg.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn script_line_alone_is_not_extracted() {
        let agg = aggregator(1);
        let classifier = Classifier::new(Some(agg.clone()), false);

        let forwarded = classifier.process_chunk("script: a.js\n").await;
        assert_eq!(forwarded.as_deref(), Some("script: a.js\n"));
        assert!(agg.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn banner_is_suppressed() {
        let classifier = Classifier::new(None, false);
        assert_eq!(classifier.process_chunk(BANNER).await, None);
    }

    #[tokio::test]
    async fn banner_is_forwarded_in_debug() {
        let classifier = Classifier::new(None, true);
        assert_eq!(classifier.process_chunk(BANNER).await.as_deref(), Some(BANNER));
    }

    #[tokio::test]
    async fn marker_without_art_is_not_a_banner() {
        let classifier = Classifier::new(None, false);
        let chunk = "results uploaded to app.example.io\n";
        assert!(classifier.process_chunk(chunk).await.is_some());
    }

    #[tokio::test]
    async fn progress_only_chunk_forwards_nothing() {
        let classifier = Classifier::new(None, false);
        let gauge = "default   [  45% ] 10 VUs  0m04.5s/0m10.0s\n";
        assert_eq!(classifier.process_chunk(gauge).await, None);

        let running =
            "running (0m01.0s), 10/10 VUs, 37 complete and 0 interrupted iterations\n";
        assert_eq!(classifier.process_chunk(running).await, None);
    }

    #[tokio::test]
    async fn progress_chunk_is_verbatim_in_debug() {
        let classifier = Classifier::new(None, true);
        let gauge = "default   [  45% ] 10 VUs  0m04.5s/0m10.0s\n";
        assert_eq!(classifier.process_chunk(gauge).await.as_deref(), Some(gauge));
    }

    #[tokio::test]
    async fn mixed_chunk_keeps_meaningful_lines() {
        let classifier = Classifier::new(None, false);
        let chunk = "\
checks.........................: 100.00% 412 out of 412\n\
running (0m09.9s), 00/10 VUs, 412 complete and 0 interrupted iterations\n\
http_req_duration..............: avg=12ms\n";
        let forwarded = classifier.process_chunk(chunk).await.unwrap();
        assert!(forwarded.contains("checks"));
        assert!(forwarded.contains("http_req_duration"));
        assert!(!forwarded.contains("running ("));
    }

    #[tokio::test]
    async fn fully_filtered_multiline_chunk_is_dropped() {
        let classifier = Classifier::new(None, false);
        let chunk = "\
running (0m01.0s), 10/10 VUs, 1 complete and 0 interrupted iterations\n\
default   [  10% ] 10 VUs  0m01.0s/0m10.0s\n";
        assert_eq!(classifier.process_chunk(chunk).await, None);
    }

    #[tokio::test]
    async fn plain_output_passes_through() {
        let classifier = Classifier::new(None, false);
        let chunk = "time=\"12:00:00\" level=info msg=\"hello from script\"\n";
        assert_eq!(classifier.process_chunk(chunk).await.as_deref(), Some(chunk));
    }

    struct AlwaysBanner;
    impl BannerFilter for AlwaysBanner {
        fn is_banner(&self, _chunk: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn banner_filter_is_swappable() {
        let classifier = Classifier::with_banner_filter(None, false, Box::new(AlwaysBanner));
        assert_eq!(classifier.process_chunk("anything at all\n").await, None);
    }
}
