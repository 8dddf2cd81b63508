//! Error taxonomy for the orchestration engine.
//!
//! Per-script run failures are not errors — they are `RunOutcome::Failed`
//! values folded into the aggregate verdict. Everything here aborts the run
//! (or, for signal delivery, is logged and swallowed at the call site).

use thiserror::Error;

/// Fatal engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No test scripts matched any of the given glob patterns.
    #[error("no test scripts matched the given path patterns")]
    NoInput,

    /// Every candidate script failed the dry-check validation.
    #[error("no scripts passed validation")]
    NoValidScripts,

    /// A dependent setting was enabled without its prerequisite.
    #[error("configuration conflict: {0}")]
    ConfigConflict(String),

    /// Version strings with different segment counts cannot be compared.
    /// `"1.2"` vs `"1.2.0"` is a hard error, never padded.
    #[error("cannot compare versions {left:?} and {right:?}: segment counts differ")]
    VersionMismatch { left: String, right: String },

    /// A version string with a non-numeric segment.
    #[error("invalid version string: {0:?}")]
    InvalidVersion(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
