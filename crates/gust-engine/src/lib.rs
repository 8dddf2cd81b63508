//! gust-engine: test-run orchestration for k6-style load-test scripts.
//!
//! The engine discovers script files from glob patterns, dry-checks them
//! with the wrapped tool, builds the right invocation for local or cloud
//! execution, drives the children sequentially or in parallel with an
//! optional fail-fast policy, classifies their output in real time, and
//! folds exit statuses into one aggregate verdict.
//!
//! ```text
//!   patterns ──▶ resolve ──▶ validate ──▶ build commands
//!                                              │
//!                       ┌──────────────────────┘
//!                       ▼
//!                 Executor (spawn + registry)
//!                   │ stdout chunks        │ exit statuses
//!                   ▼                      ▼
//!              Classifier ──▶ ResultAggregator ──▶ ResultSink
//!                                          │
//!                                          ▼
//!                                     RunSummary
//! ```
//!
//! All fallible paths return [`EngineError`]; the binary that embeds the
//! engine makes the only exit-code decision.

pub mod classify;
pub mod command;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod resolve;
pub mod results;
pub mod signal;
pub mod validate;

pub use classify::{AsciiArtBanner, BannerFilter, Classifier};
pub use command::{
    build_run_command, compare_versions, detect_tool_version, split_flags, CloudConfig,
    RunCommand, CLOUD_RUN_MIN_VERSION,
};
pub use error::{EngineError, Result};
pub use executor::{Executor, ProcessRegistry, RunOutcome, RunReport, ScheduleMode};
pub use orchestrator::{orchestrate, RunConfig, RunSummary};
pub use resolve::resolve_scripts;
pub use results::{ResultAggregator, ResultSink};
pub use signal::install_interrupt_handler;
pub use validate::validate_scripts;
