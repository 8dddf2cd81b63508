//! gust-glob: shell-style glob matching and filesystem pattern expansion.
//!
//! Provides:
//! - **glob_match**: single-segment matching with `*`, `?`, `[...]` classes
//!   and `{a,b}` brace expansion
//! - **PathPattern**: path-aware matching with `**` (globstar) support
//! - **expand_pattern**: walk the filesystem and collect every path a
//!   pattern matches, in a stable order
//!
//! Matching is work-bounded: adversarial patterns like `*a*a*a*...b` give up
//! after a fixed number of backtracking steps instead of burning CPU.

mod matcher;
mod pattern;

pub use matcher::{contains_glob, expand_braces, glob_match};
pub use pattern::{expand_pattern, PathPattern, PatternError, Segment};
