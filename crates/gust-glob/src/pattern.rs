//! Path-aware glob patterns with globstar (`**`) support, and expansion of
//! a pattern against the real filesystem.
//!
//! - `tests/*.js` matches direct children of `tests/`
//! - `**/*.js` matches at any depth, including the top level
//! - `a/**/z` matches `a/z`, `a/b/z`, `a/b/c/z`
//!
//! Wildcard segments do not match dotfiles unless the segment itself starts
//! with a `.`, mirroring shell behavior.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::matcher::{contains_glob, glob_match};

/// Errors when parsing a path pattern.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,
}

/// One `/`-separated piece of a path pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Plain directory or file name with no metacharacters.
    Literal(String),
    /// Name with wildcards, matched with `glob_match`.
    Wildcard(String),
    /// `**`: zero or more directory components.
    Globstar,
}

/// A parsed path pattern.
///
/// # Examples
/// ```
/// use gust_glob::PathPattern;
/// use std::path::Path;
///
/// let pat = PathPattern::new("**/*.js").unwrap();
/// assert!(pat.matches(Path::new("smoke.js")));
/// assert!(pat.matches(Path::new("suites/api/load.js")));
/// assert!(!pat.matches(Path::new("suites/api/load.py")));
/// ```
#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<Segment>,
    anchored: bool,
}

impl PathPattern {
    /// Parse a pattern. Leading `/` anchors it to the filesystem root;
    /// consecutive globstars collapse into one.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let (pattern, anchored) = match pattern.strip_prefix('/') {
            Some(rest) => (rest, true),
            None => (pattern, false),
        };

        let mut segments = Vec::new();
        for part in pattern.split('/') {
            if part.is_empty() {
                continue;
            }
            if part == "**" {
                if !matches!(segments.last(), Some(Segment::Globstar)) {
                    segments.push(Segment::Globstar);
                }
            } else if contains_glob(part) {
                segments.push(Segment::Wildcard(part.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }
        if segments.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self { segments, anchored })
    }

    /// True when the pattern starts with `/`.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Match a path against this pattern, component-wise.
    pub fn matches(&self, path: &Path) -> bool {
        let parts: Vec<&str> = path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        Self::match_parts(&self.segments, &parts)
    }

    fn match_parts(segments: &[Segment], parts: &[&str]) -> bool {
        match segments.first() {
            None => parts.is_empty(),
            Some(Segment::Literal(name)) => {
                parts.first() == Some(&name.as_str())
                    && Self::match_parts(&segments[1..], &parts[1..])
            }
            Some(Segment::Wildcard(pat)) => match parts.first() {
                Some(part) => {
                    glob_match(pat, part) && Self::match_parts(&segments[1..], &parts[1..])
                }
                None => false,
            },
            Some(Segment::Globstar) => {
                // Try consuming zero, one, two, ... components.
                (0..=parts.len()).any(|skip| Self::match_parts(&segments[1..], &parts[skip..]))
            }
        }
    }
}

/// Expand a pattern against the filesystem rooted at `base`.
///
/// Returns every existing path the pattern matches, in a stable order
/// (directory entries are visited in name order). Anchored patterns walk
/// from `/` and return absolute paths; relative patterns walk from `base`
/// and return paths relative to it. Directories that match are included;
/// callers decide whether to keep them.
pub fn expand_pattern(pattern: &str, base: &Path) -> Result<Vec<PathBuf>, PatternError> {
    let pat = PathPattern::new(pattern)?;
    let (root, start): (PathBuf, PathBuf) = if pat.is_anchored() {
        (PathBuf::from("/"), PathBuf::from("/"))
    } else {
        (base.to_path_buf(), PathBuf::new())
    };
    let mut out = Vec::new();
    walk(&root, start, &pat.segments, &mut out);
    Ok(out)
}

/// Depth-first walk driven by the remaining pattern segments.
///
/// `rel` is the path accumulated so far; `root.join(&rel)` is the real
/// location on disk. Unreadable directories are skipped silently.
fn walk(root: &Path, rel: PathBuf, segments: &[Segment], out: &mut Vec<PathBuf>) {
    let Some(segment) = segments.first() else {
        if !rel.as_os_str().is_empty() {
            out.push(rel);
        }
        return;
    };

    match segment {
        Segment::Literal(name) => {
            let child = rel.join(name);
            if fs::symlink_metadata(root.join(&child)).is_ok() {
                walk(root, child, &segments[1..], out);
            }
        }
        Segment::Wildcard(pat) => {
            for name in list_sorted(&root.join(&rel)) {
                if hidden_mismatch(pat, &name) {
                    continue;
                }
                if glob_match(pat, &name) {
                    walk(root, rel.join(&name), &segments[1..], out);
                }
            }
        }
        Segment::Globstar => {
            // Zero components consumed.
            walk(root, rel.clone(), &segments[1..], out);
            // Or descend into each visible subdirectory and try again.
            for name in list_sorted(&root.join(&rel)) {
                if name.starts_with('.') {
                    continue;
                }
                let child = rel.join(&name);
                if root.join(&child).is_dir() {
                    walk(root, child, segments, out);
                }
            }
        }
    }
}

/// Dotfiles only match patterns that ask for them explicitly.
fn hidden_mismatch(pattern: &str, name: &str) -> bool {
    name.starts_with('.') && !pattern.starts_with('.')
}

/// Directory entries as UTF-8 names, sorted. Unreadable dirs yield nothing.
fn list_sorted(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}
