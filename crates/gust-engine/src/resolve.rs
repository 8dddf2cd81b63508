//! Path resolution: glob patterns in, concrete script files out.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use gust_glob::expand_pattern;

/// Expand newline-separated glob patterns into a flat, order-stable,
/// deduplicated list of script paths, relative to `base`.
///
/// Directory matches are dropped: a path is excluded when `fs::metadata`
/// says it is a directory. A failed stat keeps the path — the run command
/// will surface the real problem with a better message than we could.
///
/// An empty result is not an error here; the orchestrator turns it into
/// [`EngineError::NoInput`](crate::EngineError::NoInput).
pub fn resolve_scripts(patterns: &str, base: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut scripts = Vec::new();

    for pattern in patterns.lines().map(str::trim).filter(|p| !p.is_empty()) {
        let matches = match expand_pattern(pattern, base) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(pattern, error = %e, "skipping unusable pattern");
                continue;
            }
        };
        for path in matches {
            if is_directory(&base.join(&path)) {
                continue;
            }
            if seen.insert(path.clone()) {
                scripts.push(path);
            }
        }
    }

    scripts
}

fn is_directory(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_dir(),
        // Stat failure: treat as "not a directory" and keep the path.
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gust-resolve-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn resolves_multiple_patterns_in_order() {
        let dir = scratch_dir("multi");
        File::create(dir.join("a.js")).unwrap();
        File::create(dir.join("b.js")).unwrap();
        File::create(dir.join("c.ts")).unwrap();

        let found = resolve_scripts("*.ts\n*.js", &dir);
        assert_eq!(
            found,
            vec![PathBuf::from("c.ts"), PathBuf::from("a.js"), PathBuf::from("b.js")]
        );
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn deduplicates_across_patterns() {
        let dir = scratch_dir("dedupe");
        File::create(dir.join("a.js")).unwrap();

        let found = resolve_scripts("*.js\na.js", &dir);
        assert_eq!(found, vec![PathBuf::from("a.js")]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn excludes_directories() {
        let dir = scratch_dir("nodirs");
        fs::create_dir_all(dir.join("load")).unwrap();
        File::create(dir.join("load.js")).unwrap();

        let found = resolve_scripts("load*", &dir);
        assert_eq!(found, vec![PathBuf::from("load.js")]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_match_yields_empty_list() {
        let dir = scratch_dir("empty");
        assert!(resolve_scripts("*.js", &dir).is_empty());
        assert!(resolve_scripts("", &dir).is_empty());
        assert!(resolve_scripts("\n  \n", &dir).is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }
}
