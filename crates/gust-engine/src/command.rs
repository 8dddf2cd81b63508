//! Command building: one fully-formed tool invocation per script.
//!
//! The wrapped tool's CLI grew a new cloud form (`<tool> cloud run`) partway
//! through its life; older installs only understand `<tool> cloud` and
//! `--out=cloud`. The builder keeps both shapes working by comparing the
//! installed version against [`CLOUD_RUN_MIN_VERSION`].

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use regex::Regex;
use tokio::process::Command;

use crate::error::{EngineError, Result};

/// First tool version whose CLI has the `cloud run` subcommand.
pub const CLOUD_RUN_MIN_VERSION: &str = "0.54.0";

/// Cloud-execution settings for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudConfig {
    /// Results are associated with a remote project.
    pub enabled: bool,
    /// Generate load locally and upload results, instead of running remotely.
    pub run_locally: bool,
}

/// An owned, fully-formed invocation bound to exactly one script.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCommand {
    /// Executable name, e.g. `k6`.
    pub program: String,
    /// Ordered argument list; the script path is always last.
    pub args: Vec<String>,
    /// The script this command runs.
    pub script: PathBuf,
}

impl RunCommand {
    /// The full command line as one string, for logs.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Split a raw flag string on whitespace, passing each token through
/// untouched. No quoting or escaping — the string reaches the child argv
/// exactly as typed.
pub fn split_flags(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(String::from).collect()
}

/// Build the invocation for one script.
///
/// `tool_version` is the installed tool's version when known; `None` falls
/// back to the older command forms. Decision table:
///
/// | cloud | run locally | has `cloud run` | command                              |
/// |-------|-------------|-----------------|--------------------------------------|
/// | no    | —           | —               | `run <flags> <path>`                 |
/// | yes   | yes         | no              | `run --out=cloud <flags> <path>`     |
/// | yes   | no          | no              | `cloud <flags> <path>`               |
/// | yes   | yes         | yes             | `cloud run --local-execution <flags> <path>` |
/// | yes   | no          | yes             | `cloud run <flags> <path>`           |
pub fn build_run_command(
    tool: &str,
    script: &Path,
    flags: &[String],
    cloud: CloudConfig,
    tool_version: Option<&str>,
) -> Result<RunCommand> {
    let mut args: Vec<String> = Vec::new();

    if !cloud.enabled {
        args.push("run".into());
    } else {
        let new_form = match tool_version {
            Some(version) => supports_cloud_run(version)?,
            None => false,
        };
        if new_form {
            args.push("cloud".into());
            args.push("run".into());
            if cloud.run_locally {
                args.push("--local-execution".into());
            }
        } else if cloud.run_locally {
            args.push("run".into());
            args.push("--out=cloud".into());
        } else {
            args.push("cloud".into());
        }
    }

    args.extend(flags.iter().cloned());
    args.push(script.to_string_lossy().into_owned());

    Ok(RunCommand {
        program: tool.to_string(),
        args,
        script: script.to_path_buf(),
    })
}

/// True when `version` is at least [`CLOUD_RUN_MIN_VERSION`].
pub fn supports_cloud_run(version: &str) -> Result<bool> {
    Ok(compare_versions(version, CLOUD_RUN_MIN_VERSION)? != Ordering::Less)
}

/// Numeric, dot-separated version comparison.
///
/// Both sides must have the same number of segments: `"1.2"` vs `"1.2.0"`
/// is [`EngineError::VersionMismatch`], not `Equal`. Mismatched arity is a
/// hard error by design — padding would silently change the comparison the
/// tool itself documents.
pub fn compare_versions(left: &str, right: &str) -> Result<Ordering> {
    let l = parse_segments(left)?;
    let r = parse_segments(right)?;
    if l.len() != r.len() {
        return Err(EngineError::VersionMismatch {
            left: left.to_string(),
            right: right.to_string(),
        });
    }
    Ok(l.cmp(&r))
}

fn parse_segments(version: &str) -> Result<Vec<u64>> {
    let trimmed = version.trim().trim_start_matches('v');
    if trimmed.is_empty() {
        return Err(EngineError::InvalidVersion(version.to_string()));
    }
    trimmed
        .split('.')
        .map(|seg| {
            seg.parse::<u64>()
                .map_err(|_| EngineError::InvalidVersion(version.to_string()))
        })
        .collect()
}

/// Ask the installed tool for its version (`<tool> version`) and extract
/// the dotted number from the banner line.
///
/// The caller decides how tolerant to be: the orchestrator logs a warning
/// and falls back to the older command forms when this fails.
pub async fn detect_tool_version(tool: &str) -> Result<String> {
    let output = Command::new(tool)
        .arg("version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await?;
    let text = String::from_utf8_lossy(&output.stdout);

    // e.g. "k6 v0.54.0 (go1.22.4, linux/amd64)"
    let re = Regex::new(r"v?(\d+(?:\.\d+)+)").expect("static regex");
    re.captures(&text)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| EngineError::InvalidVersion(text.trim().to_string()))
}
