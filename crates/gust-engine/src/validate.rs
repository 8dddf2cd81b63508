//! Script validation: dry-check every candidate with the wrapped tool.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

/// Run `<tool> inspect --execution-requirements <flags> <path>` for every
/// candidate, all concurrently, and keep the scripts whose check exits 0.
///
/// Stdout is discarded (the inspection dump is noise here); stderr passes
/// through so the user sees the tool's own diagnostics for bad scripts.
/// A non-zero exit or a spawn failure excludes the script silently —
/// absence from the returned list is the signal.
///
/// Returns once every child has exited, preserving the input order of the
/// retained scripts regardless of completion order.
pub async fn validate_scripts(
    tool: &str,
    scripts: &[PathBuf],
    inspect_flags: &[String],
) -> Vec<PathBuf> {
    let mut checks = Vec::with_capacity(scripts.len());

    for script in scripts {
        let mut cmd = Command::new(tool);
        cmd.arg("inspect")
            .arg("--execution-requirements")
            .args(inspect_flags)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let script = script.clone();
        checks.push(tokio::spawn(async move {
            match cmd.status().await {
                Ok(status) if status.success() => Some(script),
                Ok(status) => {
                    tracing::debug!(
                        script = %script.display(),
                        code = ?status.code(),
                        "dry check rejected script"
                    );
                    None
                }
                Err(e) => {
                    tracing::debug!(
                        script = %script.display(),
                        error = %e,
                        "dry check could not start"
                    );
                    None
                }
            }
        }));
    }

    // Awaiting in submission order keeps the output ordered like the input.
    let mut kept = Vec::new();
    for check in checks {
        if let Ok(Some(script)) = check.await {
            kept.push(script);
        }
    }
    kept
}
