//! The top-level run driver.
//!
//! Every stage reports upward and the single exit-code decision is made by
//! whoever embeds the engine — there are no `process::exit` calls buried
//! in callbacks (the interrupt handler in [`crate::signal`] is the one
//! deliberate exception, and it sits at the very top of the lifecycle).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classify::Classifier;
use crate::command::{
    build_run_command, detect_tool_version, split_flags, CloudConfig, RunCommand,
};
use crate::error::{EngineError, Result};
use crate::executor::{Executor, ProcessRegistry, RunOutcome, RunReport, ScheduleMode};
use crate::resolve::resolve_scripts;
use crate::results::{ResultAggregator, ResultSink};
use crate::validate::validate_scripts;

/// Inputs for one orchestrated run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Newline-separated glob patterns naming the scripts to run.
    pub patterns: String,
    /// Run scripts concurrently instead of one at a time.
    pub parallel: bool,
    /// First failure aborts everything still pending or in flight.
    pub fail_fast: bool,
    /// Raw flag string appended to every run invocation, verbatim.
    pub flags: String,
    /// Raw flag string appended to every validation invocation, verbatim.
    pub inspect_flags: String,
    /// Associate results with a remote project.
    pub cloud: bool,
    /// Cloud mode variant: generate load locally, upload results.
    pub cloud_run_locally: bool,
    /// Stop after validation; run nothing.
    pub only_verify_scripts: bool,
    /// Forward all child output verbatim.
    pub debug: bool,
    /// Executable name of the wrapped tool.
    pub tool: String,
    /// Directory the patterns are resolved against.
    pub base: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            patterns: String::new(),
            parallel: false,
            fail_fast: false,
            flags: String::new(),
            inspect_flags: String::new(),
            cloud: false,
            cloud_run_locally: false,
            only_verify_scripts: false,
            debug: false,
            tool: "k6".to_string(),
            base: PathBuf::from("."),
        }
    }
}

/// What a finished run looked like.
#[derive(Debug)]
pub struct RunSummary {
    /// True iff every validated script passed (or validation-only mode
    /// completed). Drives the process exit code, but does not set it.
    pub verdict: bool,
    /// Per-script outcomes, empty in validation-only mode.
    pub outcomes: Vec<(PathBuf, RunOutcome)>,
    /// How many scripts survived validation.
    pub validated: usize,
}

/// Discover, validate, run, and summarize.
///
/// The `registry` should have an interrupt handler installed by the caller
/// before the first spawn; `sink` receives the finalized result-reference
/// map when cloud mode collects one.
pub async fn orchestrate(
    config: RunConfig,
    registry: Arc<ProcessRegistry>,
    sink: Box<dyn ResultSink>,
) -> Result<RunSummary> {
    if config.cloud_run_locally && !config.cloud {
        return Err(EngineError::ConfigConflict(
            "cloud-run-locally requires cloud mode to be enabled".to_string(),
        ));
    }

    let scripts = resolve_scripts(&config.patterns, &config.base)
        .into_iter()
        .map(|p| anchor(&config.base, p))
        .collect::<Vec<_>>();
    if scripts.is_empty() {
        return Err(EngineError::NoInput);
    }
    tracing::info!(count = scripts.len(), "discovered test scripts");

    let inspect_flags = split_flags(&config.inspect_flags);
    let valid = validate_scripts(&config.tool, &scripts, &inspect_flags).await;
    if valid.is_empty() {
        return Err(EngineError::NoValidScripts);
    }
    tracing::info!(valid = valid.len(), of = scripts.len(), "validation finished");

    if config.only_verify_scripts {
        println!("{} of {} scripts are valid", valid.len(), scripts.len());
        return Ok(RunSummary {
            verdict: true,
            outcomes: Vec::new(),
            validated: valid.len(),
        });
    }

    // The tool's version only matters for picking the cloud command form.
    // Failing to detect it is survivable; comparing malformed versions is not.
    let tool_version = if config.cloud {
        match detect_tool_version(&config.tool).await {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!(error = %e, "could not detect tool version, using older cloud invocation");
                None
            }
        }
    } else {
        None
    };

    let cloud = CloudConfig {
        enabled: config.cloud,
        run_locally: config.cloud_run_locally,
    };
    let flags = split_flags(&config.flags);
    let commands: Vec<RunCommand> = valid
        .iter()
        .map(|script| {
            build_run_command(&config.tool, script, &flags, cloud, tool_version.as_deref())
        })
        .collect::<Result<_>>()?;

    // Result references only exist in cloud mode; local runs have nothing
    // to extract.
    let aggregator = if config.cloud {
        Some(Arc::new(ResultAggregator::new(valid.len(), sink)))
    } else {
        None
    };
    let classifier = Arc::new(Classifier::new(aggregator, config.debug));

    let mode = if config.parallel {
        ScheduleMode::Parallel
    } else {
        ScheduleMode::Sequential
    };
    let executor = Executor::new(classifier, registry);
    let report = executor.run(commands, mode, config.fail_fast).await;

    print_outcomes(&report);
    Ok(RunSummary {
        verdict: report.all_passed(),
        outcomes: report.outcomes,
        validated: valid.len(),
    })
}

/// Join a resolved path onto the base directory, leaving paths alone when
/// the base is the current directory so display names stay short.
fn anchor(base: &Path, path: PathBuf) -> PathBuf {
    if base.as_os_str() == "." {
        path
    } else {
        base.join(path)
    }
}

fn print_outcomes(report: &RunReport) {
    for (script, outcome) in &report.outcomes {
        match outcome {
            RunOutcome::Passed => println!("✓ {} passed", script.display()),
            RunOutcome::Failed { code: Some(code), .. } => {
                println!("✗ {} failed (exit code {code})", script.display())
            }
            RunOutcome::Failed { signal: Some(signal), .. } => {
                println!("✗ {} failed (signal {signal})", script.display())
            }
            RunOutcome::Failed { .. } => println!("✗ {} failed", script.display()),
        }
    }
    let passed = report.outcomes.iter().filter(|(_, o)| o.passed()).count();
    println!("{passed} of {} scripts passed", report.outcomes.len());
    if report.aborted {
        println!("run aborted by fail-fast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NullSink;

    #[async_trait]
    impl ResultSink for NullSink {
        async fn publish(&self, _results: &[(String, String)]) {}
    }

    #[tokio::test]
    async fn cloud_run_locally_without_cloud_is_a_conflict() {
        let config = RunConfig {
            patterns: "*.js".to_string(),
            cloud_run_locally: true,
            ..RunConfig::default()
        };
        let err = orchestrate(config, Arc::new(ProcessRegistry::new()), Box::new(NullSink))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigConflict(_)));
    }

    #[tokio::test]
    async fn zero_matches_is_no_input() {
        let dir = std::env::temp_dir().join(format!("gust-orch-empty-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let config = RunConfig {
            patterns: "*.js".to_string(),
            base: dir.clone(),
            ..RunConfig::default()
        };
        let err = orchestrate(config, Arc::new(ProcessRegistry::new()), Box::new(NullSink))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoInput));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
