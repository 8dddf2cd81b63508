//! gust CLI entry point.
//!
//! Usage:
//!   gust 'tests/*.js'                    # Run matching scripts locally
//!   gust --parallel 'tests/**/*.js'      # Run everything at once
//!   gust --only-verify-scripts '*.js'    # Validate without running
//!
//! Cloud mode switches on when K6_CLOUD_TOKEN is set in the environment —
//! the wrapped tool's own authentication contract.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gust_engine::{
    install_interrupt_handler, orchestrate, ProcessRegistry, ResultSink, RunConfig,
};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let cloud = env::var("K6_CLOUD_TOKEN").is_ok_and(|v| !v.is_empty());

    let action = match parse_args(&args, cloud) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Run 'gust --help' for usage.");
            return ExitCode::FAILURE;
        }
    };

    match action {
        Action::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Action::Version => {
            println!(
                "gust {} ({} {})",
                env!("CARGO_PKG_VERSION"),
                env!("GUST_GIT_HASH"),
                env!("GUST_BUILD_DATE")
            );
            ExitCode::SUCCESS
        }
        Action::Run(config) => match run(*config) {
            Ok(all_passed) => {
                if all_passed {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                eprintln!("Error: {e:?}");
                ExitCode::FAILURE
            }
        },
    }
}

#[derive(Debug)]
enum Action {
    Help,
    Version,
    Run(Box<RunConfig>),
}

/// Turn the raw argument list into a run configuration.
///
/// `cloud` is decided by the caller (from the environment) so parsing
/// stays a pure function of its inputs.
fn parse_args(args: &[String], cloud: bool) -> Result<Action, String> {
    let mut config = RunConfig {
        cloud,
        ..RunConfig::default()
    };
    let mut patterns: Vec<String> = Vec::new();

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Ok(Action::Help);
        } else if arg == "--version" || arg == "-V" {
            return Ok(Action::Version);
        } else if arg == "--parallel" {
            config.parallel = true;
        } else if arg == "--fail-fast" {
            config.fail_fast = true;
        } else if arg == "--cloud-run-locally" {
            config.cloud_run_locally = true;
        } else if arg == "--only-verify-scripts" {
            config.only_verify_scripts = true;
        } else if arg == "--debug" {
            config.debug = true;
        } else if let Some(raw) = arg.strip_prefix("--path=") {
            patterns.push(raw.to_string());
        } else if let Some(raw) = arg.strip_prefix("--flags=") {
            config.flags = raw.to_string();
        } else if let Some(raw) = arg.strip_prefix("--inspect-flags=") {
            config.inspect_flags = raw.to_string();
        } else if let Some(tool) = arg.strip_prefix("--tool=") {
            config.tool = tool.to_string();
        } else if arg.starts_with('-') {
            return Err(format!("unknown option: {arg}"));
        } else {
            patterns.push(arg.clone());
        }
    }

    if patterns.is_empty() {
        return Err("no script patterns given".to_string());
    }
    config.patterns = patterns.join("\n");
    Ok(Action::Run(Box::new(config)))
}

fn run(config: RunConfig) -> Result<bool> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let registry = Arc::new(ProcessRegistry::new());
        install_interrupt_handler(registry.clone());

        let summary = orchestrate(config, registry, Box::new(JsonSink)).await?;
        Ok(summary.verdict)
    })
}

/// Prints the finalized script → result-reference map as one JSON object,
/// for downstream steps to pick up from the run's output.
struct JsonSink;

#[async_trait]
impl ResultSink for JsonSink {
    async fn publish(&self, results: &[(String, String)]) {
        let map: serde_json::Map<String, serde_json::Value> = results
            .iter()
            .map(|(script, reference)| (script.clone(), reference.clone().into()))
            .collect();
        match serde_json::to_string_pretty(&map) {
            Ok(json) => println!("results: {json}"),
            Err(e) => tracing::error!(error = %e, "could not serialize results"),
        }
    }
}

fn print_help() {
    println!(
        r#"gust v{} — run a set of load-test scripts and roll up the verdict

Usage:
  gust [OPTIONS] <pattern>...

Patterns are glob expressions (*, ?, [...], {{a,b}}, **) matched against
files; directories are skipped. Cloud mode is enabled when K6_CLOUD_TOKEN
is set.

Options:
  --path=<patterns>        Additional patterns (newline-separated accepted)
  --parallel               Run all scripts concurrently
  --fail-fast              Abort the run on the first failing script
  --flags=<raw>            Extra flags for every run invocation
  --inspect-flags=<raw>    Extra flags for every validation invocation
  --cloud-run-locally      Cloud mode: generate load here, upload results
  --only-verify-scripts    Validate the scripts, run nothing
  --debug                  Forward all child output verbatim
  --tool=<name>            Wrapped executable (default: k6)
  -h, --help               Show this help
  -V, --version            Show version

Examples:
  gust 'tests/*.js'                      # Sequential local run
  gust --parallel --fail-fast 'perf/**'  # Concurrent, stop on failure
  K6_CLOUD_TOKEN=... gust 'tests/*.js'   # Stream results to the cloud
"#,
        env!("CARGO_PKG_VERSION")
    );
}
