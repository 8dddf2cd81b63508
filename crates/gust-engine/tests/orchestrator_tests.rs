//! End-to-end orchestration tests against a stand-in for the wrapped tool.
//!
//! A small shell script plays the tool: it answers `version`, accepts or
//! rejects scripts under `inspect`, and passes or fails `run`/`cloud`
//! invocations based on the script's file name.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gust_engine::{
    orchestrate, EngineError, ProcessRegistry, ResultSink, RunConfig,
};

const FAKE_TOOL: &str = r#"#!/bin/sh
cmd="$1"; shift
for last; do :; done
case "$cmd" in
  version) echo "faketool v0.52.0" ;;
  inspect) case "$last" in *bad*) exit 1 ;; esac ;;
  run) case "$last" in *fail*) exit 1 ;; *) echo "hello from $last" ;; esac ;;
  cloud)
    base=$(basename "$last")
    printf 'script: %s\noutput: cloud (https://app.example.test/runs/%s)\n' "$base" "$base"
    ;;
esac
exit 0
"#;

struct Fixture {
    dir: PathBuf,
    tool: PathBuf,
}

impl Fixture {
    /// Scratch directory with the fake tool installed and the named
    /// (empty) script files created.
    fn new(name: &str, scripts: &[&str]) -> Self {
        let dir = std::env::temp_dir().join(format!("gust-orch-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create scratch dir");

        let tool = dir.join("faketool");
        std::fs::write(&tool, FAKE_TOOL).expect("write fake tool");
        let mut perms = std::fs::metadata(&tool).expect("stat fake tool").permissions();
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(0o755);
        std::fs::set_permissions(&tool, perms).expect("chmod fake tool");

        for script in scripts {
            std::fs::write(dir.join(script), "// test script\n").expect("write script");
        }
        Self { dir, tool }
    }

    fn config(&self, patterns: &str) -> RunConfig {
        RunConfig {
            patterns: patterns.to_string(),
            tool: self.tool.display().to_string(),
            base: self.dir.clone(),
            ..RunConfig::default()
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

struct CapturingSink {
    fired: Arc<AtomicUsize>,
    results: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl ResultSink for CapturingSink {
    async fn publish(&self, results: &[(String, String)]) {
        self.fired.fetch_add(1, Ordering::SeqCst);
        *self.results.lock().unwrap() = results.to_vec();
    }
}

fn capturing_sink() -> (CapturingSink, Arc<AtomicUsize>, Arc<Mutex<Vec<(String, String)>>>) {
    let fired = Arc::new(AtomicUsize::new(0));
    let results = Arc::new(Mutex::new(Vec::new()));
    (
        CapturingSink { fired: fired.clone(), results: results.clone() },
        fired,
        results,
    )
}

fn null_sink() -> Box<dyn ResultSink> {
    let (sink, _, _) = capturing_sink();
    Box::new(sink)
}

fn registry() -> Arc<ProcessRegistry> {
    Arc::new(ProcessRegistry::new())
}

#[tokio::test]
async fn mixed_outcomes_fail_the_run_but_all_scripts_report() {
    let fx = Fixture::new("mixed", &["a.js", "fail-b.js"]);
    let summary = orchestrate(fx.config("*.js"), registry(), null_sink())
        .await
        .unwrap();

    assert!(!summary.verdict);
    assert_eq!(summary.validated, 2);
    assert_eq!(summary.outcomes.len(), 2);

    let passed: Vec<String> = summary
        .outcomes
        .iter()
        .filter(|(_, o)| o.passed())
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(passed, vec!["a.js"]);
}

#[tokio::test]
async fn all_passing_run_has_a_green_verdict() {
    let fx = Fixture::new("green", &["a.js", "b.js"]);
    let summary = orchestrate(fx.config("*.js"), registry(), null_sink())
        .await
        .unwrap();

    assert!(summary.verdict);
    assert_eq!(summary.outcomes.len(), 2);
}

#[tokio::test]
async fn invalid_scripts_are_dropped_before_the_run() {
    let fx = Fixture::new("filter", &["good.js", "bad.js"]);
    let summary = orchestrate(fx.config("*.js"), registry(), null_sink())
        .await
        .unwrap();

    assert!(summary.verdict);
    assert_eq!(summary.validated, 1);
    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(
        summary.outcomes[0].0.file_name().unwrap().to_string_lossy(),
        "good.js"
    );
}

#[tokio::test]
async fn nothing_valid_is_an_error() {
    let fx = Fixture::new("allbad", &["bad-1.js", "bad-2.js"]);
    let err = orchestrate(fx.config("*.js"), registry(), null_sink())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoValidScripts));
}

#[tokio::test]
async fn verify_only_runs_nothing() {
    let fx = Fixture::new("verify", &["fail-a.js", "fail-b.js"]);
    let mut config = fx.config("*.js");
    config.only_verify_scripts = true;

    // Both scripts would fail if run; validation-only never spawns them,
    // so the verdict stays green.
    let summary = orchestrate(config, registry(), null_sink()).await.unwrap();
    assert!(summary.verdict);
    assert!(summary.outcomes.is_empty());
    assert_eq!(summary.validated, 2);
}

#[tokio::test]
async fn cloud_run_collects_and_publishes_result_references() {
    let fx = Fixture::new("cloud", &["a.js", "b.js"]);
    let mut config = fx.config("*.js");
    config.cloud = true;

    let (sink, fired, results) = capturing_sink();
    let summary = orchestrate(config, registry(), Box::new(sink))
        .await
        .unwrap();

    assert!(summary.verdict);
    assert_eq!(fired.load(Ordering::SeqCst), 1, "sink fires exactly once");

    let mut published = results.lock().unwrap().clone();
    published.sort();
    assert_eq!(
        published,
        vec![
            ("a.js".to_string(), "https://app.example.test/runs/a.js".to_string()),
            ("b.js".to_string(), "https://app.example.test/runs/b.js".to_string()),
        ]
    );
}

#[tokio::test]
async fn local_run_publishes_nothing() {
    let fx = Fixture::new("local", &["a.js"]);
    let (sink, fired, _) = capturing_sink();

    let summary = orchestrate(fx.config("*.js"), registry(), Box::new(sink))
        .await
        .unwrap();
    assert!(summary.verdict);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
