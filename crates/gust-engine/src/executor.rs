//! Run execution: spawn the built commands, stream their output, apply the
//! scheduling and fail-fast policies, and collect per-script outcomes.
//!
//! State machine per child: Spawned → Running → Exited(code, signal).
//! No retries — a failed script is never re-run. A child is removed from
//! the live-process registry *before* its outcome feeds the fail-fast or
//! aggregate logic, so the registry never references exited processes.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinSet;

use crate::classify::Classifier;
use crate::command::RunCommand;

/// How the executor schedules its commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// One at a time, in input order.
    Sequential,
    /// All in flight at once; outcomes arrive in completion order.
    Parallel,
}

/// Final state of one script's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Passed,
    Failed {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, RunOutcome::Passed)
    }
}

/// Everything the executor learned from one run.
#[derive(Debug)]
pub struct RunReport {
    /// One outcome per script that was actually spawned. Sequential mode
    /// preserves script order; parallel mode records completion order.
    pub outcomes: Vec<(PathBuf, RunOutcome)>,
    /// Fail-fast fired: remaining commands were skipped or signalled.
    pub aborted: bool,
}

impl RunReport {
    /// Logical AND over "script passed" — order-independent.
    pub fn all_passed(&self) -> bool {
        !self.aborted && self.outcomes.iter().all(|(_, o)| o.passed())
    }
}

/// Registry of live child process ids.
///
/// Shared between the executor and the interrupt handler; entries exist
/// exactly while the child does. The same script never has two live
/// entries — the executor spawns each command once.
#[derive(Default)]
pub struct ProcessRegistry {
    live: Mutex<HashMap<u32, PathBuf>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, pid: u32, script: PathBuf) {
        self.live.lock().expect("registry lock").insert(pid, script);
    }

    fn remove(&self, pid: u32) {
        self.live.lock().expect("registry lock").remove(&pid);
    }

    /// Pids of every still-running child.
    pub fn live_pids(&self) -> Vec<u32> {
        self.live.lock().expect("registry lock").keys().copied().collect()
    }

    /// Best-effort SIGINT to every live child, for an external interrupt.
    /// Returns how many children were actually signalled.
    pub fn interrupt_all(&self) -> usize {
        self.signal_all(SignalKind::Interrupt)
    }

    /// Best-effort SIGTERM to every live child, for fail-fast cancellation.
    pub fn terminate_all(&self) -> usize {
        self.signal_all(SignalKind::Terminate)
    }

    fn signal_all(&self, kind: SignalKind) -> usize {
        let mut delivered = 0;
        for pid in self.live_pids() {
            if send_signal(pid, kind) {
                delivered += 1;
            }
        }
        delivered
    }
}

#[derive(Clone, Copy)]
enum SignalKind {
    Interrupt,
    Terminate,
}

#[cfg(unix)]
fn send_signal(pid: u32, kind: SignalKind) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let signal = match kind {
        SignalKind::Interrupt => Signal::SIGINT,
        SignalKind::Terminate => Signal::SIGTERM,
    };
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => true,
        Err(e) => {
            // Racing an exit is normal; log and move on, never escalate.
            tracing::warn!(pid, error = %e, "could not signal child");
            false
        }
    }
}

#[cfg(not(unix))]
fn send_signal(pid: u32, _kind: SignalKind) -> bool {
    tracing::warn!(pid, "signal delivery not supported on this platform");
    false
}

/// Drives a list of run commands to completion under a scheduling policy.
pub struct Executor {
    classifier: Arc<Classifier>,
    registry: Arc<ProcessRegistry>,
}

impl Executor {
    pub fn new(classifier: Arc<Classifier>, registry: Arc<ProcessRegistry>) -> Self {
        Self { classifier, registry }
    }

    /// Run every command and report the outcomes. Never panics on child
    /// failure; a command that cannot even spawn is a `Failed` outcome
    /// with code 127.
    pub async fn run(
        &self,
        commands: Vec<RunCommand>,
        mode: ScheduleMode,
        fail_fast: bool,
    ) -> RunReport {
        match mode {
            ScheduleMode::Sequential => self.run_sequential(commands, fail_fast).await,
            ScheduleMode::Parallel => self.run_parallel(commands, fail_fast).await,
        }
    }

    async fn run_sequential(&self, commands: Vec<RunCommand>, fail_fast: bool) -> RunReport {
        let mut outcomes = Vec::with_capacity(commands.len());
        for cmd in commands {
            let (script, outcome) =
                run_one(self.classifier.clone(), self.registry.clone(), cmd).await;
            let failed = !outcome.passed();
            outcomes.push((script, outcome));
            if failed && fail_fast {
                // Remaining commands are never spawned.
                return RunReport { outcomes, aborted: true };
            }
        }
        RunReport { outcomes, aborted: false }
    }

    async fn run_parallel(&self, commands: Vec<RunCommand>, fail_fast: bool) -> RunReport {
        let mut children = JoinSet::new();
        for cmd in commands {
            children.spawn(run_one(self.classifier.clone(), self.registry.clone(), cmd));
        }

        let mut outcomes = Vec::new();
        let mut aborted = false;
        while let Some(joined) = children.join_next().await {
            let (script, outcome) = match joined {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(error = %e, "run task panicked");
                    continue;
                }
            };
            let failed = !outcome.passed();
            outcomes.push((script, outcome));
            if failed && fail_fast && !aborted {
                // One-shot cancellation: signal the survivors, then keep
                // draining the join set to reap them.
                aborted = true;
                let signalled = self.registry.terminate_all();
                tracing::warn!(signalled, "fail-fast: terminating remaining scripts");
            }
        }
        RunReport { outcomes, aborted }
    }
}

/// Spawn one command, stream its output, and wait for its exit.
async fn run_one(
    classifier: Arc<Classifier>,
    registry: Arc<ProcessRegistry>,
    cmd: RunCommand,
) -> (PathBuf, RunOutcome) {
    let label = cmd.script.display().to_string();
    tracing::debug!(command = %cmd.display_line(), "spawning");

    let mut child = match Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            eprintln!("[{label}] failed to start {}: {}", cmd.program, e);
            return (
                cmd.script,
                RunOutcome::Failed { code: Some(127), signal: None },
            );
        }
    };

    let pid = child.id();
    if let Some(pid) = pid {
        registry.insert(pid, cmd.script.clone());
    }

    // Stdout flows through the classifier in chunks; a decision is made
    // per chunk, matching how the tool writes its banner and metadata.
    let stdout_task = child.stdout.take().map(|mut stdout| {
        let classifier = classifier.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 8192];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buf[..n]);
                        if let Some(text) = classifier.process_chunk(&chunk).await {
                            print!("{text}");
                            let _ = std::io::stdout().flush();
                        }
                    }
                    Err(_) => break,
                }
            }
        })
    });

    // Stderr is never classified — forward line by line with the script
    // name so interleaved parallel output stays attributable.
    let stderr_task = child.stderr.take().map(|stderr| {
        let label = label.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("[{label}] {line}");
            }
        })
    });

    let status = child.wait().await;

    // Remove before evaluating anything: the registry must never hold an
    // exited pid when fail-fast or the interrupt handler walks it.
    if let Some(pid) = pid {
        registry.remove(pid);
    }
    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    let outcome = match status {
        Ok(status) if status.success() => RunOutcome::Passed,
        Ok(status) => RunOutcome::Failed {
            code: status.code(),
            signal: exit_signal(&status),
        },
        Err(e) => {
            tracing::error!(script = %label, error = %e, "failed waiting on child");
            RunOutcome::Failed { code: None, signal: None }
        }
    };
    (cmd.script, outcome)
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
