//! Interrupt cascade: one Ctrl-C tears down every child before the
//! orchestrator itself exits.

use std::sync::Arc;

use crate::executor::ProcessRegistry;

/// Exit status after an external interrupt (128 + SIGINT).
const INTERRUPT_EXIT: i32 = 130;

/// Watch for Ctrl-C and, when it arrives, forward SIGINT to every live
/// child before exiting with a non-zero status.
///
/// Safe to install at any point in the run's lifetime: before anything has
/// been spawned or after everything has exited the registry walk is simply
/// empty. Failures to signal an individual child are logged by the
/// registry and never block the shutdown.
pub fn install_interrupt_handler(registry: Arc<ProcessRegistry>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for interrupts");
            return;
        }
        let signalled = registry.interrupt_all();
        tracing::info!(signalled, "interrupt received, forwarded to children");
        std::process::exit(INTERRUPT_EXIT);
    });
}
