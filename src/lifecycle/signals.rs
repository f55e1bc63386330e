//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGINT (Ctrl-C) and SIGTERM
//! - Translate the first one into a cancellation request on the shared `Shutdown`
//! - Exit the process on a second one
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The first signal only sets the flag; the orchestrator observes it at
//!   its next poll, it never aborts a running step
//! - Multiple SIGTERM/SIGINT triggers forced shutdown

use std::future::Future;

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Exit status for a forced shutdown (128 + SIGINT).
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawn a background task that triggers `shutdown` on the first interrupt
/// and exits the process on the second.
pub fn spawn_signal_listener(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        escalate_on_repeat(&shutdown, wait_for_interrupt).await;
        std::process::exit(FORCED_EXIT_CODE);
    })
}

/// Trigger `shutdown` on the first interrupt, return on the second.
async fn escalate_on_repeat<F, Fut>(shutdown: &Shutdown, mut next_interrupt: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    next_interrupt().await;
    tracing::debug!("Interrupt signal received");
    shutdown.trigger();

    next_interrupt().await;
    tracing::warn!("Second interrupt received, exiting immediately");
}

#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() {
    let _ = tokio::signal::ctrl_c().await;
}
