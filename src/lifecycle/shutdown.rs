//! Cooperative cancellation for the rotation loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};

/// Upper bound on how long any wait point sleeps before re-checking the flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Process-wide cancellation flag.
///
/// Cloning shares the same flag. The signal listener is the only writer;
/// the orchestrator and every wait loop read it between poll slices, so an
/// interrupt is honored within one `POLL_INTERVAL`.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a new, untriggered shutdown token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` in slices of at most `POLL_INTERVAL`.
    ///
    /// Returns `true` if the full duration elapsed, `false` if cancellation
    /// was observed first. A duration past the clock's range waits until
    /// cancelled.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.is_triggered() {
                return false;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    (deadline - now).min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };
            time::sleep(slice).await;
        }
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        while !self.is_triggered() {
            time::sleep(POLL_INTERVAL).await;
        }
    }
}
