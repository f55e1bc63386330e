//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger()
//!
//! Shutdown (shutdown.rs):
//!     Orchestrator loop head   → is_triggered()?
//!     Every settle/inter-cycle wait → Shutdown::sleep() polls the flag
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative: one atomic flag, many readers
//! - Worst-case latency is one poll interval, not one iteration
//! - In-flight subprocess work is torn down by its owner, not by the signal

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, POLL_INTERVAL};
pub use signals::spawn_signal_listener;
