//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator and adapters produce:
//!     → logging.rs (console tracing + persistent event log)
//!     → metrics.rs (iteration, cycle and probe-failure counters)
//!
//! Consumers:
//!     → Terminal (stdout)
//!     → Append-only log file
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, EventLog};
