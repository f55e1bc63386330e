//! Rotation orchestrator subsystem.
//!
//! # Data Flow
//! ```text
//! RotationConfig + Collaborators (probe, launcher, confirm)
//!     → engine.rs   (iteration loop per mode)
//!     → state.rs    (phase transitions, stop decision)
//!     → report.rs   (CycleResult per target, RunReport at the end)
//! ```
//!
//! # Design Decisions
//! - One control task drives everything sequentially
//! - Collaborators are trait objects so dry-run and tests can prove that
//!   no process or socket is touched

pub mod engine;
pub mod report;
pub mod state;

pub use engine::{Collaborators, Orchestrator};
pub use report::{CycleResult, ExitReason, Observation, RunReport};
pub use state::{Phase, RunState};
