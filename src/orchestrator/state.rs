//! Run state machine.
//!
//! # States
//! ```text
//! Idle → Running → SelectMode → Execute → SettleAndProbe → InterCycleWait
//!                      ↑                                        │
//!                      └────────────── next iteration ──────────┘
//!                                          │
//!                                   Stopping → Stopped
//! ```
//!
//! # Design Decisions
//! - Owned by the orchestrator's single control task
//! - The cancellation flag is the only field written from outside

use crate::config::RotationConfig;
use crate::lifecycle::Shutdown;
use crate::orchestrator::report::ExitReason;
use crate::strategy::Strategy;

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    SelectMode,
    Execute(Strategy),
    SettleAndProbe(Strategy),
    InterCycleWait,
    Stopping,
    Stopped,
}

/// Mutable per-run state.
#[derive(Debug)]
pub struct RunState {
    iteration: u64,
    phase: Phase,
    shutdown: Shutdown,
}

impl RunState {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            iteration: 0,
            phase: Phase::Idle,
            shutdown,
        }
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Start the next iteration and return its 1-based number.
    pub fn begin_iteration(&mut self) -> u64 {
        self.iteration += 1;
        self.iteration
    }

    pub fn transition(&mut self, next: Phase) {
        tracing::debug!(iteration = self.iteration, from = ?self.phase, to = ?next, "Phase transition");
        self.phase = next;
    }

    /// Decide, after an iteration, whether the loop should stop.
    ///
    /// Cancellation wins over `run_once`, which wins over the bounded count.
    pub fn stop_reason(&self, config: &RotationConfig) -> Option<ExitReason> {
        if self.is_cancelled() {
            return Some(ExitReason::Cancelled);
        }
        if config.run_once {
            return Some(ExitReason::RunOnce);
        }
        match config.iteration_limit() {
            Some(limit) if self.iteration >= limit => Some(ExitReason::CountReached(limit)),
            _ => None,
        }
    }
}
