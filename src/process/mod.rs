//! External process capability.
//!
//! # Data Flow
//! ```text
//! Adapter builds a CommandSpec
//!     → privilege.rs (prefix with the elevation command, e.g. sudo)
//!     → ProcessLauncher::start  → Box<dyn ExternalProcess> (long-lived, VPN)
//!     → ProcessLauncher::run    → ProcessExit (run to completion, service restart)
//!
//! Teardown (stop_process):
//!     poll_exit_code → terminate (SIGTERM) → wait_timeout → kill (SIGKILL)
//! ```
//!
//! # Design Decisions
//! - Launching is a trait so dry-run and tests can prove no process is created
//! - Every adapter holds at most one handle; the tokio implementation also
//!   kills on drop as a backstop if a handle is leaked on an error path

pub mod child;
pub mod privilege;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use child::{ChildProcess, TokioLauncher};
pub use privilege::Privilege;

/// A program plus arguments, ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a process ended. `code` is `None` when it was ended by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Errors from launching or controlling a subprocess.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("binary not found: {0}")]
    BinaryNotFound(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process exited early ({0})")]
    ExitedEarly(ProcessExit),

    #[error("failed to signal process: {0}")]
    Signal(String),

    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running child process.
#[async_trait]
pub trait ExternalProcess: Send {
    /// OS process id, if still known.
    fn id(&self) -> Option<u32>;

    /// Non-blocking exit check.
    fn poll_exit_code(&mut self) -> Result<Option<ProcessExit>, ProcessError>;

    /// Ask the process to exit (SIGTERM on unix).
    fn terminate(&mut self) -> Result<(), ProcessError>;

    /// Force the process to exit (SIGKILL on unix).
    fn kill(&mut self) -> Result<(), ProcessError>;

    /// Wait up to `timeout` for exit. `Ok(None)` means still running.
    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ProcessExit>, ProcessError>;
}

/// Creates external processes.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start a process without waiting for it.
    fn start(&self, command: &CommandSpec) -> Result<Box<dyn ExternalProcess>, ProcessError>;

    /// Run a process to completion.
    async fn run(&self, command: &CommandSpec) -> Result<ProcessExit, ProcessError>;

    /// Whether `program` can be found before it is wrapped in an elevation
    /// command, which would otherwise hide a missing binary.
    fn is_available(&self, _program: &str) -> bool {
        true
    }
}

/// How a teardown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The process had already exited before teardown began.
    AlreadyExited(ProcessExit),
    /// Exited after the terminate signal.
    Terminated(ProcessExit),
    /// Did not exit within the timeout and was force-killed.
    Killed,
}

/// Terminate, wait up to `timeout`, then force-kill.
///
/// Never fails: signal errors are logged and the kill path is taken.
pub async fn stop_process(process: &mut dyn ExternalProcess, timeout: Duration) -> Teardown {
    if let Ok(Some(exit)) = process.poll_exit_code() {
        return Teardown::AlreadyExited(exit);
    }

    if let Err(e) = process.terminate() {
        tracing::warn!(pid = ?process.id(), error = %e, "Terminate signal failed");
    }

    match process.wait_timeout(timeout).await {
        Ok(Some(exit)) => return Teardown::Terminated(exit),
        Ok(None) => {
            tracing::warn!(pid = ?process.id(), timeout = ?timeout, "Process did not exit after terminate, killing");
        }
        Err(e) => {
            tracing::warn!(pid = ?process.id(), error = %e, "Waiting for process failed, killing");
        }
    }

    if let Err(e) = process.kill() {
        tracing::warn!(pid = ?process.id(), error = %e, "Kill failed");
    }
    // Reap so the child does not linger as a zombie.
    let _ = process.wait_timeout(Duration::from_secs(1)).await;
    Teardown::Killed
}
