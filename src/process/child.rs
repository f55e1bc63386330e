//! Tokio-backed process launcher.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::process::{CommandSpec, ExternalProcess, ProcessError, ProcessExit, ProcessLauncher};

/// Launches real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl TokioLauncher {
    fn command(spec: &CommandSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    fn start(&self, spec: &CommandSpec) -> Result<Box<dyn ExternalProcess>, ProcessError> {
        let child = Self::command(spec).spawn().map_err(|e| spawn_error(spec, e))?;
        tracing::debug!(pid = ?child.id(), command = %spec, "Process started");
        Ok(Box::new(ChildProcess { child }))
    }

    async fn run(&self, spec: &CommandSpec) -> Result<ProcessExit, ProcessError> {
        let mut command = Self::command(spec);
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let status = command.status().await.map_err(|e| spawn_error(spec, e))?;
        Ok(to_exit(status))
    }

    fn is_available(&self, program: &str) -> bool {
        locate(program).is_some()
    }
}

/// Searched after `PATH`; privileged tools usually live here and sudo's
/// secure_path includes them even when the user's `PATH` does not.
const SBIN_DIRS: [&str; 3] = ["/usr/local/sbin", "/usr/sbin", "/sbin"];

/// Resolve `program` the way a shell would, plus the sbin directories.
fn locate(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }

    let search: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect())
        .unwrap_or_default();
    search
        .into_iter()
        .chain(SBIN_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn spawn_error(spec: &CommandSpec, source: std::io::Error) -> ProcessError {
    if source.kind() == ErrorKind::NotFound {
        ProcessError::BinaryNotFound(spec.program.clone())
    } else {
        ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        }
    }
}

fn to_exit(status: ExitStatus) -> ProcessExit {
    ProcessExit { code: status.code() }
}

/// A running tokio child process.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
}

#[async_trait]
impl ExternalProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn poll_exit_code(&mut self) -> Result<Option<ProcessExit>, ProcessError> {
        Ok(self.child.try_wait()?.map(to_exit))
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<(), ProcessError> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        // Already reaped.
        let Some(pid) = self.child.id() else { return Ok(()) };
        let pid = i32::try_from(pid).map_err(|e| ProcessError::Signal(e.to_string()))?;
        kill(Pid::from_raw(pid), Signal::SIGTERM)
            .map_err(|e| ProcessError::Signal(format!("SIGTERM failed: {}", e)))
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<(), ProcessError> {
        self.kill()
    }

    fn kill(&mut self) -> Result<(), ProcessError> {
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(ProcessError::Signal(format!("kill failed: {}", e))),
        }
    }

    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ProcessExit>, ProcessError> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => Ok(Some(to_exit(status?))),
            Err(_) => Ok(None),
        }
    }
}
