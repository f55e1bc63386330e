//! VPN profile rotation.
//!
//! # Session Lifecycle
//! ```text
//! connect:  start client (elevated) → grace delay → poll exit code
//!             exited?  → ProcessError::ExitedEarly
//!             running? → VpnSession (connected)
//! caller:   settle → probe direct (the tunnel owns the default route)
//! teardown: terminate → wait stop_timeout → kill
//! ```
//!
//! # Design Decisions
//! - The session owns the only process handle; `teardown` consumes it
//! - Dropping a session that was never torn down kills the client

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::VpnConfig;
use crate::process::{
    stop_process, ExternalProcess, Privilege, ProcessError, ProcessExit, ProcessLauncher, Teardown,
};

const PROFILE_EXTENSION: &str = "ovpn";

/// Path to one VPN client configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VpnProfile(PathBuf);

impl VpnProfile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Every `.ovpn` file (suffix matched case-insensitively) in `dir`, sorted
/// lexicographically by file name.
pub fn find_profiles(dir: &Path) -> io::Result<Vec<VpnProfile>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if is_profile(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths.into_iter().map(VpnProfile::new).collect())
}

fn is_profile(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PROFILE_EXTENSION))
}

/// Starts and stops VPN client processes.
pub struct VpnAdapter {
    launcher: Arc<dyn ProcessLauncher>,
    privilege: Privilege,
    binary: String,
    grace: Duration,
    stop_timeout: Duration,
}

impl VpnAdapter {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, privilege: Privilege, config: &VpnConfig) -> Self {
        Self {
            launcher,
            privilege,
            binary: config.binary.clone(),
            grace: Duration::from_secs(config.startup_grace_secs),
            stop_timeout: Duration::from_secs(config.stop_timeout_secs),
        }
    }

    /// Launch the client for `profile` and confirm it survived the grace delay.
    pub async fn connect(&self, profile: &VpnProfile) -> Result<VpnSession, ProcessError> {
        if !self.launcher.is_available(&self.binary) {
            return Err(ProcessError::BinaryNotFound(self.binary.clone()));
        }

        let config_path = profile.path().to_string_lossy();
        let command = self
            .privilege
            .elevate(&self.binary, &["--config", &*config_path]);

        let process = self.launcher.start(&command)?;
        let mut session = VpnSession {
            process: Some(process),
            stop_timeout: self.stop_timeout,
        };

        tokio::time::sleep(self.grace).await;

        if let Some(exit) = session.poll_exit()? {
            session.process = None;
            return Err(ProcessError::ExitedEarly(exit));
        }
        Ok(session)
    }
}

/// A running VPN client.
pub struct VpnSession {
    process: Option<Box<dyn ExternalProcess>>,
    stop_timeout: Duration,
}

impl VpnSession {
    fn poll_exit(&mut self) -> Result<Option<ProcessExit>, ProcessError> {
        match self.process.as_mut() {
            Some(process) => process.poll_exit_code(),
            None => Ok(None),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.id())
    }

    /// Terminate the client, force-killing it after the stop timeout.
    pub async fn teardown(mut self) -> Option<Teardown> {
        let mut process = self.process.take()?;
        Some(stop_process(process.as_mut(), self.stop_timeout).await)
    }
}

impl Drop for VpnSession {
    fn drop(&mut self) {
        if let Some(process) = self.process.as_mut() {
            tracing::warn!(pid = ?process.id(), "VPN session dropped without teardown, killing client");
            let _ = process.kill();
        }
    }
}
