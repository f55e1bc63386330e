//! Service-restart fallback for the Tor strategy.
//!
//! Restarting the daemon is disruptive and needs elevated privileges, so it
//! only runs after an explicit yes. Unattended runs (stdin is not a
//! terminal) are treated as declined rather than guessing consent, and so
//! is a cancellation that arrives while the prompt is open.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::lifecycle::Shutdown;
use crate::observability::EventLog;
use crate::process::{CommandSpec, Privilege, ProcessLauncher};
use crate::strategy::tor::TorError;

/// Asks the operator to approve a privileged action.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Reads a `y/N` answer from the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

#[async_trait]
impl Confirm for TerminalConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        if !io::stdin().is_terminal() {
            tracing::info!("Not attached to a terminal, treating confirmation as declined");
            return false;
        }

        // A detached thread, not spawn_blocking: an unanswered read must not
        // hold up runtime shutdown.
        let prompt = prompt.to_string();
        let (tx, rx) = oneshot::channel();
        std::thread::spawn(move || {
            print!("{} [y/N] >> ", prompt);
            let _ = io::stdout().flush();
            let mut line = String::new();
            let _ = tx.send(io::stdin().lock().read_line(&mut line).map(|_| line));
        });

        matches!(rx.await, Ok(Ok(line)) if line.trim().eq_ignore_ascii_case("y"))
    }
}

/// Declines every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

#[async_trait]
impl Confirm for AlwaysDecline {
    async fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Restarts the Tor system service through an ordered list of commands.
pub struct ServiceRestarter {
    launcher: Arc<dyn ProcessLauncher>,
    confirm: Arc<dyn Confirm>,
    commands: Vec<CommandSpec>,
}

impl ServiceRestarter {
    /// `systemctl restart <service>`, then `service <service> restart`, both elevated.
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        confirm: Arc<dyn Confirm>,
        privilege: &Privilege,
        service: &str,
    ) -> Self {
        let commands = vec![
            privilege.elevate("systemctl", &["restart", service]),
            privilege.elevate("service", &[service, "restart"]),
        ];
        Self {
            launcher,
            confirm,
            commands,
        }
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Ask for confirmation, then try each command until one exits successfully.
    ///
    /// Cancellation while the question is pending counts as declined.
    pub async fn restart(&self, log: &EventLog, shutdown: &Shutdown) -> Result<(), TorError> {
        log.record("Attempting to restart the tor service (requires elevated privileges).");

        let listing = self
            .commands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("' or '");
        let prompt = format!("This will run '{}'. Continue?", listing);
        let approved = tokio::select! {
            answer = self.confirm.confirm(&prompt) => answer,
            _ = shutdown.cancelled() => {
                log.record("Interrupted while waiting for confirmation; not restarting tor.");
                return Err(TorError::RestartDeclined);
            }
        };
        if !approved {
            log.record("User declined to restart tor service.");
            return Err(TorError::RestartDeclined);
        }

        for command in &self.commands {
            match self.launcher.run(command).await {
                Ok(exit) if exit.success() => {
                    log.record(format!("Ran: {}", command));
                    return Ok(());
                }
                Ok(exit) => {
                    tracing::debug!(command = %command, exit = %exit, "Restart command failed");
                }
                Err(e) => {
                    tracing::debug!(command = %command, error = %e, "Restart command unavailable");
                }
            }
        }

        log.record("Could not restart tor service automatically. Please restart tor manually.");
        Err(TorError::ServiceRestartUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ExternalProcess, ProcessError, ProcessExit};
    use std::sync::Mutex;

    /// Runs nothing; answers with scripted exit codes and records commands.
    struct Scripted {
        exits: Mutex<Vec<Result<i32, ()>>>,
        ran: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProcessLauncher for Scripted {
        fn start(&self, command: &CommandSpec) -> Result<Box<dyn ExternalProcess>, ProcessError> {
            Err(ProcessError::BinaryNotFound(command.program.clone()))
        }

        async fn run(&self, command: &CommandSpec) -> Result<ProcessExit, ProcessError> {
            self.ran.lock().unwrap().push(command.to_string());
            match self.exits.lock().unwrap().remove(0) {
                Ok(code) => Ok(ProcessExit { code: Some(code) }),
                Err(()) => Err(ProcessError::BinaryNotFound(command.program.clone())),
            }
        }
    }

    struct Yes;

    #[async_trait]
    impl Confirm for Yes {
        async fn confirm(&self, _prompt: &str) -> bool {
            true
        }
    }

    /// Never answers, like an operator who walked away.
    struct Unanswered;

    #[async_trait]
    impl Confirm for Unanswered {
        async fn confirm(&self, _prompt: &str) -> bool {
            std::future::pending().await
        }
    }

    fn restarter(exits: Vec<Result<i32, ()>>, confirm: Arc<dyn Confirm>) -> (ServiceRestarter, Arc<Scripted>) {
        let launcher = Arc::new(Scripted {
            exits: Mutex::new(exits),
            ran: Mutex::new(Vec::new()),
        });
        let restarter = ServiceRestarter::new(
            launcher.clone(),
            confirm,
            &Privilege::from_config(&Default::default()),
            "tor",
        );
        (restarter, launcher)
    }

    #[tokio::test]
    async fn test_declined_runs_nothing() {
        let (restarter, launcher) = restarter(vec![], Arc::new(AlwaysDecline));
        let err = restarter.restart(&EventLog::console_only(), &Shutdown::new()).await.unwrap_err();
        assert_eq!(err, TorError::RestartDeclined);
        assert!(launcher.ran.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_falls_through_to_legacy_init() {
        let (restarter, launcher) = restarter(vec![Err(()), Ok(0)], Arc::new(Yes));
        restarter.restart(&EventLog::console_only(), &Shutdown::new()).await.unwrap();
        assert_eq!(
            *launcher.ran.lock().unwrap(),
            vec!["sudo systemctl restart tor", "sudo service tor restart"]
        );
    }

    #[tokio::test]
    async fn test_first_success_stops() {
        let (restarter, launcher) = restarter(vec![Ok(0), Ok(0)], Arc::new(Yes));
        restarter.restart(&EventLog::console_only(), &Shutdown::new()).await.unwrap();
        assert_eq!(launcher.ran.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_fail() {
        let (restarter, _) = restarter(vec![Ok(1), Ok(127)], Arc::new(Yes));
        let err = restarter.restart(&EventLog::console_only(), &Shutdown::new()).await.unwrap_err();
        assert_eq!(err, TorError::ServiceRestartUnavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_at_prompt_counts_as_declined() {
        let (restarter, launcher) = restarter(vec![Ok(0)], Arc::new(Unanswered));
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            trigger.trigger();
        });

        let start = tokio::time::Instant::now();
        let err = restarter
            .restart(&EventLog::console_only(), &shutdown)
            .await
            .unwrap_err();

        assert_eq!(err, TorError::RestartDeclined);
        assert!(launcher.ran.lock().unwrap().is_empty());
        assert!(start.elapsed() <= std::time::Duration::from_secs(3) + crate::lifecycle::POLL_INTERVAL);
    }
}
