//! Privilege escalation prefix for service restarts and VPN clients.

use crate::config::PrivilegeConfig;
use crate::process::CommandSpec;

/// Wraps commands with the configured elevation program (e.g. `sudo`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privilege {
    prefix: Option<String>,
}

impl Privilege {
    pub fn from_config(config: &PrivilegeConfig) -> Self {
        let prefix = config.elevate_with.trim();
        Self {
            prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
        }
    }

    /// No prefix; commands run with the current privileges.
    pub fn none() -> Self {
        Self { prefix: None }
    }

    /// Build an elevated invocation of `program args...`.
    pub fn elevate(&self, program: &str, args: &[&str]) -> CommandSpec {
        match &self.prefix {
            Some(prefix) => CommandSpec::new(
                prefix.clone(),
                std::iter::once(program).chain(args.iter().copied()),
            ),
            None => CommandSpec::new(program, args.iter().copied()),
        }
    }
}
