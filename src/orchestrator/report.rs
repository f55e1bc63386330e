//! Cycle outcomes and the run summary.

use std::fmt;
use std::net::IpAddr;

use crate::probe::IpResult;
use crate::strategy::Strategy;

/// What an IP probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The echo service answered with this address.
    Ip(IpAddr),
    /// The probe failed; the cause is embedded.
    Failed(String),
    /// Dry-run: no probe was sent.
    Simulated,
    /// The step was skipped (change failed or cancelled first).
    NotProbed,
}

impl Observation {
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Observation::Ip(ip) => Some(*ip),
            _ => None,
        }
    }
}

impl From<IpResult> for Observation {
    fn from(result: IpResult) -> Self {
        match result {
            Ok(ip) => Observation::Ip(ip),
            Err(e) => Observation::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Ip(ip) => write!(f, "{}", ip),
            Observation::Failed(cause) => write!(f, "ERROR: {}", cause),
            Observation::Simulated => f.write_str("(dry-run)"),
            Observation::NotProbed => f.write_str("(not probed)"),
        }
    }
}

/// Outcome of one adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleResult {
    pub strategy: Strategy,
    /// Control address, proxy URL or profile path.
    pub target: String,
    pub success: bool,
    pub before: Observation,
    pub after: Observation,
    /// Why the identity change failed, if it did.
    pub error: Option<String>,
}

impl CycleResult {
    pub fn simulated(strategy: Strategy, target: impl Into<String>) -> Self {
        Self {
            strategy,
            target: target.into(),
            success: true,
            before: Observation::Simulated,
            after: Observation::Simulated,
            error: None,
        }
    }

    /// The change itself failed; nothing was probed afterwards.
    pub fn failed(strategy: Strategy, target: impl Into<String>, before: Observation, error: impl fmt::Display) -> Self {
        Self {
            strategy,
            target: target.into(),
            success: false,
            before,
            after: Observation::NotProbed,
            error: Some(error.to_string()),
        }
    }

    /// The observed address differs from the one before the change.
    pub fn ip_changed(&self) -> bool {
        matches!((self.before.ip(), self.after.ip()), (Some(a), Some(b)) if a != b)
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    RunOnce,
    CountReached(u64),
    Cancelled,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::RunOnce => f.write_str("run once"),
            ExitReason::CountReached(n) => write!(f, "reached count {}", n),
            ExitReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub iterations: u64,
    pub cycles: Vec<CycleResult>,
    pub exit: ExitReason,
}

impl RunReport {
    pub fn cycles_for(&self, strategy: Strategy) -> impl Iterator<Item = &CycleResult> {
        self.cycles.iter().filter(move |c| c.strategy == strategy)
    }

    pub fn successes(&self) -> usize {
        self.cycles.iter().filter(|c| c.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;

    #[test]
    fn test_observation_display() {
        let ip: IpAddr = "198.51.100.4".parse().unwrap();
        assert_eq!(Observation::Ip(ip).to_string(), "198.51.100.4");
        let failed: Observation = Err(ProbeError::Status(503)).into();
        assert_eq!(failed.to_string(), "ERROR: echo service returned HTTP 503");
    }

    #[test]
    fn test_ip_changed() {
        let a: IpAddr = "198.51.100.4".parse().unwrap();
        let b: IpAddr = "203.0.113.9".parse().unwrap();
        let mut cycle = CycleResult::simulated(Strategy::Proxy, "http://p1:8080");
        assert!(!cycle.ip_changed());
        cycle.before = Observation::Ip(a);
        cycle.after = Observation::Ip(b);
        assert!(cycle.ip_changed());
        cycle.after = Observation::Ip(a);
        assert!(!cycle.ip_changed());
    }
}
