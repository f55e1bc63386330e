//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the rotator.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which identity-change mechanisms an iteration runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Tor,
    Proxy,
    Vpn,
    All,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Tor => "tor",
            Mode::Proxy => "proxy",
            Mode::Vpn => "vpn",
            Mode::All => "all",
        }
    }

    /// Whether the Tor adapter runs in this mode.
    pub fn runs_tor(&self) -> bool {
        matches!(self, Mode::Tor | Mode::All)
    }

    /// Whether the proxy list is rotated in this mode.
    pub fn runs_proxy(&self) -> bool {
        matches!(self, Mode::Proxy | Mode::All)
    }

    /// Whether VPN profiles are rotated in this mode.
    pub fn runs_vpn(&self) -> bool {
        matches!(self, Mode::Vpn | Mode::All)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tor" => Ok(Mode::Tor),
            "proxy" => Ok(Mode::Proxy),
            "vpn" => Ok(Mode::Vpn),
            "all" => Ok(Mode::All),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Root configuration, resolved once at startup and immutable afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Rotation mechanism(s) to run each iteration.
    pub mode: Mode,

    /// Seconds between successive rotation targets.
    pub interval_secs: u64,

    /// Seconds to wait after an identity change before probing.
    pub settle_secs: u64,

    /// Number of iterations to run (0 = unbounded).
    pub count: u64,

    /// Run exactly one iteration and stop.
    pub run_once: bool,

    /// Simulate every step without side effects.
    pub dry_run: bool,

    /// Path to a newline-separated proxy list.
    pub proxy_list: Option<PathBuf>,

    /// Directory containing `.ovpn` profiles.
    pub vpn_dir: Option<PathBuf>,

    /// Append-only event log. `None` resolves to the default under `$HOME`.
    pub log_file: Option<PathBuf>,

    /// Tor control and SOCKS settings.
    pub tor: TorConfig,

    /// External IP echo service settings.
    pub probe: ProbeConfig,

    /// VPN client settings.
    pub vpn: VpnConfig,

    /// Privilege escalation for service restarts and VPN clients.
    pub privilege: PrivilegeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Tor,
            interval_secs: 60,
            settle_secs: 5,
            count: 0,
            run_once: false,
            dry_run: false,
            proxy_list: None,
            vpn_dir: None,
            log_file: None,
            tor: TorConfig::default(),
            probe: ProbeConfig::default(),
            vpn: VpnConfig::default(),
            privilege: PrivilegeConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl RotationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// Settle time for a VPN tunnel, never shorter than `vpn.min_settle_secs`.
    pub fn vpn_settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs.max(self.vpn.min_settle_secs))
    }

    /// Bounded iteration count, `None` when unbounded.
    pub fn iteration_limit(&self) -> Option<u64> {
        (self.count > 0).then_some(self.count)
    }
}

/// Tor control-port and SOCKS settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TorConfig {
    /// Control port address (e.g., "127.0.0.1:9051").
    pub control_addr: String,

    /// SOCKS port address used for the post-change probe.
    pub socks_addr: String,

    /// Control-port password. `None` sends a bare AUTHENTICATE.
    pub control_password: Option<String>,

    /// Timeout for connecting and for each control reply, in seconds.
    pub connect_timeout_secs: u64,

    /// System service name used by the restart fallback.
    pub service_name: String,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            control_addr: "127.0.0.1:9051".to_string(),
            socks_addr: "127.0.0.1:9050".to_string(),
            control_password: None,
            connect_timeout_secs: 5,
            service_name: "tor".to_string(),
        }
    }
}

impl TorConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Proxy URL that routes probe traffic through the Tor SOCKS port.
    pub fn socks_proxy_url(&self) -> String {
        format!("socks5h://{}", self.socks_addr)
    }
}

/// IP echo service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Endpoint returning the caller's IP as plain text.
    pub url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: "http://checkip.amazonaws.com".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// VPN client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VpnConfig {
    /// VPN client binary.
    pub binary: String,

    /// Delay before checking whether the client exited early (minimum 2).
    pub startup_grace_secs: u64,

    /// Lower bound on the settle time before probing through a tunnel.
    pub min_settle_secs: u64,

    /// How long to wait after a terminate signal before force-killing.
    pub stop_timeout_secs: u64,

    /// Pause after teardown so routes revert before the next profile.
    pub post_teardown_secs: u64,
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            binary: "openvpn".to_string(),
            startup_grace_secs: 2,
            min_settle_secs: 5,
            stop_timeout_secs: 10,
            post_teardown_secs: 2,
        }
    }
}

/// Privilege escalation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrivilegeConfig {
    /// Command prefixed to privileged invocations. Empty disables the prefix.
    pub elevate_with: String,
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self {
            elevate_with: "sudo".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus exporter bind address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
