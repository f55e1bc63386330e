//! Command-line surface.
//!
//! Flags overlay whatever the optional `--config` file provides; anything
//! left unset keeps the file (or built-in) default.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{finalize, load_config, ConfigError};
use crate::config::schema::{Mode, RotationConfig};

#[derive(Debug, Parser)]
#[command(name = "identity-rotator")]
#[command(
    about = "Rotate the host's external IP via Tor NEWNYM, a proxy list or VPN profiles",
    long_about = None
)]
pub struct Cli {
    /// TOML configuration file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Rotation mode
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Seconds between changes
    #[arg(long)]
    pub interval: Option<u64>,

    /// Seconds to wait after a change before checking the IP
    #[arg(long = "wait-after-change")]
    pub wait_after_change: Option<u64>,

    /// Newline-separated proxy list (protocol://host:port)
    #[arg(long = "proxy-list")]
    pub proxy_list: Option<PathBuf>,

    /// Directory containing .ovpn files to rotate through
    #[arg(long = "ovpn-dir")]
    pub ovpn_dir: Option<PathBuf>,

    /// Tor ControlPort password
    #[arg(long = "tor-control-password")]
    pub tor_control_password: Option<String>,

    /// Number of iterations (0 = unbounded)
    #[arg(long)]
    pub count: Option<u64>,

    /// Perform one iteration and exit
    #[arg(long = "run-once")]
    pub run_once: bool,

    /// Do not perform privileged or networked actions; only log them
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Event log file path
    #[arg(long)]
    pub logfile: Option<PathBuf>,
}

impl clap::ValueEnum for Mode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Mode::Tor, Mode::Proxy, Mode::Vpn, Mode::All]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

impl Cli {
    /// Build the immutable configuration: file (or defaults), then flags,
    /// then environment-dependent defaults and validation.
    pub fn resolve(self) -> Result<RotationConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RotationConfig::default(),
        };
        self.apply(&mut config);
        finalize(config)
    }

    fn apply(self, config: &mut RotationConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(settle) = self.wait_after_change {
            config.settle_secs = settle;
        }
        if let Some(path) = self.proxy_list {
            config.proxy_list = Some(path);
        }
        if let Some(dir) = self.ovpn_dir {
            config.vpn_dir = Some(dir);
        }
        if let Some(password) = self.tor_control_password {
            config.tor.control_password = Some(password);
        }
        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(path) = self.logfile {
            config.log_file = Some(path);
        }
        config.run_once |= self.run_once;
        config.dry_run |= self.dry_run;
    }
}
