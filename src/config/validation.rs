//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, grace period floor)
//! - Check address and URL shapes before any I/O happens
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RotationConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::RotationConfig;

/// Smallest allowed delay before the early-exit check of a VPN client.
pub const MIN_VPN_GRACE_SECS: u64 = 2;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("probe.url '{0}' is not a valid http(s) URL")]
    InvalidProbeUrl(String),

    #[error("{field} '{value}' is not a host:port address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("vpn.startup_grace_secs must be at least {MIN_VPN_GRACE_SECS}, got {0}")]
    GraceTooShort(u64),

    #[error("vpn.binary must not be empty")]
    EmptyVpnBinary,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RotationConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.probe.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidProbeUrl(config.probe.url.clone())),
    }

    if config.probe.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "probe.timeout_secs" });
    }
    if config.tor.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "tor.connect_timeout_secs" });
    }
    if config.vpn.stop_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "vpn.stop_timeout_secs" });
    }

    for (field, value) in [
        ("tor.control_addr", &config.tor.control_addr),
        ("tor.socks_addr", &config.tor.socks_addr),
    ] {
        if !is_host_port(value) {
            errors.push(ValidationError::InvalidAddress { field, value: value.clone() });
        }
    }

    if config.vpn.startup_grace_secs < MIN_VPN_GRACE_SECS {
        errors.push(ValidationError::GraceTooShort(config.vpn.startup_grace_secs));
    }
    if config.vpn.binary.trim().is_empty() {
        errors.push(ValidationError::EmptyVpnBinary);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
