//! Fatal errors.
//!
//! Failures tied to a single target (one proxy, one VPN profile, one Tor
//! attempt) never reach this type; they end up in a `CycleResult`. What is
//! left stops the run.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::probe::ProbeError;

#[derive(Debug, Error)]
pub enum RotateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot read proxy list {path}: {source}")]
    ProxyList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read VPN profile directory {path}: {source}")]
    VpnDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot build IP probe: {0}")]
    Probe(#[from] ProbeError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type RotateResult<T> = Result<T, RotateError>;
