//! Identity-change strategies.
//!
//! # Data Flow
//! ```text
//! Orchestrator picks a strategy per mode:
//!     → tor.rs      (control port: AUTHENTICATE + SIGNAL NEWNYM)
//!       service.rs  (confirmation-gated restart fallback)
//!     → proxy.rs    (endpoint → probe route, file order)
//!     → vpn.rs      (client process per profile, sorted order)
//! ```
//!
//! # Design Decisions
//! - Each adapter performs exactly one identity change per call
//! - Adapters report failure, they never decide on fallbacks or retries
//! - Dry-run is enforced by the orchestrator, which never calls an adapter

pub mod proxy;
pub mod service;
pub mod tor;
pub mod vpn;

use std::fmt;

pub use proxy::{load_proxy_list, parse_proxy_list, ProxyEndpoint};
pub use service::{AlwaysDecline, Confirm, ServiceRestarter, TerminalConfirm};
pub use tor::{TorController, TorError};
pub use vpn::{find_profiles, VpnAdapter, VpnProfile, VpnSession};

/// Which mechanism produced a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Tor,
    Proxy,
    Vpn,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Tor => "tor",
            Strategy::Proxy => "proxy",
            Strategy::Vpn => "vpn",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
