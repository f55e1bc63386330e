//! External IP probing.
//!
//! # Data Flow
//! ```text
//! Orchestrator asks "what is my IP?" for a ProbeRoute
//!     → Direct                 (default route, or the VPN tunnel once up)
//!     → Proxy(url)             (proxy endpoint, or the Tor SOCKS port)
//!     → http.rs issues one GET to the echo service
//!     → IpResult: address, or a typed failure embedding the cause
//! ```
//!
//! # Design Decisions
//! - Probing never panics or propagates; every transport failure becomes
//!   a `ProbeError` so the loop can log it and continue
//! - The lookup is a trait so the orchestrator can run against a scripted
//!   source in tests

pub mod http;

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpIpProbe;

/// How the probe request leaves the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeRoute {
    /// Default route, no proxy.
    Direct,
    /// Route both http and https traffic through this proxy URL.
    Proxy(String),
}

impl ProbeRoute {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeRoute::Direct => "direct",
            ProbeRoute::Proxy(_) => "proxy",
        }
    }
}

impl fmt::Display for ProbeRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeRoute::Direct => f.write_str("direct"),
            ProbeRoute::Proxy(url) => write!(f, "via {}", url),
        }
    }
}

/// Why a probe produced no address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("invalid proxy '{url}': {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("echo service returned HTTP {0}")]
    Status(u16),

    #[error("response is not an IP address: {0:?}")]
    InvalidBody(String),

    #[error("request failed: {0}")]
    Transport(String),
}

/// Outcome of one probe.
pub type IpResult = Result<IpAddr, ProbeError>;

/// A source of "what is my external IP" answers.
#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn probe(&self, route: &ProbeRoute, timeout: Duration) -> IpResult;
}

/// Parse the echo service's plain-text body.
pub fn parse_ip_body(body: &str) -> IpResult {
    let trimmed = body.trim();
    trimmed
        .parse::<IpAddr>()
        .map_err(|_| ProbeError::InvalidBody(truncate(trimmed, 64)))
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
