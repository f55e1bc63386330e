//! Proxy-list rotation.
//!
//! The adapter is a pure mapping: an endpoint becomes a probe route that
//! sends both http and https traffic through it. Rotation order is file
//! order, one full pass per outer iteration.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::probe::ProbeRoute;

/// One proxy, e.g. `http://10.0.0.2:3128` or `socks5h://10.0.0.3:1080`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint(String);

impl ProxyEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Probe route that tunnels both http and https through this proxy.
    pub fn route(&self) -> ProbeRoute {
        ProbeRoute::Proxy(self.0.clone())
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a proxy list: one endpoint per line, `#` comments and blank lines
/// skipped, first occurrence of a duplicate kept, order preserved.
pub fn parse_proxy_list(content: &str) -> Vec<ProxyEndpoint> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(*line))
        .map(ProxyEndpoint::new)
        .collect()
}

/// Read and parse a UTF-8 proxy list file.
pub fn load_proxy_list(path: &Path) -> io::Result<Vec<ProxyEndpoint>> {
    Ok(parse_proxy_list(&fs::read_to_string(path)?))
}
