//! Identity rotator library.
//!
//! Periodically changes the host's externally visible IP by signaling Tor
//! for a new circuit, cycling through proxies, or starting and stopping VPN
//! tunnels, and verifies each change with an external IP probe.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod probe;
pub mod process;
pub mod strategy;

pub use config::{Mode, RotationConfig};
pub use error::{RotateError, RotateResult};
pub use lifecycle::Shutdown;
pub use orchestrator::{Collaborators, Orchestrator, RunReport};
