//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (command-line flags overlay the file)
//!     → validation.rs (semantic checks)
//!     → RotationConfig (validated, immutable)
//!     → shared via Arc with the orchestrator and adapters
//! ```
//!
//! # Design Decisions
//! - Config is resolved once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::ConfigError;
pub use schema::{
    Mode, ObservabilityConfig, PrivilegeConfig, ProbeConfig, RotationConfig, TorConfig, VpnConfig,
};
