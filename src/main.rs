//! Identity rotator (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                 IDENTITY ROTATOR                      │
//!                    │                                                       │
//!   CLI flags ───────┼─▶ config ──▶ RotationConfig (immutable, Arc)          │
//!   + TOML file      │                     │                                 │
//!                    │                     ▼                                 │
//!   SIGINT/SIGTERM ──┼─▶ lifecycle ──▶ ┌──────────────┐                      │
//!                    │   (Shutdown)    │ orchestrator │──▶ observability     │
//!                    │                 └──────┬───────┘    (event log,       │
//!                    │                        │             metrics)         │
//!                    │        ┌───────────────┼───────────────┐              │
//!                    │        ▼               ▼               ▼              │
//!                    │  strategy::tor  strategy::proxy  strategy::vpn        │
//!                    │   (control port)  (route map)    (process)            │
//!                    │        │               │               │              │
//!                    │        └───────────────┼───────────────┘              │
//!                    │                        ▼                              │
//!                    │                 probe (echo my IP) ───────────────────┼──▶ Internet
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;

use identity_rotator::config::Cli;
use identity_rotator::lifecycle::{spawn_signal_listener, Shutdown};
use identity_rotator::observability::{self, EventLog};
use identity_rotator::{Collaborators, Orchestrator, RotateError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            observability::init_tracing("info");
            tracing::error!("Fatal error: {}", e);
            return Err(RotateError::from(e).into());
        }
    };

    observability::init_tracing(&config.observability.log_level);

    tracing::info!(
        mode = %config.mode,
        interval_secs = config.interval_secs,
        settle_secs = config.settle_secs,
        count = config.count,
        run_once = config.run_once,
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %address, "Failed to parse metrics address"),
        }
    }

    let log = match &config.log_file {
        Some(path) => EventLog::open(path),
        None => EventLog::console_only(),
    };

    let config = Arc::new(config);
    let collaborators = Collaborators::system(&config)?;
    let shutdown = Shutdown::new();
    let listener = spawn_signal_listener(shutdown.clone());

    let orchestrator = Orchestrator::new(config, collaborators, shutdown, log);
    let outcome = tokio::spawn(orchestrator.run())
        .await
        .map_err(|e| RotateError::Internal(e.to_string()))
        .and_then(|result| result);
    listener.abort();

    match outcome {
        Ok(report) => {
            tracing::info!(
                iterations = report.iterations,
                cycles = report.cycles.len(),
                successes = report.successes(),
                exit = %report.exit,
                "Shutdown complete"
            );
            Ok(())
        }
        Err(e) => {
            // The orchestrator records its own fatal errors in the event log.
            if matches!(e, RotateError::Internal(_)) {
                tracing::error!("Fatal error: {}", e);
            }
            Err(e.into())
        }
    }
}
