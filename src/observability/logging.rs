//! Structured logging and the persistent event log.
//!
//! # Responsibilities
//! - Initialize the console tracing subscriber
//! - Append timestamped rotation events to the log file
//! - Mirror every event to the console
//!
//! # Design Decisions
//! - Uses tracing crate for console output
//! - The event log is an explicit instance owned by the orchestrator,
//!   not a global; it is flushed when dropped at shutdown
//! - An unwritable log file degrades to console-only

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the console subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("identity_rotator={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Append-only event log, one `<timestamp> UTC | <message>` line per event.
#[derive(Debug)]
pub struct EventLog {
    path: Option<PathBuf>,
    sink: Option<Mutex<BufWriter<File>>>,
}

impl EventLog {
    /// Open (or create) the log file in append mode.
    pub fn open(path: &Path) -> Self {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                path: Some(path.to_path_buf()),
                sink: Some(Mutex::new(BufWriter::new(file))),
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot open event log, logging to console only");
                Self::console_only()
            }
        }
    }

    /// An event log that only mirrors to the console.
    pub fn console_only() -> Self {
        Self { path: None, sink: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record an event.
    pub fn record(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!("{}", message);

        let Some(sink) = &self.sink else { return };
        let line = format_line(&timestamp(), message);
        let Ok(mut writer) = sink.lock() else { return };
        if let Err(e) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
            tracing::warn!(error = %e, "Failed to write event log");
        }
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Some(sink) = &self.sink {
            if let Ok(mut writer) = sink.lock() {
                let _ = writer.flush();
            }
        }
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_line(timestamp: &str, message: &str) -> String {
    format!("{} UTC | {}\n", timestamp, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");

        {
            let log = EventLog::open(&path);
            log.record("first");
        }
        {
            let log = EventLog::open(&path);
            log.record("second");
            assert_eq!(log.path(), Some(path.as_path()));
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" UTC | first"));
        assert!(lines[1].ends_with(" UTC | second"));

        let ts = lines[0].split(" UTC | ").next().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_unwritable_path_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::open(&dir.path().join("missing").join("events.log"));
        assert!(log.path().is_none());
        log.record("still fine");
    }

    #[test]
    fn test_format_line() {
        assert_eq!(format_line("2024-01-01T00:00:00Z", "hi"), "2024-01-01T00:00:00Z UTC | hi\n");
    }
}
