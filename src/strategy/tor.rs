//! Tor control-port client.
//!
//! # Protocol
//! ```text
//! → AUTHENTICATE ["password"]      ← 250 OK
//! → SIGNAL NEWNYM                  ← 250 OK
//! ```
//!
//! Replies are `<code><sep><text>` lines where `sep` is `-` (more lines
//! follow), `+` (a data block terminated by "." follows) or ` ` (final line).
//! Only a final line whose code is exactly `250` counts as success.
//!
//! # Design Decisions
//! - One connection per identity change, dropped on every exit path
//! - No retry here; the service-restart fallback is the caller's decision

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::TorConfig;

/// The control-protocol status code for success.
pub const STATUS_OK: &str = "250";

/// Errors from one Tor identity-change attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TorError {
    #[error("control connection refused: {0}")]
    ConnectionRefused(String),

    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    #[error("signal rejected: {0}")]
    SignalRejected(String),

    #[error("control protocol error: {0}")]
    Protocol(String),

    #[error("service restart declined")]
    RestartDeclined,

    #[error("service restart unavailable")]
    ServiceRestartUnavailable,
}

/// A parsed control-port reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Status code of the final line.
    pub code: String,
    /// Text of every line, status prefixes stripped.
    pub lines: Vec<String>,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.code == STATUS_OK
    }

    /// The reply as Tor sent it, for logging.
    pub fn summary(&self) -> String {
        format!("{} {}", self.code, self.lines.join(" | "))
    }
}

/// Sends NEWNYM over the Tor control port.
#[derive(Debug, Clone)]
pub struct TorController {
    addr: String,
    password: Option<String>,
    timeout: Duration,
}

impl TorController {
    pub fn from_config(config: &TorConfig) -> Self {
        Self {
            addr: config.control_addr.clone(),
            password: config.control_password.clone(),
            timeout: config.connect_timeout(),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Authenticate and request a new identity.
    pub async fn new_identity(&self) -> Result<(), TorError> {
        let stream = match timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TorError::ConnectionRefused(format!("{}: {}", self.addr, e))),
            Err(_) => {
                return Err(TorError::ConnectionRefused(format!(
                    "{}: timed out after {:?}",
                    self.addr, self.timeout
                )))
            }
        };

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let auth = authenticate_command(self.password.as_deref());
        let reply = self.exchange(&mut reader, &mut write_half, &auth).await?;
        if !reply.is_ok() {
            return Err(TorError::AuthenticationRejected(reply.summary()));
        }

        let reply = self
            .exchange(&mut reader, &mut write_half, "SIGNAL NEWNYM")
            .await?;
        if !reply.is_ok() {
            return Err(TorError::SignalRejected(reply.summary()));
        }

        tracing::debug!(addr = %self.addr, "NEWNYM accepted");
        Ok(())
    }

    async fn exchange<R, W>(&self, reader: &mut R, writer: &mut W, command: &str) -> Result<Reply, TorError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let line = format!("{}\r\n", command);
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TorError::Protocol(format!("write failed: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| TorError::Protocol(format!("flush failed: {}", e)))?;

        match timeout(self.timeout, read_reply(reader)).await {
            Ok(reply) => reply,
            Err(_) => Err(TorError::Protocol(format!("no reply within {:?}", self.timeout))),
        }
    }
}

/// `AUTHENTICATE` with an optional password as a QuotedString.
pub fn authenticate_command(password: Option<&str>) -> String {
    match password {
        Some(password) => format!("AUTHENTICATE \"{}\"", quote(password)),
        None => "AUTHENTICATE".to_string(),
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Read one complete reply, following continuation and data lines.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, TorError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let line = next_line(reader).await?;
        let Some((code, sep, text)) = split_status(&line) else {
            return Err(TorError::Protocol(format!("malformed reply line: {:?}", line)));
        };
        lines.push(text.to_string());

        if sep == ' ' {
            return Ok(Reply {
                code: code.to_string(),
                lines,
            });
        }
        if sep == '+' {
            while next_line(reader).await? != "." {}
        }
    }
}

async fn next_line<R>(reader: &mut R) -> Result<String, TorError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| TorError::Protocol(format!("read failed: {}", e)))?;
    if read == 0 {
        return Err(TorError::Protocol("connection closed by Tor".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Split `250 OK` into `("250", ' ', "OK")`. A bare `250` is a final line.
fn split_status(line: &str) -> Option<(&str, char, &str)> {
    let code = line.get(..3)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let rest = &line[3..];
    let mut chars = rest.chars();
    match chars.next() {
        None => Some((code, ' ', "")),
        Some(sep @ (' ' | '-' | '+')) => Some((code, sep, chars.as_str())),
        Some(_) => None,
    }
}
