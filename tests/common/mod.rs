//! Shared fakes for orchestrator and adapter tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use identity_rotator::config::RotationConfig;
use identity_rotator::observability::EventLog;
use identity_rotator::probe::{IpLookup, IpResult, ProbeError, ProbeRoute};
use identity_rotator::process::{
    CommandSpec, ExternalProcess, ProcessError, ProcessExit, ProcessLauncher,
};
use identity_rotator::strategy::Confirm;
use identity_rotator::{Collaborators, Orchestrator, Shutdown};

/// Start an "echo my IP" backend that answers every request with `body`.
///
/// Also serves as a plain HTTP proxy: absolute-form requests get the same
/// answer, which is how tests tell routes apart.
pub async fn start_echo_backend(body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    start_backend(200, body).await
}

/// Start a backend answering every request with `status` and `body`.
pub async fn start_backend(status: u16, body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let counter = counter.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                        let response = format!(
                            "HTTP/1.1 {} Status\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}\n",
                            status,
                            body.len() + 1,
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// A scripted Tor control port.
pub struct MockControlPort {
    pub addr: SocketAddr,
    pub accepted: Arc<AtomicUsize>,
    pub received: Arc<Mutex<Vec<String>>>,
}

/// Answer each command line with the next scripted reply.
pub async fn start_control_port(replies: Vec<&'static str>) -> MockControlPort {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let received = Arc::new(Mutex::new(Vec::new()));

    let (acc, rec) = (accepted.clone(), received.clone());
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            acc.fetch_add(1, Ordering::SeqCst);
            let rec = rec.clone();
            let mut replies: VecDeque<&'static str> = replies.clone().into();
            tokio::spawn(async move {
                let (read_half, mut write_half) = socket.into_split();
                let mut lines = BufReader::new(read_half).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    rec.lock().unwrap().push(line);
                    let Some(reply) = replies.pop_front() else { break };
                    if write_half.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    MockControlPort { addr, accepted, received }
}

/// An unused local address; connecting to it is refused.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// IP lookup answering from a per-route script and recording every call.
#[derive(Default)]
pub struct ScriptedProbe {
    answers: Mutex<Vec<(ProbeRoute, IpResult)>>,
    pub calls: Mutex<Vec<ProbeRoute>>,
}

impl ScriptedProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer probes on `route` with `ip` (last registration wins).
    pub fn answer(&self, route: ProbeRoute, ip: &str) {
        self.answers
            .lock()
            .unwrap()
            .push((route, Ok(ip.parse().unwrap())));
    }

    pub fn calls(&self) -> Vec<ProbeRoute> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IpLookup for ScriptedProbe {
    async fn probe(&self, route: &ProbeRoute, _timeout: Duration) -> IpResult {
        self.calls.lock().unwrap().push(route.clone());
        self.answers
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(r, _)| r == route)
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| Err(ProbeError::Connect("no scripted answer".into())))
    }
}

/// Shared view of what a fake process saw.
#[derive(Debug, Default)]
pub struct ProcessLog {
    pub terminated: AtomicUsize,
    pub killed: AtomicUsize,
}

/// Behaviour of the next started process.
#[derive(Debug, Clone, Copy)]
pub enum FakeBehaviour {
    /// Exits on its own with this code before the grace delay ends.
    ExitsEarly(i32),
    /// Keeps running until terminated.
    Runs,
    /// Ignores terminate, only dies when killed.
    IgnoresTerm,
}

struct FakeProcess {
    behaviour: FakeBehaviour,
    terminated: bool,
    killed: bool,
    log: Arc<ProcessLog>,
}

#[async_trait]
impl ExternalProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn poll_exit_code(&mut self) -> Result<Option<ProcessExit>, ProcessError> {
        Ok(match self.behaviour {
            FakeBehaviour::ExitsEarly(code) => Some(ProcessExit { code: Some(code) }),
            _ if self.killed || self.terminated => Some(ProcessExit { code: None }),
            _ => None,
        })
    }

    fn terminate(&mut self) -> Result<(), ProcessError> {
        self.log.terminated.fetch_add(1, Ordering::SeqCst);
        if !matches!(self.behaviour, FakeBehaviour::IgnoresTerm) {
            self.terminated = true;
        }
        Ok(())
    }

    fn kill(&mut self) -> Result<(), ProcessError> {
        self.log.killed.fetch_add(1, Ordering::SeqCst);
        self.killed = true;
        Ok(())
    }

    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ProcessExit>, ProcessError> {
        if let Some(exit) = self.poll_exit_code()? {
            return Ok(Some(exit));
        }
        tokio::time::sleep(timeout).await;
        self.poll_exit_code()
    }
}

/// Records every launch instead of creating processes.
#[derive(Default)]
pub struct RecordingLauncher {
    pub started: Mutex<Vec<String>>,
    pub ran: Mutex<Vec<String>>,
    behaviours: Mutex<VecDeque<FakeBehaviour>>,
    run_exit_codes: Mutex<VecDeque<i32>>,
    missing: Mutex<Vec<String>>,
    pub processes: Arc<ProcessLog>,
}

impl RecordingLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_behaviours(behaviours: Vec<FakeBehaviour>) -> Arc<Self> {
        let launcher = Self::default();
        *launcher.behaviours.lock().unwrap() = behaviours.into();
        Arc::new(launcher)
    }

    pub fn with_run_exit_codes(codes: Vec<i32>) -> Arc<Self> {
        let launcher = Self::default();
        *launcher.run_exit_codes.lock().unwrap() = codes.into();
        Arc::new(launcher)
    }

    /// A launcher on which `program` is not installed.
    pub fn without(program: &str) -> Arc<Self> {
        let launcher = Self::default();
        launcher.missing.lock().unwrap().push(program.to_string());
        Arc::new(launcher)
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn ran(&self) -> Vec<String> {
        self.ran.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    fn start(&self, command: &CommandSpec) -> Result<Box<dyn ExternalProcess>, ProcessError> {
        self.started.lock().unwrap().push(command.to_string());
        let behaviour = self
            .behaviours
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FakeBehaviour::Runs);
        Ok(Box::new(FakeProcess {
            behaviour,
            terminated: false,
            killed: false,
            log: self.processes.clone(),
        }))
    }

    async fn run(&self, command: &CommandSpec) -> Result<ProcessExit, ProcessError> {
        self.ran.lock().unwrap().push(command.to_string());
        match self.run_exit_codes.lock().unwrap().pop_front() {
            Some(code) => Ok(ProcessExit { code: Some(code) }),
            None => Err(ProcessError::BinaryNotFound(command.program.clone())),
        }
    }

    fn is_available(&self, program: &str) -> bool {
        !self.missing.lock().unwrap().iter().any(|m| m == program)
    }
}

/// Confirmation with a fixed answer.
pub struct FixedConfirm(pub bool);

#[async_trait]
impl Confirm for FixedConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Config with no waits, pointing Tor at `control_addr`.
pub fn fast_config(control_addr: SocketAddr) -> RotationConfig {
    let mut config = RotationConfig::default();
    config.interval_secs = 0;
    config.settle_secs = 0;
    config.tor.control_addr = control_addr.to_string();
    config.tor.connect_timeout_secs = 2;
    config.vpn.min_settle_secs = 0;
    config.vpn.post_teardown_secs = 0;
    config
}

/// Build an orchestrator that logs to `log_path`.
pub fn orchestrator(
    config: RotationConfig,
    probe: Arc<dyn IpLookup>,
    launcher: Arc<dyn ProcessLauncher>,
    confirm: bool,
    shutdown: Shutdown,
    log_path: &Path,
) -> Orchestrator {
    let collaborators = Collaborators {
        probe,
        launcher,
        confirm: Arc::new(FixedConfirm(confirm)),
    };
    Orchestrator::new(Arc::new(config), collaborators, shutdown, EventLog::open(log_path))
}

pub fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}
