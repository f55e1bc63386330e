//! Rotation engine.
//!
//! # Responsibilities
//! - Load rotation targets (proxy list, VPN profiles) once per run
//! - Drive iterations per mode: Tor, then every proxy, then every profile
//! - Probe before/after IPs and record one `CycleResult` per target
//! - Honor cancellation at every loop head and inside every wait
//!
//! # Design Decisions
//! - Strictly sequential: the next target starts only after the previous
//!   one's probe and teardown completed
//! - A failing target is logged and skipped; only `RotateError` ends a run
//! - Dry-run never touches an adapter or the network, it only logs

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Mode, RotationConfig};
use crate::error::{RotateError, RotateResult};
use crate::lifecycle::Shutdown;
use crate::observability::{metrics, EventLog};
use crate::orchestrator::report::{CycleResult, ExitReason, Observation, RunReport};
use crate::orchestrator::state::{Phase, RunState};
use crate::probe::{HttpIpProbe, IpLookup, ProbeRoute};
use crate::process::{Privilege, ProcessError, ProcessLauncher, Teardown, TokioLauncher};
use crate::strategy::{
    find_profiles, load_proxy_list, Confirm, ProxyEndpoint, ServiceRestarter, Strategy,
    TerminalConfirm, TorController, VpnAdapter, VpnProfile,
};

/// External capabilities the orchestrator depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn IpLookup>,
    pub launcher: Arc<dyn ProcessLauncher>,
    pub confirm: Arc<dyn Confirm>,
}

impl Collaborators {
    /// Real HTTP probe, real subprocesses, terminal confirmation.
    pub fn system(config: &RotationConfig) -> RotateResult<Self> {
        Ok(Self {
            probe: Arc::new(HttpIpProbe::new(config.probe.url.clone())?),
            launcher: Arc::new(TokioLauncher),
            confirm: Arc::new(TerminalConfirm),
        })
    }
}

/// Drives repeated identity-change cycles.
pub struct Orchestrator {
    config: Arc<RotationConfig>,
    log: EventLog,
    probe: Arc<dyn IpLookup>,
    tor: TorController,
    restarter: ServiceRestarter,
    vpn: VpnAdapter,
    shutdown: Shutdown,
    state: RunState,
    cycles: Vec<CycleResult>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<RotationConfig>,
        collaborators: Collaborators,
        shutdown: Shutdown,
        log: EventLog,
    ) -> Self {
        let privilege = Privilege::from_config(&config.privilege);
        let restarter = ServiceRestarter::new(
            collaborators.launcher.clone(),
            collaborators.confirm,
            &privilege,
            &config.tor.service_name,
        );
        let vpn = VpnAdapter::new(collaborators.launcher, privilege, &config.vpn);

        Self {
            tor: TorController::from_config(&config.tor),
            restarter,
            vpn,
            probe: collaborators.probe,
            state: RunState::new(shutdown.clone()),
            shutdown,
            log,
            config,
            cycles: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Run until cancelled, `run_once` completes, or the count is reached.
    pub async fn run(mut self) -> RotateResult<RunReport> {
        match self.drive().await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.log.record(format!("Fatal error: {}", e));
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> RotateResult<RunReport> {
        self.state.transition(Phase::Running);
        self.log.record(format!("Rotator started. Mode: {}", self.config.mode));
        if self.config.dry_run {
            self.log.record("Dry-run mode enabled. Privileged actions will NOT run.");
        }

        let proxies = self.load_proxies()?;
        let profiles = self.load_profiles()?;

        let exit = loop {
            if self.state.is_cancelled() {
                break ExitReason::Cancelled;
            }

            let iteration = self.state.begin_iteration();
            self.log.record(format!("--- Iteration {} ---", iteration));
            self.state.transition(Phase::SelectMode);

            self.run_iteration(&proxies, &profiles).await;
            metrics::record_iteration();

            if let Some(reason) = self.state.stop_reason(&self.config) {
                match reason {
                    ExitReason::RunOnce => self.log.record("run_once specified; exiting loop."),
                    ExitReason::CountReached(n) => {
                        self.log.record(format!("Reached count {}, exiting.", n))
                    }
                    ExitReason::Cancelled => {}
                }
                break reason;
            }
        };

        self.state.transition(Phase::Stopping);
        if exit == ExitReason::Cancelled {
            self.log.record("Interrupt received, stopping...");
        }
        self.state.transition(Phase::Stopped);
        self.log.record("Rotator finished.");

        Ok(RunReport {
            iterations: self.state.iteration(),
            cycles: std::mem::take(&mut self.cycles),
            exit,
        })
    }

    async fn run_iteration(&mut self, proxies: &[ProxyEndpoint], profiles: &[VpnProfile]) {
        let mode = self.config.mode;

        if mode.runs_tor() && !self.state.is_cancelled() {
            self.log.record("Running TOR change...");
            let result = self.tor_cycle().await;
            self.finish_cycle(result);
        }

        if mode.runs_proxy() && !proxies.is_empty() && !self.state.is_cancelled() {
            let before = self.observe(&ProbeRoute::Direct, "IP before (direct)").await;
            for endpoint in proxies {
                if self.state.is_cancelled() {
                    break;
                }
                self.log.record(format!("Using proxy: {}", endpoint));
                let result = self.proxy_cycle(endpoint, before.clone()).await;
                self.finish_cycle(result);
                self.inter_cycle_wait().await;
            }
        }

        if mode.runs_vpn() && !profiles.is_empty() {
            for profile in profiles {
                if self.state.is_cancelled() {
                    break;
                }
                self.log.record(format!("Using VPN config: {}", profile.path().display()));
                let result = self.vpn_cycle(profile).await;
                self.finish_cycle(result);
                self.inter_cycle_wait().await;
            }
        }

        if mode == Mode::Proxy && proxies.is_empty() {
            self.log.record("No proxies provided; sleeping.");
            self.inter_cycle_wait().await;
        }
        if mode == Mode::Vpn && profiles.is_empty() {
            self.log.record("No VPN profiles (.ovpn files) provided; sleeping.");
            self.inter_cycle_wait().await;
        }
    }

    async fn tor_cycle(&mut self) -> CycleResult {
        let target = self.tor.addr().to_string();
        let before = self.observe(&ProbeRoute::Direct, "IP before (direct)").await;
        self.state.transition(Phase::Execute(Strategy::Tor));

        if self.config.dry_run {
            self.log.record(format!("[dry-run] Would send SIGNAL NEWNYM to {}", target));
            return CycleResult::simulated(Strategy::Tor, target);
        }

        let changed = match self.tor.new_identity().await {
            Ok(()) => {
                self.log.record("Requested NEWNYM via Tor control port.");
                Ok(())
            }
            Err(e) => {
                self.log.record(format!(
                    "Tor control port NEWNYM failed ({}); falling back to service restart.",
                    e
                ));
                self.restarter.restart(&self.log, &self.shutdown).await
            }
        };

        if let Err(e) = changed {
            self.log.record(format!("NEWNYM failed: TOR identity change did not complete ({}).", e));
            return CycleResult::failed(Strategy::Tor, target, before, e);
        }

        let socks = ProbeRoute::Proxy(self.config.tor.socks_proxy_url());
        let after = self
            .settle_and_observe(Strategy::Tor, self.config.settle(), &socks, "IP after (via TOR)")
            .await;
        CycleResult {
            strategy: Strategy::Tor,
            target,
            success: true,
            before,
            after,
            error: None,
        }
    }

    async fn proxy_cycle(&mut self, endpoint: &ProxyEndpoint, before: Observation) -> CycleResult {
        self.state.transition(Phase::Execute(Strategy::Proxy));

        if self.config.dry_run {
            self.log.record(format!("[dry-run] Would route the IP check through {}", endpoint));
            return CycleResult::simulated(Strategy::Proxy, endpoint.as_str());
        }

        let label = format!("IP via proxy {}", endpoint);
        let after = self
            .settle_and_observe(Strategy::Proxy, self.config.settle(), &endpoint.route(), &label)
            .await;
        let success = after.ip().is_some();
        CycleResult {
            strategy: Strategy::Proxy,
            target: endpoint.to_string(),
            success,
            error: (!success).then(|| after.to_string()),
            before,
            after,
        }
    }

    async fn vpn_cycle(&mut self, profile: &VpnProfile) -> CycleResult {
        let target = profile.path().display().to_string();
        let before = self.observe(&ProbeRoute::Direct, "IP before (direct)").await;
        self.state.transition(Phase::Execute(Strategy::Vpn));

        if self.config.dry_run {
            self.log.record(format!(
                "[dry-run] Would start {} --config {}",
                self.config.vpn.binary, target
            ));
            return CycleResult::simulated(Strategy::Vpn, target);
        }

        self.log.record(format!("Starting VPN config: {}", target));
        let session = match self.vpn.connect(profile).await {
            Ok(session) => session,
            Err(e) => {
                match &e {
                    ProcessError::BinaryNotFound(binary) => self.log.record(format!(
                        "VPN client binary not found ({}). Install it (e.g. apt install openvpn).",
                        binary
                    )),
                    ProcessError::ExitedEarly(exit) => self
                        .log
                        .record(format!("VPN process exited quickly ({}).", exit)),
                    other => self.log.record(format!("Failed to start VPN client: {}", other)),
                }
                self.log.record("VPN failed to start for this config.");
                return CycleResult::failed(Strategy::Vpn, target, before, e);
            }
        };
        self.log.record(format!("VPN process started (pid {:?}).", session.pid()));

        let settle = self.config.vpn_settle();
        self.log.record(format!(
            "Sleeping {} seconds for VPN to establish...",
            settle.as_secs()
        ));
        let after = self
            .settle_and_observe(Strategy::Vpn, settle, &ProbeRoute::Direct, "IP after VPN")
            .await;

        match session.teardown().await {
            Some(Teardown::Terminated(_)) => self.log.record("VPN process terminated."),
            Some(Teardown::Killed) => {
                self.log.record("VPN process did not exit in time and was killed.")
            }
            Some(Teardown::AlreadyExited(exit)) => self
                .log
                .record(format!("VPN process had already exited ({}).", exit)),
            None => {}
        }
        self.shutdown
            .sleep(Duration::from_secs(self.config.vpn.post_teardown_secs))
            .await;

        CycleResult {
            strategy: Strategy::Vpn,
            target,
            success: true,
            before,
            after,
            error: None,
        }
    }

    /// Wait for the change to take effect, then probe unless cancelled.
    async fn settle_and_observe(
        &mut self,
        strategy: Strategy,
        settle: Duration,
        route: &ProbeRoute,
        label: &str,
    ) -> Observation {
        self.state.transition(Phase::SettleAndProbe(strategy));
        if !self.shutdown.sleep(settle).await {
            return Observation::NotProbed;
        }
        self.observe(route, label).await
    }

    async fn observe(&mut self, route: &ProbeRoute, label: &str) -> Observation {
        if self.config.dry_run {
            return Observation::Simulated;
        }
        let observation: Observation = self.probe.probe(route, self.config.probe.timeout()).await.into();
        if let Observation::Failed(_) = observation {
            metrics::record_probe_failure(route.label());
        }
        self.log.record(format!("{}: {}", label, observation));
        observation
    }

    async fn inter_cycle_wait(&mut self) {
        self.state.transition(Phase::InterCycleWait);
        self.shutdown.sleep(self.config.interval()).await;
    }

    fn finish_cycle(&mut self, result: CycleResult) {
        metrics::record_cycle(result.strategy.as_str(), result.success);
        self.cycles.push(result);
    }

    fn load_proxies(&self) -> RotateResult<Vec<ProxyEndpoint>> {
        let Some(path) = &self.config.proxy_list else {
            return Ok(Vec::new());
        };
        let proxies = load_proxy_list(path).map_err(|source| RotateError::ProxyList {
            path: path.clone(),
            source,
        })?;
        self.log.record(format!("Loaded {} proxies from {}", proxies.len(), path.display()));
        Ok(proxies)
    }

    fn load_profiles(&self) -> RotateResult<Vec<VpnProfile>> {
        let Some(dir) = &self.config.vpn_dir else {
            return Ok(Vec::new());
        };
        let profiles = find_profiles(dir).map_err(|source| RotateError::VpnDir {
            path: dir.clone(),
            source,
        })?;
        self.log.record(format!("Found {} .ovpn files in {}", profiles.len(), dir.display()));
        Ok(profiles)
    }
}
