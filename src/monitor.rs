//! Backend connectivity tracking.
//!
//! [`ConnectionMonitor`] probes the backend on a schedule, publishes a
//! [`ConnectionState`] through a `watch` channel and refreshes every store when the
//! connection comes back. The schedule itself lives in [`Machine`], which has no I/O
//! and is driven by probe outcomes alone.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::api::SharedApi;
use crate::config::SyncConfig;
use crate::store::{BulkReload, LoadReport};
use crate::time::now_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../ui/bindings/")]
pub enum ConnectionPhase {
    Connected,
    Disconnected,
    Connecting,
    ConnectionError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/bindings/")]
pub struct ConnectionState {
    pub is_connected: bool,
    pub status: ConnectionPhase,
    #[ts(optional)]
    pub last_checked: Option<String>,
    #[ts(optional)]
    pub error_message: Option<String>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            is_connected: false,
            status: ConnectionPhase::Disconnected,
            last_checked: None,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Up,
    Down(String),
}

/// What the driver does after a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub phase: ConnectionPhase,
    pub next_delay: Duration,
    /// Reload every store: the connection has just been (re)established.
    pub reload: bool,
    /// Best-effort reload after retries ran out. The probe is known to report false
    /// negatives, so data may still be reachable.
    pub fallback_load: bool,
}

/// Pure connection schedule.
#[derive(Debug, Clone)]
pub struct Machine {
    config: SyncConfig,
    phase: ConnectionPhase,
    attempt: u32,
}

impl Machine {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            phase: ConnectionPhase::Disconnected,
            attempt: 0,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Failed probes so far in the current retry cycle.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Called before a probe. Returns `Connecting` when that should be published.
    pub fn begin_probe(&mut self) -> Option<ConnectionPhase> {
        if self.phase == ConnectionPhase::Connected {
            return None;
        }
        self.phase = ConnectionPhase::Connecting;
        Some(self.phase)
    }

    pub fn on_probe(&mut self, outcome: &ProbeOutcome) -> Step {
        match outcome {
            ProbeOutcome::Up => {
                let reload = self.phase != ConnectionPhase::Connected;
                self.phase = ConnectionPhase::Connected;
                self.attempt = 0;
                Step {
                    phase: self.phase,
                    next_delay: self.config.probe_interval,
                    reload,
                    fallback_load: false,
                }
            }
            ProbeOutcome::Down(_) => self.on_failure(),
        }
    }

    fn on_failure(&mut self) -> Step {
        // `Connecting` stands in for the phase it was entered from; an exhausted
        // cycle keeps polling at the steady interval without another fallback.
        if self.phase == ConnectionPhase::Connected {
            self.attempt = 0;
        } else if self.phase == ConnectionPhase::ConnectionError || self.exhausted() {
            self.phase = ConnectionPhase::ConnectionError;
            return self.steady(false);
        }

        let failures = self.attempt + 1;
        if failures >= self.config.max_retries {
            self.attempt = failures;
            self.phase = ConnectionPhase::ConnectionError;
            return self.steady(true);
        }

        let next_delay = self.config.retry_delay(self.attempt);
        self.attempt = failures;
        self.phase = ConnectionPhase::Disconnected;
        Step {
            phase: self.phase,
            next_delay,
            reload: false,
            fallback_load: false,
        }
    }

    fn exhausted(&self) -> bool {
        self.attempt >= self.config.max_retries
    }

    fn steady(&self, fallback_load: bool) -> Step {
        Step {
            phase: self.phase,
            next_delay: self.config.probe_interval,
            reload: false,
            fallback_load,
        }
    }
}

struct Runner {
    subscribers: usize,
    /// Bumped by `shutdown`; subscriptions from an earlier generation no longer count.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    api: SharedApi,
    reloader: Arc<dyn BulkReload>,
    machine: Mutex<Machine>,
    state: watch::Sender<ConnectionState>,
    probe_lock: AsyncMutex<()>,
    runner: Mutex<Runner>,
}

/// Connectivity service. Cheap to clone; clones share one schedule.
///
/// The polling task starts with the first [`subscribe`](Self::subscribe) and is
/// aborted when the last [`MonitorSubscription`] drops or on [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct ConnectionMonitor {
    inner: Arc<Inner>,
}

fn log_reload(report: &LoadReport, event: &'static str) {
    if report.is_complete() {
        info!(target: "feepro", event = event, kinds = report.results.len());
        return;
    }
    for (kind, err) in report.failures() {
        warn!(target: "feepro", event = event, kind = %kind, error = %err);
    }
}

impl Inner {
    fn publish(&self, phase: ConnectionPhase, error_message: Option<String>, checked: bool) {
        self.state.send_modify(|state| {
            state.status = phase;
            state.is_connected = phase == ConnectionPhase::Connected;
            if checked {
                state.last_checked = Some(now_rfc3339());
                state.error_message = error_message;
            }
        });
    }

    async fn probe_once(&self) -> Duration {
        let _serial = self.probe_lock.lock().await;

        let connecting = {
            let mut machine = self.machine.lock().unwrap_or_else(|e| e.into_inner());
            machine.begin_probe()
        };
        if let Some(phase) = connecting {
            self.publish(phase, None, false);
        }

        let outcome = match self.api.connection_status().await {
            Ok(status) if status.is_connected => ProbeOutcome::Up,
            Ok(status) => ProbeOutcome::Down(
                status
                    .error_message
                    .unwrap_or_else(|| "backend reported disconnected".to_string()),
            ),
            Err(err) => ProbeOutcome::Down(err.to_string()),
        };

        let (step, attempt) = {
            let mut machine = self.machine.lock().unwrap_or_else(|e| e.into_inner());
            let step = machine.on_probe(&outcome);
            (step, machine.attempt())
        };
        let error_message = match &outcome {
            ProbeOutcome::Up => None,
            ProbeOutcome::Down(message) => Some(message.clone()),
        };
        debug!(
            target: "feepro",
            event = "connection_probe",
            phase = ?step.phase,
            attempt = attempt,
            next_delay_secs = step.next_delay.as_secs()
        );
        if let Some(message) = &error_message {
            warn!(
                target: "feepro",
                event = "connection_probe_failed",
                phase = ?step.phase,
                attempt = attempt,
                error = %message
            );
        }
        self.publish(step.phase, error_message, true);

        if step.reload {
            info!(target: "feepro", event = "connection_restored");
            let report = self.reloader.reload_all().await;
            log_reload(&report, "reconnect_reload");
        }
        if step.fallback_load {
            warn!(target: "feepro", event = "connection_retries_exhausted", attempt = attempt);
            let report = self.reloader.reload_all().await;
            log_reload(&report, "fallback_reload");
        }
        step.next_delay
    }
}

impl ConnectionMonitor {
    pub fn new(api: SharedApi, reloader: Arc<dyn BulkReload>, config: SyncConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            inner: Arc::new(Inner {
                api,
                reloader,
                machine: Mutex::new(Machine::new(config)),
                state,
                probe_lock: AsyncMutex::new(()),
                runner: Mutex::new(Runner {
                    subscribers: 0,
                    generation: 0,
                    task: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Registers interest in the connection state, starting the poller if needed.
    /// Must be called inside a Tokio runtime.
    pub fn subscribe(&self) -> MonitorSubscription {
        let mut runner = self.inner.runner.lock().unwrap_or_else(|e| e.into_inner());
        runner.subscribers += 1;
        if runner.task.is_none() {
            let inner = self.inner.clone();
            runner.task = Some(tokio::spawn(async move {
                loop {
                    let delay = inner.probe_once().await;
                    tokio::time::sleep(delay).await;
                }
            }));
            info!(target: "feepro", event = "connection_monitor_started");
        }
        MonitorSubscription {
            monitor: self.clone(),
            generation: runner.generation,
            rx: self.inner.state.subscribe(),
        }
    }

    pub fn is_running(&self) -> bool {
        let runner = self.inner.runner.lock().unwrap_or_else(|e| e.into_inner());
        runner.task.is_some()
    }

    /// Probes right away, outside the schedule, and returns the resulting state.
    pub async fn check_now(&self) -> ConnectionState {
        self.inner.probe_once().await;
        self.state()
    }

    /// Stops polling regardless of live subscriptions. Subscriptions taken before the
    /// shutdown no longer keep a later poller alive, nor stop it when dropped.
    pub fn shutdown(&self) {
        let mut runner = self.inner.runner.lock().unwrap_or_else(|e| e.into_inner());
        runner.subscribers = 0;
        runner.generation += 1;
        Self::stop(&mut runner);
    }

    fn release(&self, generation: u64) {
        let mut runner = self.inner.runner.lock().unwrap_or_else(|e| e.into_inner());
        if runner.generation != generation {
            return;
        }
        runner.subscribers = runner.subscribers.saturating_sub(1);
        if runner.subscribers == 0 {
            Self::stop(&mut runner);
        }
    }

    fn stop(runner: &mut Runner) {
        if let Some(task) = runner.task.take() {
            task.abort();
            info!(target: "feepro", event = "connection_monitor_stopped");
        }
    }
}

/// Live interest in the connection state; dropping the last one stops polling.
pub struct MonitorSubscription {
    monitor: ConnectionMonitor,
    generation: u64,
    rx: watch::Receiver<ConnectionState>,
}

impl MonitorSubscription {
    pub fn current(&self) -> ConnectionState {
        self.rx.borrow().clone()
    }

    pub fn receiver(&mut self) -> &mut watch::Receiver<ConnectionState> {
        &mut self.rx
    }

    /// Waits until the published state satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&ConnectionState) -> bool,
    ) -> Option<ConnectionState> {
        self.rx.wait_for(predicate).await.ok().map(|state| (*state).clone())
    }
}

impl Drop for MonitorSubscription {
    fn drop(&mut self) {
        self.monitor.release(self.generation);
    }
}
