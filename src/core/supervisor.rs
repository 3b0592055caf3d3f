//! # Supervisor: owns the worker registry and decides recovery.
//!
//! The [`Supervisor`] starts workers from catalog identifiers, runs the
//! periodic health check, replaces broken workers in place (soft recovery)
//! and escalates to a host restart when one worker keeps failing (hard
//! recovery). It is the only component with escalation authority.
//!
//! ## Health check
//! ```text
//! check_health()                                   (registration order)
//!   for slot in registry:
//!     diagnose(slot) ──► Healthy ──► next slot
//!                   └──► Dead | Sick | Vacant
//!                          restart_count += 1
//!                          ├─ restart_count ≤ max ──► soft recovery
//!                          │     stop old ─► join (≤ join_timeout) ─► build new ─► start
//!                          │     build failed ─► slot stays vacant (retried next tick)
//!                          └─ restart_count > max ──► hard recovery, stop examining
//!
//! hard recovery (once per process):
//!   persist reboot_error_count += 1, total_system_restarts += 1
//!   ─► stop every worker (each wait ≤ join_timeout) ─► sleep(reboot_delay)
//!   ─► HostRestart::restart_host()
//! ```
//!
//! ## Event flow
//! ```text
//! Supervisor / WorkerHandle ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                                     ├─► LogWriter
//!                                                                     └─► ...
//! ```
//!
//! ## Rules
//! - Worker faults never reach the supervisor as errors; it only sees
//!   liveness and error counts.
//! - `restart_count` is cumulative and never reset by soft recovery.
//! - Once hard recovery fires the supervisor is latched: further checks do nothing.
//! - After `stop_all` the supervisor no longer recovers anything.
//! - Recovery never waits longer than `join_timeout` per worker; only `stop_all`
//!   waits without a limit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::config::SupervisorConfig;
use crate::core::registry::{Registry, Slot};
use crate::core::restart::HostRestart;
use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{Diagnosis, Treatment};
use crate::workers::{Worker, WorkerCatalog, WorkerDeps, WorkerHandle};

/// Outcome of one [`Supervisor::check_health`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HealthReport {
    /// Slots inspected before the pass ended.
    pub examined: usize,
    /// Broken workers replaced by a running instance.
    pub soft_recovered: usize,
    /// Broken workers whose replacement could not be built.
    pub failed_recoveries: usize,
    /// True when this pass triggered hard recovery.
    pub hard_recovery: bool,
}

/// Coordinates worker lifecycle, health checks and recovery.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    catalog: WorkerCatalog,
    deps: WorkerDeps,
    restart: Arc<dyn HostRestart>,
    registry: Mutex<Registry>,
    runtime_token: CancellationToken,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
    hard_recovery: AtomicBool,
    stopping: AtomicBool,
}

impl Supervisor {
    /// Internal constructor used by [`SupervisorBuilder`](crate::SupervisorBuilder).
    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        catalog: WorkerCatalog,
        deps: WorkerDeps,
        restart: Arc<dyn HostRestart>,
        runtime_token: CancellationToken,
        listener: JoinHandle<()>,
    ) -> Self {
        Self {
            cfg,
            bus,
            catalog,
            deps,
            restart,
            registry: Mutex::new(Registry::new()),
            runtime_token,
            listener: std::sync::Mutex::new(Some(listener)),
            hard_recovery: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
        }
    }

    /// Builds and starts one worker per identifier, in order.
    ///
    /// A worker that cannot be built, or whose name is already registered, is
    /// reported and skipped; the rest still start. Returns how many started.
    pub async fn start_all<S: AsRef<str>>(&self, identifiers: &[S]) -> usize {
        let mut reg = self.registry.lock().await;
        let mut started = 0;

        for id in identifiers.iter().map(AsRef::as_ref) {
            if self.is_stopping() {
                break;
            }
            let worker = match self.catalog.instantiate(id, &self.deps) {
                Ok(w) => w,
                Err(e) => {
                    self.bus.publish(
                        Event::new(EventKind::WorkerStartFailed)
                            .with_worker(id)
                            .with_reason(e.to_string()),
                    );
                    continue;
                }
            };

            // Refuse duplicates before the loop ever runs.
            if reg.contains(worker.name()) {
                self.bus.publish(
                    Event::new(EventKind::WorkerStartFailed)
                        .with_worker(id)
                        .with_reason(format!(
                            "worker name '{}' is already registered",
                            worker.name()
                        )),
                );
                continue;
            }

            let handle = self.launch(worker);
            let name: Arc<str> = Arc::from(handle.name());
            match reg.insert(id, handle) {
                Ok(()) => {
                    started += 1;
                    self.bus.publish(
                        Event::new(EventKind::WorkerStarted)
                            .with_worker(name)
                            .with_reason(id),
                    );
                }
                Err(rejected) => {
                    rejected.stop();
                }
            }
        }
        started
    }

    /// Runs one health-check pass over every registered worker.
    pub async fn check_health(&self) -> HealthReport {
        let mut report = HealthReport::default();
        if self.is_hard_recovery_triggered() || self.is_stopping() {
            return report;
        }

        let mut reg = self.registry.lock().await;
        let mut escalate: Option<(Arc<str>, u32)> = None;

        for slot in reg.slots_mut() {
            report.examined += 1;

            let diagnosis = self.cfg.policy.diagnose(slot.observe());
            if !diagnosis.needs_recovery() {
                continue;
            }

            let restart_count = slot.record_failure();
            self.publish_diagnosis(slot, diagnosis);

            match self.cfg.policy.treatment(restart_count) {
                Treatment::Hard => {
                    escalate = Some((Arc::clone(&slot.name), restart_count));
                    break;
                }
                Treatment::Soft => {
                    if self.soft_recover(slot).await {
                        report.soft_recovered += 1;
                    } else {
                        report.failed_recoveries += 1;
                    }
                }
            }
        }

        if let Some((name, restart_count)) = escalate {
            report.hard_recovery = self.hard_recover(&mut reg, name, restart_count).await;
        }
        report
    }

    /// Signals every worker to stop, then waits for each to finish.
    ///
    /// Idempotent: a worker already signalled is not signalled again. There is
    /// no timeout; a worker that never checks its stop flag blocks this call.
    pub async fn stop_all(&self) {
        self.stopping.store(true, Ordering::Release);
        let mut reg = self.registry.lock().await;
        self.stop_locked(&mut reg).await;
    }

    /// Stops all workers, then drains and closes the subscriber pipeline.
    ///
    /// After hard recovery the workers were already stopped with a bounded
    /// wait; stragglers are not waited for again.
    pub async fn shutdown(&self) {
        if !self.is_hard_recovery_triggered() {
            self.stop_all().await;
        }
        self.runtime_token.cancel();

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }

    /// Event bus shared with every worker wrapper.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    pub fn is_hard_recovery_triggered(&self) -> bool {
        self.hard_recovery.load(Ordering::Acquire)
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Registered worker names in registration order.
    pub async fn names(&self) -> Vec<String> {
        self.registry.lock().await.names()
    }

    /// Cumulative failure count of `name`.
    pub async fn restart_count(&self, name: &str) -> Option<u32> {
        self.registry.lock().await.get(name).map(|s| s.restart_count)
    }

    /// Liveness of `name`'s current instance; `Some(false)` for a vacant slot.
    pub async fn is_alive(&self, name: &str) -> Option<bool> {
        let reg = self.registry.lock().await;
        reg.get(name)
            .map(|s| s.instance.as_ref().is_some_and(WorkerHandle::is_alive))
    }

    /// Consecutive error count of `name`'s current instance.
    pub async fn consecutive_errors(&self, name: &str) -> Option<u32> {
        let reg = self.registry.lock().await;
        reg.get(name)
            .and_then(|s| s.instance.as_ref())
            .map(WorkerHandle::consecutive_errors)
    }

    // ---------------------------
    // Internals
    // ---------------------------

    fn spawn(&self, identifier: &str) -> Result<WorkerHandle, WorkerError> {
        let worker = self.catalog.instantiate(identifier, &self.deps)?;
        Ok(self.launch(worker))
    }

    fn launch(&self, worker: Box<dyn Worker>) -> WorkerHandle {
        WorkerHandle::start(worker, &self.deps, &self.bus, &self.runtime_token)
    }

    /// Replaces the slot's instance. Returns `false` if no replacement runs.
    async fn soft_recover(&self, slot: &mut Slot) -> bool {
        if let Some(mut old) = slot.instance.take() {
            old.stop();
            if !old.join_timeout(self.cfg.join_timeout).await {
                self.bus.publish(
                    Event::new(EventKind::JoinTimedOut).with_worker(Arc::clone(&slot.name)),
                );
            }
        }

        match self.spawn(&slot.identifier) {
            Ok(handle) => {
                slot.instance = Some(handle);
                self.bus.publish(
                    Event::new(EventKind::SoftRecovered)
                        .with_worker(Arc::clone(&slot.name))
                        .with_restart_count(slot.restart_count),
                );
                true
            }
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::RecoveryFailed)
                        .with_worker(Arc::clone(&slot.name))
                        .with_restart_count(slot.restart_count)
                        .with_reason(e.to_string()),
                );
                false
            }
        }
    }

    /// Persists the failure counters, stops everything and restarts the host.
    ///
    /// Returns `false` if another pass already latched hard recovery.
    async fn hard_recover(&self, reg: &mut Registry, name: Arc<str>, restart_count: u32) -> bool {
        if self
            .hard_recovery
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let store = &self.deps.store;
        let reboots = store.set_resilience(|r| {
            r.reboot_error_count += 1;
            r.reboot_error_count
        });
        store.set_metric(|m| m.total_system_restarts += 1);

        self.bus.publish(
            Event::new(EventKind::HardRecoveryTriggered)
                .with_worker(name)
                .with_restart_count(restart_count)
                .with_reason(format!(
                    "reboot_error_count={reboots} action={}",
                    self.restart.name()
                )),
        );

        self.stopping.store(true, Ordering::Release);
        self.stop_bounded(reg).await;
        tokio::time::sleep(self.cfg.reboot_delay).await;
        self.restart.restart_host().await;
        true
    }

    /// Like [`stop_locked`](Self::stop_locked), but each wait is capped by
    /// `join_timeout`. A worker that ignores its stop flag is abandoned so the
    /// host restart still goes out.
    async fn stop_bounded(&self, reg: &mut Registry) {
        for handle in reg.instances_mut() {
            handle.stop();
        }
        let mut abandoned = 0usize;
        for handle in reg.instances_mut() {
            if !handle.join_timeout(self.cfg.join_timeout).await {
                abandoned += 1;
                self.bus.publish(
                    Event::new(EventKind::JoinTimedOut).with_worker(handle.name().to_string()),
                );
            }
        }
        if abandoned == 0 {
            self.bus.publish(Event::new(EventKind::AllStopped));
        } else {
            warn!(abandoned, "restarting host with workers still running");
        }
    }

    /// Two passes: signal every instance, then wait for every instance.
    async fn stop_locked(&self, reg: &mut Registry) {
        for handle in reg.instances_mut() {
            handle.stop();
        }
        for handle in reg.instances_mut() {
            handle.wait().await;
        }
        self.bus.publish(Event::new(EventKind::AllStopped));
    }

    fn publish_diagnosis(&self, slot: &Slot, diagnosis: Diagnosis) {
        let event = match diagnosis {
            Diagnosis::Sick { errors } => Event::new(EventKind::WorkerSick).with_errors(errors),
            Diagnosis::Vacant => Event::new(EventKind::WorkerDead).with_reason("no running instance"),
            _ => Event::new(EventKind::WorkerDead),
        };
        self.bus.publish(
            event
                .with_worker(Arc::clone(&slot.name))
                .with_restart_count(slot.restart_count),
        );
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("cfg", &self.cfg)
            .field("catalog", &self.catalog)
            .field("restart", &self.restart.name())
            .field("hard_recovery", &self.is_hard_recovery_triggered())
            .field("stopping", &self.is_stopping())
            .finish_non_exhaustive()
    }
}
