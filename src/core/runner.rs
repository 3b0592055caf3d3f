//! # Process run loop.
//!
//! Wires settings, store and supervisor together and drives the periodic
//! health check until the process is told to stop or hard recovery fires.
//!
//! ```text
//! run(settings, catalog, restart)
//!   ├─► SharedStore::open(state_file) + mark_boot()
//!   ├─► ServiceList::load(services_list)
//!   ├─► Supervisor::start_all(services)
//!   └─► loop {
//!         select! {
//!           shutdown signal ─► ShutdownRequested ─► stop_all ─► Shutdown
//!           interval tick   ─► check_health ─► hard_recovery? ─► HardRecovery
//!         }
//!       }
//!       add_uptime_hours(elapsed) ─► supervisor.shutdown()
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use super::{builder::SupervisorBuilder, config::SupervisorConfig, restart::HostRestart, shutdown};
use crate::config::{ServiceList, Settings};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::store::SharedStore;
use crate::workers::{WorkerCatalog, WorkerDeps};

/// Why [`run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// A shutdown signal arrived and every worker stopped.
    Shutdown,
    /// Hard recovery fired and the host restart was issued.
    HardRecovery,
}

/// Runs the supervisor until an OS shutdown signal or hard recovery.
pub async fn run(
    settings: Settings,
    catalog: WorkerCatalog,
    restart: Arc<dyn HostRestart>,
) -> Result<RunOutcome, RuntimeError> {
    run_until(settings, catalog, restart, shutdown::wait_for_shutdown_signal()).await
}

/// Like [`run`], with the shutdown trigger supplied by the caller.
pub async fn run_until<F>(
    settings: Settings,
    catalog: WorkerCatalog,
    restart: Arc<dyn HostRestart>,
    shutdown_signal: F,
) -> Result<RunOutcome, RuntimeError>
where
    F: Future<Output = std::io::Result<()>>,
{
    settings.validate()?;
    let settings = Arc::new(settings);
    let started_at = Instant::now();

    let store = Arc::new(SharedStore::open(
        &settings.paths.state_file,
        settings.store.frame_queue_capacity,
    ));
    store.mark_boot();
    info!(
        reboot_error_count = store.get_resilience(|r| r.reboot_error_count),
        total_system_restarts = store.get_metric(|m| m.total_system_restarts),
        "system boot"
    );

    let services = ServiceList::load(&settings.paths.services_list);
    let cfg = SupervisorConfig::from_settings(&settings);
    let check_interval = cfg.check_interval;

    let supervisor = SupervisorBuilder::new(cfg, WorkerDeps::new(Arc::clone(&store), settings))
        .with_catalog(catalog)
        .with_restart(restart)
        .build();

    let started = supervisor.start_all(&services.services).await;
    info!(started, requested = services.services.len(), "workers started");

    let mut tick = tokio::time::interval_at(Instant::now() + check_interval, check_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown_signal);

    let outcome = loop {
        tokio::select! {
            res = &mut shutdown_signal => {
                if let Err(e) = res {
                    supervisor.shutdown().await;
                    return Err(RuntimeError::Signal(e));
                }
                supervisor.bus().publish(Event::new(EventKind::ShutdownRequested));
                supervisor.stop_all().await;
                break RunOutcome::Shutdown;
            }
            _ = tick.tick() => {
                if supervisor.check_health().await.hard_recovery {
                    break RunOutcome::HardRecovery;
                }
            }
        }
    };

    store.add_uptime_hours(started_at.elapsed().as_secs_f64() / 3600.0);
    supervisor.shutdown().await;
    info!(?outcome, "supervisor finished");
    Ok(outcome)
}
