//! # LogWriter: renders runtime events through `tracing`.
//!
//! Supervisor decisions are logged at a level matching their severity:
//!
//! ```text
//! WARN  worker=camera errors=3 restart_count=1 worker is sick
//! INFO  worker=camera restart_count=1 soft recovery completed
//! ERROR worker=camera restart_count=4 reason="reboot_error_count=2 action=command" hard recovery triggered
//! ```
//!
//! Worker exits, failures and panics are already logged by the worker wrapper,
//! so their events are only rendered at `debug`.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WorkerStarted => {
                info!(worker, identifier = reason, "worker registered")
            }
            EventKind::WorkerStartFailed => {
                error!(worker, reason, "worker could not be started; continuing with the rest")
            }
            EventKind::WorkerStopRequested => debug!(worker, "stop requested"),
            EventKind::WorkerExited | EventKind::WorkerFailed | EventKind::WorkerPanicked => {
                debug!(worker, kind = ?e.kind, reason, "worker context ended")
            }
            EventKind::WorkerDead => {
                warn!(worker, restart_count = e.restart_count, reason, "worker is dead")
            }
            EventKind::WorkerSick => warn!(
                worker,
                errors = e.errors,
                restart_count = e.restart_count,
                "worker is sick"
            ),
            EventKind::SoftRecovered => {
                info!(worker, restart_count = e.restart_count, "soft recovery completed")
            }
            EventKind::RecoveryFailed => error!(
                worker,
                restart_count = e.restart_count,
                reason,
                "replacement could not be built; slot left vacant"
            ),
            EventKind::JoinTimedOut => {
                warn!(worker, "old instance did not exit in time; abandoned")
            }
            EventKind::HardRecoveryTriggered => error!(
                worker,
                restart_count = e.restart_count,
                reason,
                "hard recovery triggered"
            ),
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllStopped => info!("all workers stopped"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = worker, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = worker, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
