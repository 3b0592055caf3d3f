//! # Per-instance worker context.
//!
//! [`WorkerContext`] is handed to [`Worker::main_loop`](crate::Worker::main_loop).
//! It owns the instance's stop flag and its consecutive error counter, and
//! exposes the injected [`WorkerDeps`].
//!
//! ## Rules
//! - Only the worker's own loop reports errors/health; the supervisor only reads
//!   the counter through [`WorkerHandle`](crate::WorkerHandle).
//! - The stop flag is a child [`CancellationToken`]; cancelling the runtime
//!   token stops every worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::store::SharedStore;

/// Dependencies injected into every worker instance.
#[derive(Clone, Debug)]
pub struct WorkerDeps {
    pub store: Arc<SharedStore>,
    pub settings: Arc<Settings>,
}

impl WorkerDeps {
    pub fn new(store: Arc<SharedStore>, settings: Arc<Settings>) -> Self {
        Self { store, settings }
    }
}

/// View of the running instance from inside its own loop.
#[derive(Debug)]
pub struct WorkerContext {
    name: Arc<str>,
    stop: CancellationToken,
    errors: Arc<AtomicU32>,
    deps: WorkerDeps,
}

impl WorkerContext {
    pub(crate) fn new(
        name: Arc<str>,
        stop: CancellationToken,
        errors: Arc<AtomicU32>,
        deps: WorkerDeps,
    ) -> Self {
        Self {
            name,
            stop,
            errors,
            deps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once a stop was requested; the loop should return at this check point.
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Completes when a stop is requested.
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }

    /// Sleeps for `dur`, waking early on stop. Returns `false` if woken by stop.
    pub async fn sleep(&self, dur: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(dur) => true,
            _ = self.stop.cancelled() => false,
        }
    }

    /// Marks the current unit of work as failed (`errors += 1`).
    pub fn report_error(&self) {
        let _ = self
            .errors
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(1))
            });
    }

    /// Marks the current unit of work as successful (`errors = 0`).
    pub fn report_health(&self) {
        self.errors.store(0, Ordering::Release);
    }

    /// Current consecutive error count.
    pub fn consecutive_errors(&self) -> u32 {
        self.errors.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &Arc<SharedStore> {
        &self.deps.store
    }

    pub fn settings(&self) -> &Settings {
        &self.deps.settings
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn deps_in(dir: &std::path::Path) -> WorkerDeps {
        let store = SharedStore::open(dir.join("state.json"), 8);
        WorkerDeps::new(Arc::new(store), Arc::new(Settings::default()))
    }

    fn context(dir: &std::path::Path) -> WorkerContext {
        WorkerContext::new(
            Arc::from("test"),
            CancellationToken::new(),
            Arc::new(AtomicU32::new(0)),
            deps_in(dir),
        )
    }

    #[test]
    fn health_resets_any_error_count() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        for _ in 0..5 {
            ctx.report_error();
        }
        assert_eq!(ctx.consecutive_errors(), 5);
        ctx.report_health();
        assert_eq!(ctx.consecutive_errors(), 0);

        ctx.report_health();
        assert_eq!(ctx.consecutive_errors(), 0);
    }

    #[test]
    fn error_count_saturates() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.errors.store(u32::MAX, Ordering::Release);
        ctx.report_error();
        assert_eq!(ctx.consecutive_errors(), u32::MAX);
    }

    #[tokio::test]
    async fn sleep_wakes_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.stop.cancel();
        assert!(!ctx.sleep(Duration::from_secs(30)).await);
        assert!(ctx.is_stopping());
    }
}
