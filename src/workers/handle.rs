//! # Running worker instance.
//!
//! [`WorkerHandle`] is what the supervisor keeps for every started worker: the
//! join handle of its task, its stop token and a read view of its error counter.
//!
//! ## Execution wrapper
//! ```text
//! start(worker)
//!   └─► tokio::spawn(async {
//!         AssertUnwindSafe(worker.main_loop(&ctx)).catch_unwind()
//!           ├─ Ok(Ok(()))          → WorkerExited    (info)
//!           ├─ Ok(Err(Canceled))   → WorkerExited    (info)
//!           ├─ Ok(Err(e))          → WorkerFailed    (error)
//!           └─ Err(panic)          → WorkerPanicked  (error)
//!       })
//! ```
//!
//! Whatever the outcome, the task ends normally: a fault in one worker never
//! reaches the supervisor or its siblings.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{WorkerError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::workers::{Worker, WorkerContext, WorkerDeps};

/// Supervisor-side handle to a started worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: Arc<str>,
    stop: CancellationToken,
    errors: Arc<AtomicU32>,
    join: Option<JoinHandle<()>>,
    bus: Bus,
}

impl WorkerHandle {
    /// Spawns `worker`'s main loop on its own task and returns immediately.
    ///
    /// The instance's stop token is a child of `parent`.
    pub fn start(
        mut worker: Box<dyn Worker>,
        deps: &WorkerDeps,
        bus: &Bus,
        parent: &CancellationToken,
    ) -> Self {
        let name: Arc<str> = Arc::from(worker.name());
        let stop = parent.child_token();
        let errors = Arc::new(AtomicU32::new(0));

        let ctx = WorkerContext::new(
            Arc::clone(&name),
            stop.clone(),
            Arc::clone(&errors),
            deps.clone(),
        );
        let task_bus = bus.clone();
        let task_name = Arc::clone(&name);

        let join = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(worker.main_loop(&ctx))
                .catch_unwind()
                .await;
            report_exit(&task_bus, &task_name, outcome);
        });

        info!(worker = %name, "worker started");
        Self {
            name,
            stop,
            errors,
            join: Some(join),
            bus: bus.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True until the worker's task has terminated (normal return or contained fault).
    pub fn is_alive(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Consecutive error count as last reported by the worker itself.
    pub fn consecutive_errors(&self) -> u32 {
        self.errors.load(Ordering::Acquire)
    }

    /// Requests cooperative termination.
    ///
    /// Idempotent: returns `true` only for the call that actually signalled.
    pub fn stop(&self) -> bool {
        if self.stop.is_cancelled() {
            return false;
        }
        self.stop.cancel();
        self.bus
            .publish(Event::new(EventKind::WorkerStopRequested).with_worker(Arc::clone(&self.name)));
        true
    }

    /// True once [`stop`](Self::stop) (or the parent token) has fired.
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Waits for the worker's task to end. Returns at once if it was already awaited.
    pub async fn wait(&mut self) {
        if let Some(join) = self.join.take() {
            // The body never unwinds out of the wrapper; a JoinError means abort/runtime teardown.
            let _ = join.await;
        }
    }

    /// Waits at most `timeout` for the task to end.
    ///
    /// Returns `false` when the worker is still running after `timeout`; the
    /// task keeps running detached and the handle can be waited on again.
    pub async fn join_timeout(&mut self, timeout: Duration) -> bool {
        let Some(join) = self.join.as_mut() else {
            return true;
        };
        match tokio::time::timeout(timeout, join).await {
            Ok(_) => {
                self.join = None;
                true
            }
            Err(_elapsed) => false,
        }
    }
}

fn report_exit(
    bus: &Bus,
    name: &Arc<str>,
    outcome: Result<Result<(), WorkerError>, Box<dyn std::any::Any + Send>>,
) {
    match outcome {
        Ok(Ok(())) | Ok(Err(WorkerError::Canceled)) => {
            info!(worker = %name, "worker exited");
            bus.publish(Event::new(EventKind::WorkerExited).with_worker(Arc::clone(name)));
        }
        Ok(Err(e)) => {
            error!(worker = %name, error = %e, label = e.as_label(), "worker main loop failed");
            bus.publish(
                Event::new(EventKind::WorkerFailed)
                    .with_worker(Arc::clone(name))
                    .with_reason(e.to_string()),
            );
        }
        Err(payload) => {
            let msg = panic_message(&*payload);
            error!(worker = %name, panic = %msg, "worker panicked; execution context terminated");
            bus.publish(
                Event::new(EventKind::WorkerPanicked)
                    .with_worker(Arc::clone(name))
                    .with_reason(msg),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::workers::context::tests::deps_in;

    struct Scripted {
        outcome: &'static str,
    }

    #[async_trait]
    impl Worker for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
            match self.outcome {
                "panic" => panic!("sensor bus exploded"),
                "fail" => Err(WorkerError::fail("device missing")),
                _ => {
                    while !ctx.is_stopping() {
                        ctx.report_error();
                        ctx.sleep(Duration::from_millis(5)).await;
                    }
                    Ok(())
                }
            }
        }
    }

    fn start(outcome: &'static str, bus: &Bus, dir: &std::path::Path) -> WorkerHandle {
        WorkerHandle::start(
            Box::new(Scripted { outcome }),
            &deps_in(dir),
            bus,
            &CancellationToken::new(),
        )
    }

    async fn next_kind(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> EventKind {
        loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind != EventKind::WorkerStopRequested {
                return ev.kind;
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panic_is_contained_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        let mut h = start("panic", &bus, dir.path());
        assert!(h.join_timeout(Duration::from_secs(2)).await);
        assert!(!h.is_alive());
        assert_eq!(next_kind(&mut rx).await, EventKind::WorkerPanicked);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn error_return_ends_only_this_worker() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        let mut failing = start("fail", &bus, dir.path());
        let mut sibling = start("loop", &bus, dir.path());

        assert!(failing.join_timeout(Duration::from_secs(2)).await);
        assert_eq!(next_kind(&mut rx).await, EventKind::WorkerFailed);
        assert!(sibling.is_alive());

        assert!(sibling.stop());
        assert!(sibling.join_timeout(Duration::from_secs(2)).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_is_idempotent_and_errors_are_visible() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Bus::new(16);
        let mut h = start("loop", &bus, dir.path());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.consecutive_errors() > 0);
        assert!(h.is_alive());

        assert!(h.stop());
        assert!(!h.stop());
        assert!(h.is_stopping());
        h.wait().await;
        assert!(!h.is_alive());
        h.wait().await;
    }
}
