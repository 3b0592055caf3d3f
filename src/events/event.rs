//! # Runtime events emitted by the supervisor and worker wrappers.
//!
//! The [`EventKind`] enum classifies event types across four groups:
//! - **Worker lifecycle**: started, exited, failed, panicked
//! - **Diagnosis**: dead, sick
//! - **Recovery**: soft recovery done/failed, hard recovery triggered
//! - **Shutdown / subscribers**: shutdown requested, all stopped, overflow, panic
//!
//! The [`Event`] struct carries the worker name, a reason and the counters the
//! supervisor based its decision on.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use hostvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerSick)
//!     .with_worker("camera")
//!     .with_errors(3)
//!     .with_restart_count(1);
//!
//! assert_eq!(ev.kind, EventKind::WorkerSick);
//! assert_eq!(ev.worker.as_deref(), Some("camera"));
//! assert_eq!(ev.errors, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `worker` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `worker` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,

    // === Worker lifecycle ===
    /// Worker instance was constructed and its execution context spawned.
    ///
    /// Sets: `worker`, `reason` (identifier).
    WorkerStarted,

    /// Constructing or starting a worker from the service list failed.
    ///
    /// Sets: `worker` (identifier), `reason`.
    WorkerStartFailed,

    /// Worker main loop returned normally (usually after a stop request).
    ///
    /// Sets: `worker`.
    WorkerExited,

    /// Worker main loop returned an error; its context has ended.
    ///
    /// Sets: `worker`, `reason`.
    WorkerFailed,

    /// Worker main loop panicked; the panic was contained.
    ///
    /// Sets: `worker`, `reason` (panic message).
    WorkerPanicked,

    /// Stop was signalled to a worker.
    ///
    /// Sets: `worker`.
    WorkerStopRequested,

    // === Diagnosis ===
    /// Health check found a worker whose context has terminated (or a vacant slot).
    ///
    /// Sets: `worker`, `restart_count` (after increment).
    WorkerDead,

    /// Health check found a live worker at or above the sickness threshold.
    ///
    /// Sets: `worker`, `errors`, `restart_count` (after increment).
    WorkerSick,

    // === Recovery ===
    /// Broken instance replaced by a fresh one.
    ///
    /// Sets: `worker`, `restart_count`.
    SoftRecovered,

    /// Replacement could not be built; slot left vacant until next tick.
    ///
    /// Sets: `worker`, `restart_count`, `reason`.
    RecoveryFailed,

    /// Old instance did not exit within the join timeout and was abandoned.
    ///
    /// Sets: `worker`.
    JoinTimedOut,

    /// Restart budget exceeded; counters persisted and host restart issued.
    ///
    /// Sets: `worker`, `restart_count`, `reason` (restart action).
    HardRecoveryTriggered,

    // === Shutdown ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// Every registered worker has exited after `stop_all`.
    AllStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker (or subscriber) name, if applicable.
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (errors, identifiers, overflow details).
    pub reason: Option<Arc<str>>,
    /// Cumulative failure count of the worker slot.
    pub restart_count: Option<u32>,
    /// Consecutive error count observed at diagnosis time.
    pub errors: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            reason: None,
            restart_count: None,
            errors: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_restart_count(mut self, n: u32) -> Self {
        self.restart_count = Some(n);
        self
    }

    #[inline]
    pub fn with_errors(mut self, n: u32) -> Self {
        self.errors = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }
}
