//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the supervisor and the
//! worker execution wrappers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (start, diagnosis, recovery, shutdown),
//!   `WorkerHandle` wrappers (exit, failure, panic), `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the supervisor's listener, which fans out to the
//!   `SubscriberSet` (the built-in `LogWriter` renders them through `tracing`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
