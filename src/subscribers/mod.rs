//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Supervisor / WorkerHandle ── publish(Event) ──► Bus ──► listener
//!                                                           │
//!                                                  SubscriberSet::emit
//!                                                  ┌────────┴────────┐
//!                                                  ▼                 ▼
//!                                              LogWriter          Custom
//! ```
//!
//! Custom subscribers (alerting, a status LED, a metrics exporter) are added
//! through [`SupervisorBuilder::with_subscribers`](crate::SupervisorBuilder::with_subscribers).

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
