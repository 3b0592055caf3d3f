//! # hostvisor
//!
//! **Hostvisor** supervises the long-running worker units of a single embedded
//! host (camera capture, sensor sampling, detection, audio alerts), detects
//! failing units and escalates recovery from replacing one worker in-process
//! to restarting the whole host.
//!
//! ## Architecture
//! ```text
//!      services_list.json             settings.yaml
//!   ["sensors", "camera", ...]    (thresholds, paths, ...)
//!               │                          │
//!               ▼                          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - WorkerCatalog   (identifier → factory)                         │
//! │  - Registry        (name → instance + cumulative restart_count)   │
//! │  - RecoveryPolicy  (sick threshold, restart budget)               │
//! │  - HostRestart     (command / dry run)                            │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐
//!   │  Worker  │       │  Worker  │       │  Worker  │    one tokio task each,
//!   │ (sensors)│       │ (camera) │       │(detector)│    panics contained
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘
//!        │ volatile slots   │ frame queue      │
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SharedStore                                                      │
//! │  - VolatileState  (RAM only, reset every start)                   │
//! │  - FrameQueue     (bounded, drop-oldest)                          │
//! │  - PersistentState (system_state.json, fsync on every write)      │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Recovery
//! ```text
//! every check_interval:
//!   for worker in registration order:
//!     dead or sick? ─► restart_count += 1
//!       ├─ restart_count ≤ max_thread_restarts ─► soft recovery (replace instance)
//!       └─ restart_count >  max_thread_restarts ─► hard recovery:
//!            reboot_error_count += 1 (persisted) ─► stop_all ─► restart host
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Workers**       | Contract every supervised unit implements.               | [`Worker`], [`WorkerContext`]               |
//! | **Catalog**       | Static identifier → factory registry.                    | [`WorkerCatalog`]                           |
//! | **Supervision**   | Health checks, soft and hard recovery.                   | [`Supervisor`], [`RecoveryPolicy`]          |
//! | **Shared state**  | Volatile slots, frame queue, durable counters.           | [`SharedStore`], [`FrameQueue`]             |
//! | **Subscriber API**| Hook into lifecycle and recovery events.                 | [`Subscribe`], [`Event`]                    |
//! | **Configuration** | YAML settings, JSON worker list.                         | [`Settings`], [`ServiceList`]               |
//! | **Errors**        | Typed errors with stable labels.                         | [`WorkerError`], [`RuntimeError`]           |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use hostvisor::{DryRunRestart, RunOutcome, Settings, WorkerCatalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load("config/settings.yaml")?;
//!     let outcome = hostvisor::run(settings, WorkerCatalog::builtin(), Arc::new(DryRunRestart)).await?;
//!     assert!(matches!(outcome, RunOutcome::Shutdown | RunOutcome::HardRecovery));
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
pub mod logging;
mod policies;
mod store;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use config::{
    AudioSettings, CameraSettings, HardwareSettings, PathSettings, RebootMode, ServiceList,
    Settings, StoreSettings, SystemSettings,
};
pub use crate::core::{
    CommandRestart, DryRunRestart, HealthReport, HostRestart, RunOutcome, Supervisor,
    SupervisorBuilder, SupervisorConfig, restart_from_settings, run, run_until,
    wait_for_shutdown_signal,
};
pub use error::{ConfigError, RuntimeError, StoreError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{Diagnosis, RecoveryPolicy, Treatment};
pub use store::{
    Frame, FrameQueue, Metadata, PersistenceSettings, PersistentState, Resilience,
    STATE_SCHEMA_VERSION, ScientificMetrics, SharedStore, SystemInfo, VolatileState,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use workers::builtin;
pub use workers::{Worker, WorkerCatalog, WorkerContext, WorkerDeps, WorkerFactory, WorkerHandle};
