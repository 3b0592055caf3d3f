//! # Worker contract and worker plumbing.
//!
//! This module provides the worker-related types:
//! - [`Worker`] - trait every supervised unit implements (`main_loop`)
//! - [`WorkerContext`] - what a running loop sees: stop flag, health reporting, store
//! - [`WorkerDeps`] - dependencies injected into every instance (store + settings)
//! - [`WorkerHandle`] - supervisor-side view: `stop`, `is_alive`, error count, join
//! - [`WorkerCatalog`] - identifier → factory registry used to (re)build workers
//! - [`builtin`] - simulated camera / sensors / detector / audio / demo units
//!
//! ## Lifecycle
//! ```text
//! WorkerCatalog::instantiate(id, deps) ──► Box<dyn Worker>
//!        └─► WorkerHandle::start(worker, deps, bus, parent_token)
//!               └─► tokio::spawn( catch_unwind( worker.main_loop(&ctx) ) )
//!
//! main_loop:  while !ctx.is_stopping() {
//!                 do one unit of work
//!                 ok  → ctx.report_health()   (errors = 0)
//!                 err → ctx.report_error()    (errors += 1)
//!             }
//! ```

pub mod builtin;
mod catalog;
pub(crate) mod context;
mod handle;
mod worker;

pub use catalog::{WorkerCatalog, WorkerFactory};
pub use context::{WorkerContext, WorkerDeps};
pub use handle::WorkerHandle;
pub use worker::Worker;
