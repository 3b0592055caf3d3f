//! # Worker trait.
//!
//! A `Worker` has a stable [`name`](Worker::name) and an async
//! [`main_loop`](Worker::main_loop) that receives a [`WorkerContext`].
//!
//! The loop must:
//! 1. keep running while `!ctx.is_stopping()` and check it at bounded intervals;
//! 2. call `ctx.report_error()` after each failed unit of work;
//! 3. call `ctx.report_health()` after each successful one.
//!
//! The loop never needs its own catch-all: errors and panics escaping it are
//! contained by [`WorkerHandle`](crate::WorkerHandle) and end only this worker.

use async_trait::async_trait;

use crate::error::WorkerError;
use crate::workers::WorkerContext;

/// # Supervised unit of work.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use hostvisor::{Worker, WorkerContext, WorkerError};
///
/// struct Blinker;
///
/// #[async_trait]
/// impl Worker for Blinker {
///     fn name(&self) -> &str { "blinker" }
///
///     async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
///         while !ctx.is_stopping() {
///             // toggle a pin...
///             ctx.report_health();
///             ctx.sleep(Duration::from_millis(500)).await;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + 'static {
    /// Stable name; the supervisor's bookkeeping key.
    fn name(&self) -> &str;

    /// Unit-specific logic. Runs on its own task until it returns.
    async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError>;
}
