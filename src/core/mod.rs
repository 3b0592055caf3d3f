//! Runtime core: supervision and lifecycle.
//!
//! Public API from this module: [`Supervisor`], [`SupervisorBuilder`],
//! [`SupervisorConfig`], the [`HostRestart`] seam and the [`run`] loop.
//!
//! Internal modules:
//! - [`registry`]: ordered worker slots with cumulative restart counts;
//! - [`supervisor`]: start, health check, soft/hard recovery, stop;
//! - [`restart`]: host restart actions (command, dry run);
//! - [`runner`]: process run loop driving the health check;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod registry;
mod restart;
mod runner;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use restart::{CommandRestart, DryRunRestart, HostRestart, from_settings as restart_from_settings};
pub use runner::{RunOutcome, run, run_until};
pub use shutdown::wait_for_shutdown_signal;
pub use supervisor::{HealthReport, Supervisor};
