//! Recovery policy.
//!
//! This module groups the knobs that decide **whether** a worker is broken
//! and **how hard** the supervisor reacts.
//!
//! ## Contents
//! - [`RecoveryPolicy`] sickness threshold + restart budget
//! - [`Diagnosis`] healthy / vacant / dead / sick
//! - [`Treatment`] soft (replace worker) or hard (restart host)
//!
//! ## Quick wiring
//! ```text
//! Settings.system ──► RecoveryPolicy::from_settings
//!      └─► Supervisor::check_health uses:
//!           - diagnose((is_alive, errors)) per slot, in registration order
//!           - treatment(restart_count) after incrementing the slot's count
//! ```

mod recovery;

pub use recovery::{Diagnosis, RecoveryPolicy, Treatment};
