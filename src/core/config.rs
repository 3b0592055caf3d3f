//! # Supervisor runtime configuration.
//!
//! [`SupervisorConfig`] is the slice of [`Settings`](crate::Settings) the
//! supervisor itself consumes. Everything else in the settings file belongs to
//! individual workers.
//!
//! ## Sentinel values
//! - `join_timeout = 0s` → do not wait for a replaced worker at all
//! - `reboot_delay = 0s` → issue the host restart right after stopping workers

use std::time::Duration;

use crate::config::Settings;
use crate::policies::RecoveryPolicy;

/// Configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `policy`: sickness threshold and restart budget
/// - `join_timeout`: how long soft recovery waits for the old instance to exit
/// - `reboot_delay`: pause between `stop_all` and the host restart during hard recovery
/// - `check_interval`: cadence of `check_health` in the run loop
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    pub policy: RecoveryPolicy,

    /// Upper bound on waiting for a replaced instance to finish.
    ///
    /// A worker that does not exit in time is abandoned: its task keeps running
    /// detached until it next checks its stop flag.
    pub join_timeout: Duration,

    pub reboot_delay: Duration,

    pub check_interval: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Subscribers lagging more than `bus_capacity` events skip older ones.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Derives the supervisor configuration from the `system` settings section.
    pub fn from_settings(settings: &Settings) -> Self {
        let system = &settings.system;
        Self {
            policy: RecoveryPolicy::from_settings(system),
            join_timeout: system.join_timeout(),
            reboot_delay: system.reboot_delay(),
            check_interval: system.check_interval(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Defaults matching an empty settings file:
    ///
    /// - `policy = RecoveryPolicy::default()` (sick at 3 errors, 3 soft recoveries)
    /// - `join_timeout = 2s`
    /// - `reboot_delay = 1s`
    /// - `check_interval = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            policy: RecoveryPolicy::default(),
            join_timeout: Duration::from_secs(2),
            reboot_delay: Duration::from_secs(1),
            check_interval: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_default_settings() {
        let derived = SupervisorConfig::from_settings(&Settings::default());
        let default = SupervisorConfig::default();
        assert_eq!(derived.policy, default.policy);
        assert_eq!(derived.join_timeout, default.join_timeout);
        assert_eq!(derived.reboot_delay, default.reboot_delay);
        assert_eq!(derived.check_interval, default.check_interval);
    }

    #[test]
    fn system_section_drives_the_policy() {
        let mut settings = Settings::default();
        settings.system.max_thread_restarts = 2;
        settings.system.sickness_threshold = 5;
        settings.system.join_timeout_ms = 10;

        let cfg = SupervisorConfig::from_settings(&settings);
        assert_eq!(cfg.policy, RecoveryPolicy::new(5, 2));
        assert_eq!(cfg.join_timeout, Duration::from_millis(10));
    }
}
