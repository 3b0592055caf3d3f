//! # Recovery policy: diagnosis and escalation.
//!
//! [`RecoveryPolicy`] turns what the supervisor observes about one worker slot
//! into a [`Diagnosis`], and a failure count into a [`Treatment`].
//!
//! ```text
//! slot ──► diagnose() ──► Healthy
//!                    ├─► Vacant            (replacement never got built)
//!                    ├─► Dead              (execution context ended)
//!                    └─► Sick { errors }   (alive, errors ≥ threshold)
//!
//! restart_count (after increment) ──► treatment()
//!                    ├─► Soft   (restart_count ≤ max_restarts)
//!                    └─► Hard   (restart_count >  max_restarts)
//! ```
//!
//! Death is checked before sickness: a finished worker is dead whatever its
//! last error count was.

use crate::config::SystemSettings;

/// Thresholds driving escalation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Consecutive errors at which a live worker counts as sick.
    pub sickness_threshold: u32,
    /// Soft recoveries allowed per worker before hard recovery.
    pub max_restarts: u32,
}

/// Health verdict for one slot on one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnosis {
    Healthy,
    /// Slot has no instance (a previous replacement failed to build).
    Vacant,
    Dead,
    Sick { errors: u32 },
}

impl Diagnosis {
    pub fn needs_recovery(&self) -> bool {
        !matches!(self, Diagnosis::Healthy)
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Diagnosis::Healthy => "healthy",
            Diagnosis::Vacant => "vacant",
            Diagnosis::Dead => "dead",
            Diagnosis::Sick { .. } => "sick",
        }
    }
}

/// What to do with a broken worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Treatment {
    /// Replace the instance in-process.
    Soft,
    /// Restart budget exhausted: restart the host.
    Hard,
}

impl RecoveryPolicy {
    pub fn new(sickness_threshold: u32, max_restarts: u32) -> Self {
        Self {
            sickness_threshold: sickness_threshold.max(1),
            max_restarts,
        }
    }

    pub fn from_settings(system: &SystemSettings) -> Self {
        Self::new(system.sickness_threshold, system.max_thread_restarts)
    }

    /// Classifies a slot. `observed` is `None` for a vacant slot, otherwise
    /// `(is_alive, consecutive_errors)`.
    pub fn diagnose(&self, observed: Option<(bool, u32)>) -> Diagnosis {
        match observed {
            None => Diagnosis::Vacant,
            Some((false, _)) => Diagnosis::Dead,
            Some((true, errors)) if errors >= self.sickness_threshold => Diagnosis::Sick { errors },
            Some((true, _)) => Diagnosis::Healthy,
        }
    }

    /// Chooses the treatment for a worker whose `restart_count` was just incremented.
    pub fn treatment(&self, restart_count: u32) -> Treatment {
        if restart_count > self.max_restarts {
            Treatment::Hard
        } else {
            Treatment::Soft
        }
    }
}

impl Default for RecoveryPolicy {
    /// Three consecutive errors make a worker sick; three soft recoveries are allowed.
    fn default() -> Self {
        Self::new(3, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_wins_over_error_count() {
        let p = RecoveryPolicy::default();
        assert_eq!(p.diagnose(Some((false, 0))), Diagnosis::Dead);
        assert_eq!(p.diagnose(Some((false, 10))), Diagnosis::Dead);
        assert_eq!(p.diagnose(None), Diagnosis::Vacant);
    }

    #[test]
    fn sickness_starts_at_threshold() {
        let p = RecoveryPolicy::new(3, 3);
        assert_eq!(p.diagnose(Some((true, 2))), Diagnosis::Healthy);
        assert_eq!(p.diagnose(Some((true, 3))), Diagnosis::Sick { errors: 3 });
        assert!(!p.diagnose(Some((true, 0))).needs_recovery());
    }

    #[test]
    fn hard_only_when_budget_exceeded() {
        let p = RecoveryPolicy::new(3, 2);
        assert_eq!(p.treatment(1), Treatment::Soft);
        assert_eq!(p.treatment(2), Treatment::Soft);
        assert_eq!(p.treatment(3), Treatment::Hard);

        let strict = RecoveryPolicy::new(3, 0);
        assert_eq!(strict.treatment(1), Treatment::Hard);
    }

    #[test]
    fn zero_threshold_is_clamped() {
        assert_eq!(RecoveryPolicy::new(0, 1).sickness_threshold, 1);
    }
}
