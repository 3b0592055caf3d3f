//! # Process settings and the worker list.
//!
//! Two documents configure a hostvisor process:
//!
//! - [`Settings`]: YAML settings file (`config/settings.yaml` by default).
//!   Failing to load it is the only fatal startup error.
//! - [`ServiceList`]: JSON document `{"services": ["camera", ...]}` naming the
//!   workers to start, in order. A broken list degrades to "no workers".
//!
//! Every section is `#[serde(default)]`, so a settings file only needs the keys
//! it wants to override.
//!
//! # Example
//! ```
//! use hostvisor::Settings;
//!
//! let settings = Settings::from_yaml_str("system:\n  max_thread_restarts: 2\n").unwrap();
//! assert_eq!(settings.system.max_thread_restarts, 2);
//! assert_eq!(settings.system.sickness_threshold, 3);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ConfigError;

/// Root settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub system: SystemSettings,
    pub paths: PathSettings,
    pub store: StoreSettings,
    pub hardware: HardwareSettings,
    pub camera: CameraSettings,
    pub audio: AudioSettings,
}

/// How hard recovery restarts the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebootMode {
    /// Run `system.reboot_command`.
    #[default]
    Command,
    /// Log the reboot and do nothing (no restart privileges, development hosts).
    DryRun,
}

/// Supervision knobs (`system:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Soft recoveries allowed per worker before hard recovery.
    pub max_thread_restarts: u32,
    /// Consecutive errors after which a worker counts as sick.
    pub sickness_threshold: u32,
    /// Health-check cadence in seconds.
    pub check_interval_secs: u64,
    /// Upper bound on waiting for a replaced worker to exit, in milliseconds.
    pub join_timeout_ms: u64,
    pub reboot: RebootMode,
    /// Program and arguments for [`RebootMode::Command`].
    pub reboot_command: Vec<String>,
    /// Pause between stopping all workers and issuing the reboot, in milliseconds.
    pub reboot_delay_ms: u64,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            max_thread_restarts: 3,
            sickness_threshold: 3,
            check_interval_secs: 5,
            join_timeout_ms: 2000,
            reboot: RebootMode::Command,
            reboot_command: vec!["sudo".to_string(), "reboot".to_string()],
            reboot_delay_ms: 1000,
        }
    }
}

impl SystemSettings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn reboot_delay(&self) -> Duration {
        Duration::from_millis(self.reboot_delay_ms)
    }
}

/// File locations (`paths:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub state_file: PathBuf,
    pub services_list: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("config/system_state.json"),
            services_list: PathBuf::from("config/services_list.json"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Shared store sizing (`store:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub frame_queue_capacity: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            frame_queue_capacity: 30,
        }
    }
}

/// Pin assignments for hardware-backed workers. The supervisor never reads these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    pub camera_index: Option<u32>,
    pub speaker_pin: Option<u8>,
    pub voltage_sensor_pin: Option<u8>,
    pub status_led_pin: Option<u8>,
}

/// `camera:` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fps: u32,
    /// Per-frame probability of entering a permanent simulated fault.
    pub fault_probability: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            fault_probability: 0.0,
        }
    }
}

/// `audio:` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub cooldown_secs: u64,
    /// Optional program + args run for each alert (e.g. `["say", "Warning"]`).
    pub command: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: 5,
            command: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads and validates settings from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_yml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Parses and validates settings from an in-memory YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            serde_yml::from_str(yaml).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if self.system.check_interval_secs == 0 {
            problems.push("system.check_interval_secs must be greater than 0");
        }
        if self.system.sickness_threshold == 0 {
            problems.push("system.sickness_threshold must be greater than 0");
        }
        if self.store.frame_queue_capacity == 0 {
            problems.push("store.frame_queue_capacity must be greater than 0");
        }
        if self.system.reboot == RebootMode::Command && self.system.reboot_command.is_empty() {
            problems.push("system.reboot_command must not be empty in command mode");
        }
        if !(0.0..=1.0).contains(&self.camera.fault_probability) {
            problems.push("camera.fault_probability must be within 0.0..=1.0");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems.join("; ")))
        }
    }
}

/// Ordered list of worker identifiers to start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceList {
    #[serde(default)]
    pub services: Vec<String>,
}

impl ServiceList {
    /// Reads the worker list; any failure is logged and yields an empty list.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<ServiceList>(&content).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(list) => {
                info!(path = %path.display(), count = list.services.len(), "service list loaded");
                list
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "service list could not be read; starting no workers");
                ServiceList::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let s = Settings::from_yaml_str("{}").unwrap();
        assert_eq!(s.system.max_thread_restarts, 3);
        assert_eq!(s.system.check_interval(), Duration::from_secs(5));
        assert_eq!(s.system.join_timeout(), Duration::from_secs(2));
        assert_eq!(s.system.reboot, RebootMode::Command);
        assert_eq!(s.store.frame_queue_capacity, 30);
        assert_eq!(s.paths.state_file, PathBuf::from("config/system_state.json"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = "system:\n  reboot: dry_run\n  join_timeout_ms: 50\nhardware:\n  speaker_pin: 18\n";
        let s = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(s.system.reboot, RebootMode::DryRun);
        assert_eq!(s.system.join_timeout(), Duration::from_millis(50));
        assert_eq!(s.system.sickness_threshold, 3);
        assert_eq!(s.hardware.speaker_pin, Some(18));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Settings::from_yaml_str("system:\n  check_interval_secs: 0\n").unwrap_err();
        assert_eq!(err.as_label(), "config_invalid");
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(dir.path().join("settings.yaml")).unwrap_err();
        assert_eq!(err.as_label(), "config_io");
    }

    #[test]
    fn service_list_preserves_order() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"services": ["sensors", "camera", "detector"]}}"#).unwrap();
        let list = ServiceList::load(f.path());
        assert_eq!(list.services, vec!["sensors", "camera", "detector"]);
    }

    #[test]
    fn broken_service_list_degrades_to_empty() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(ServiceList::load(f.path()).services.is_empty());

        let dir = tempfile::tempdir().unwrap();
        assert!(ServiceList::load(dir.path().join("missing.json")).services.is_empty());
    }
}
