//! # Persistent document and its durable file format.
//!
//! [`PersistentState`] is the part of the shared store that survives process
//! and host restarts. It is stored as pretty-printed JSON:
//!
//! ```text
//! {
//!   "system_info":          { first_install_date, last_boot_timestamp, total_uptime_hours },
//!   "resilience":           { maintenance_mode_active, reboot_error_count },
//!   "persistence_settings": { eco_mode_active },
//!   "scientific_metrics":   { total_people_assisted, total_system_restarts },
//!   "metadata":             { version, last_updated, author }
//! }
//! ```
//!
//! Missing sections or keys in an existing file are filled with factory
//! defaults on load. Writes go through a temp file + `sync_all` + rename so a
//! crash mid-write leaves either the old or the new document, never a torn one.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Schema version written into `metadata.version`.
pub const STATE_SCHEMA_VERSION: &str = "2.0";

/// Whole persistent document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentState {
    pub system_info: SystemInfo,
    pub resilience: Resilience,
    pub persistence_settings: PersistenceSettings,
    pub scientific_metrics: ScientificMetrics,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    /// Set on the first boot that finds no install date.
    pub first_install_date: Option<DateTime<Utc>>,
    pub last_boot_timestamp: Option<DateTime<Utc>>,
    pub total_uptime_hours: f64,
}

/// Counters the supervisor relies on across reboots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resilience {
    pub maintenance_mode_active: bool,
    /// Number of hard recoveries (host reboots) triggered so far.
    pub reboot_error_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    pub eco_mode_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScientificMetrics {
    pub total_people_assisted: u64,
    pub total_system_restarts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub version: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub author: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            version: STATE_SCHEMA_VERSION.to_string(),
            last_updated: None,
            author: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Reads and decodes the document at `path`.
pub(crate) fn read(path: &Path) -> Result<PersistentState, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Encodes `state` and replaces the file at `path`, flushed to the device before returning.
pub(crate) fn write_durable(path: &Path, state: &PersistentState) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(state).map_err(StoreError::Encode)?;

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp).map_err(io_err(&tmp))?;
        file.write_all(&body).map_err(io_err(&tmp))?;
        file.sync_all().map_err(io_err(&tmp))?;
    }
    fs::rename(&tmp, path).map_err(io_err(path))?;

    // Make the rename itself durable.
    #[cfg(unix)]
    if let Some(parent) = parent {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(io_err(parent))?;
    }
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
