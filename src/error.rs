//! Error types used by the hostvisor runtime, its workers, and the shared store.
//!
//! This module defines the error enums of the crate:
//!
//! - [`WorkerError`] — errors returned by a worker's main loop.
//! - [`StoreError`] — durable-write and load failures inside the shared store.
//! - [`ConfigError`] — settings loading and validation failures.
//! - [`RuntimeError`] — errors surfaced by the top-level run loop.
//!
//! Every type provides `as_label` (stable snake_case tag for logs).
//! Only [`ConfigError`] is ever allowed to abort startup; everything else is
//! logged where it happens and absorbed.

use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced by a worker's main loop.
///
/// A worker returning `Err` ends its own execution context; the supervisor
/// observes this as a dead worker on the next health check.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Iteration or setup failed; the worker cannot continue.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable fault (bad wiring, missing hardware).
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Worker observed its stop signal mid-operation.
    #[error("stop requested")]
    Canceled,
}

impl WorkerError {
    /// Shorthand for [`WorkerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`WorkerError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        WorkerError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use hostvisor::WorkerError;
    ///
    /// let err = WorkerError::fail("camera unplugged");
    /// assert_eq!(err.as_label(), "worker_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Canceled => "worker_canceled",
        }
    }
}

/// # Errors produced by the shared store's durable layer.
///
/// These never escape the store's public accessors; they are logged at
/// `error` level and the in-memory state keeps going.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading, writing, syncing or renaming the state file failed.
    #[error("state file I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the persistent document failed.
    #[error("failed to encode persistent state: {0}")]
    Encode(#[source] serde_json::Error),

    /// The state file exists but does not hold a valid document.
    #[error("corrupted state file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Io { .. } => "store_io",
            StoreError::Encode(_) => "store_encode",
            StoreError::Decode { .. } => "store_decode",
        }
    }

    /// True when the failure is "file does not exist yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// # Errors produced while loading settings.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid YAML for [`Settings`](crate::Settings).
    #[error("cannot parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    /// Settings parsed but hold values the runtime cannot work with.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "config_io",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Invalid(_) => "config_invalid",
        }
    }
}

/// # Errors produced by the top-level runtime loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Settings could not be loaded; the process must not start.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// OS signal listeners could not be installed.
    #[error("failed to install shutdown signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Config(e) => e.as_label(),
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// Extracts the message of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        let err = std::panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(&*err), "boom 1");

        let err = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*err), "static");
    }

    #[test]
    fn not_found_is_detected() {
        let err = StoreError::Io {
            path: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_not_found());

        let err = StoreError::Io {
            path: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn runtime_error_forwards_config_label() {
        let err = RuntimeError::from(ConfigError::Invalid("x".into()));
        assert_eq!(err.as_label(), "config_invalid");
    }
}
