//! # Host restart seam.
//!
//! Hard recovery ends with one call to [`HostRestart::restart_host`]. The
//! action is irreversible from the supervisor's point of view: there is no
//! confirmation or cancellation step after it is issued.
//!
//! - [`CommandRestart`] runs the configured program (`sudo reboot` by default).
//! - [`DryRunRestart`] only logs; for hosts without restart privileges.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::error::ConfigError;

use crate::config::{RebootMode, Settings};

/// Performs the host-level restart.
#[async_trait]
pub trait HostRestart: Send + Sync + 'static {
    /// Issues the restart. Failures are logged by the implementation; the
    /// supervisor does not retry.
    async fn restart_host(&self);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str;
}

/// Runs an external command to reboot the host.
#[derive(Debug, Clone)]
pub struct CommandRestart {
    program: String,
    args: Vec<String>,
}

impl CommandRestart {
    /// Builds from `program + args`. Returns `None` for an empty command.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl HostRestart for CommandRestart {
    async fn restart_host(&self) {
        info!(program = %self.program, args = ?self.args, "issuing host restart");
        match Command::new(&self.program).args(&self.args).status().await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                error!(program = %self.program, %status, "host restart command failed")
            }
            Err(e) => error!(program = %self.program, error = %e, "cannot run host restart command"),
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Logs the restart instead of performing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRestart;

#[async_trait]
impl HostRestart for DryRunRestart {
    async fn restart_host(&self) {
        warn!("dry run: host restart requested but not performed");
    }

    fn name(&self) -> &'static str {
        "dry_run"
    }
}

/// Picks the restart action configured in `system.reboot`.
///
/// Command mode without a command is a configuration error, the same rule
/// [`Settings::validate`] enforces.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn HostRestart>, ConfigError> {
    match settings.system.reboot {
        RebootMode::DryRun => Ok(Arc::new(DryRunRestart)),
        RebootMode::Command => CommandRestart::new(&settings.system.reboot_command)
            .map(|cmd| Arc::new(cmd) as Arc<dyn HostRestart>)
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "system.reboot_command must not be empty in command mode".to_string(),
                )
            }),
    }
}
