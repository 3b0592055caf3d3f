use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use hostvisor::logging::{self, DEFAULT_LOG_FILE};
use hostvisor::{DryRunRestart, HostRestart, RunOutcome, Settings, WorkerCatalog};

/// Supervises the worker units of this host and restarts it when they keep failing.
#[derive(Debug, Parser)]
#[command(name = "hostvisor", version, about)]
struct Cli {
    /// Settings file (YAML).
    #[arg(long, short, env = "HOSTVISOR_CONFIG", default_value = "config/settings.yaml")]
    config: PathBuf,

    /// Log the host restart instead of performing it.
    #[arg(long)]
    dry_run: bool,

    /// Directory for the log file (overrides `paths.log_dir`).
    #[arg(long, env = "HOSTVISOR_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config);
    let log_dir = cli.log_dir.clone().unwrap_or_else(|| match &settings {
        Ok(s) => s.paths.log_dir.clone(),
        Err(_) => PathBuf::from("logs"),
    });
    let _guard = logging::init(&log_dir, DEFAULT_LOG_FILE)
        .with_context(|| format!("cannot initialise logging in {}", log_dir.display()))?;

    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, label = e.as_label(), "cannot start without valid settings");
            return Err(e).context("loading settings");
        }
    };

    let restart: Arc<dyn HostRestart> = if cli.dry_run {
        Arc::new(DryRunRestart)
    } else {
        hostvisor::restart_from_settings(&settings).context("selecting the host restart action")?
    };
    info!(config = %cli.config.display(), restart = restart.name(), "hostvisor starting");

    match hostvisor::run(settings, WorkerCatalog::builtin(), restart).await? {
        RunOutcome::Shutdown => info!("hostvisor stopped"),
        RunOutcome::HardRecovery => info!("hostvisor exiting after hard recovery"),
    }
    Ok(())
}
