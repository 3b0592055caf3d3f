//! Audible alert when a person is detected.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::AudioSettings;
use crate::error::WorkerError;
use crate::workers::{Worker, WorkerContext};

const POLL: Duration = Duration::from_millis(500);

/// Announces a warning at most once per cooldown while `person_detected` is set.
///
/// With an `audio.command` configured the announcement runs that program;
/// otherwise it is only logged. Every announcement counts one person assisted.
#[derive(Debug)]
pub struct AudioWorker {
    cooldown: Duration,
    command: Vec<String>,
    last_played: Option<Instant>,
}

impl AudioWorker {
    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            cooldown: Duration::from_secs(settings.cooldown_secs),
            command: settings.command.clone(),
            last_played: None,
        }
    }

    fn due(&self, now: Instant) -> bool {
        self.last_played
            .is_none_or(|at| now.duration_since(at) >= self.cooldown)
    }

    async fn announce(&self) -> Result<(), WorkerError> {
        let Some((program, args)) = self.command.split_first() else {
            info!("playing: 'Warning! Person detected.'");
            return Ok(());
        };

        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|e| WorkerError::fail(format!("cannot run '{program}': {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(WorkerError::fail(format!("'{program}' exited with {status}")))
        }
    }
}

#[async_trait]
impl Worker for AudioWorker {
    fn name(&self) -> &str {
        "audio"
    }

    async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        while !ctx.is_stopping() {
            let person = ctx.store().get_volatile(|v| v.person_detected);
            let now = Instant::now();

            if person && self.due(now) {
                self.last_played = Some(now);
                match self.announce().await {
                    Ok(()) => {
                        // The durable write fsyncs; keep it off the runtime threads.
                        let store = Arc::clone(ctx.store());
                        let counted = tokio::task::spawn_blocking(move || {
                            store.set_metric(|m| m.total_people_assisted += 1)
                        })
                        .await;
                        if let Err(e) = counted {
                            warn!(worker = ctx.name(), error = %e, "people counter update aborted");
                        }
                        ctx.report_health();
                    }
                    Err(e) => {
                        warn!(worker = ctx.name(), error = %e, "alert playback failed");
                        ctx.report_error();
                    }
                }
            } else {
                ctx.report_health();
            }
            ctx.sleep(POLL).await;
        }
        Ok(())
    }
}
