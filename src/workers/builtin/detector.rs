//! Simulated person detector consuming camera frames.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::WorkerError;
use crate::workers::{Worker, WorkerContext};

const POLL: Duration = Duration::from_millis(100);
const INFERENCE_TIME: Duration = Duration::from_millis(50);
/// Frames between two detection decisions.
const DECISION_EVERY: u64 = 100;

/// Drains the frame queue and flips `person_detected` every hundred frames.
///
/// An empty queue is a healthy state, not an error.
#[derive(Debug, Default)]
pub struct DetectorWorker {
    processed: u64,
}

impl DetectorWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one frame; returns a detection decision when one is due.
    fn on_frame(&mut self) -> Option<bool> {
        self.processed += 1;
        (self.processed % DECISION_EVERY == 0).then(rand::random::<bool>)
    }
}

#[async_trait]
impl Worker for DetectorWorker {
    fn name(&self) -> &str {
        "detector"
    }

    async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        info!(worker = ctx.name(), "detector started (simulated model)");
        let frames = ctx.store().frame_queue();

        while !ctx.is_stopping() {
            if frames.pop_timeout(POLL).await.is_none() {
                ctx.report_health();
                continue;
            }

            ctx.sleep(INFERENCE_TIME).await;
            if let Some(detected) = self.on_frame() {
                ctx.store().set_volatile(|v| v.person_detected = detected);
                if detected {
                    info!(worker = ctx.name(), frames = self.processed, "person detected");
                } else {
                    info!(worker = ctx.name(), frames = self.processed, "area clear");
                }
            }
            ctx.report_health();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_happen_every_hundred_frames() {
        let mut d = DetectorWorker::new();
        let decisions = (0..350).filter_map(|_| d.on_frame()).count();
        assert_eq!(decisions, 3);
        assert_eq!(d.processed, 350);
    }
}
