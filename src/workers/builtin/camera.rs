//! Simulated camera feeding the frame queue.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{error, info};

use crate::config::CameraSettings;
use crate::error::WorkerError;
use crate::store::Frame;
use crate::workers::{Worker, WorkerContext};

const FAULT_RETRY: Duration = Duration::from_millis(500);

/// Produces synthetic frames at roughly `camera.fps`.
///
/// With probability `camera.fault_probability` per frame the camera enters a
/// permanent fault: from then on every iteration reports an error, which the
/// supervisor eventually diagnoses as sick and replaces.
#[derive(Debug)]
pub struct CameraWorker {
    frame_period: Duration,
    fault_probability: f64,
    broken: bool,
    seq: u64,
}

impl CameraWorker {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            frame_period: Duration::from_secs(1) / settings.fps.max(1),
            fault_probability: settings.fault_probability.clamp(0.0, 1.0),
            broken: false,
            seq: 0,
        }
    }

    fn roll_fault(&mut self) -> bool {
        if !self.broken && self.fault_probability > 0.0 {
            self.broken = rand::rng().random_bool(self.fault_probability);
        }
        self.broken
    }
}

#[async_trait]
impl Worker for CameraWorker {
    fn name(&self) -> &str {
        "camera"
    }

    async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        info!(worker = ctx.name(), "no capture device configured, producing simulated frames");
        let frames = ctx.store().frame_queue();

        while !ctx.is_stopping() {
            if self.roll_fault() {
                error!(worker = ctx.name(), "simulated camera hardware fault");
                ctx.report_error();
                ctx.sleep(FAULT_RETRY).await;
                continue;
            }

            self.seq += 1;
            frames.push(Frame::synthetic(self.seq));
            ctx.report_health();
            ctx.sleep(self.frame_period).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Settings;
    use crate::events::Bus;
    use crate::workers::{WorkerDeps, WorkerHandle};
    use tokio_util::sync::CancellationToken;

    #[tokio::test(flavor = "multi_thread")]
    async fn healthy_camera_fills_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(crate::SharedStore::open(dir.path().join("s.json"), 4));
        let deps = WorkerDeps::new(Arc::clone(&store), Arc::new(Settings::default()));
        let camera = CameraWorker::new(&CameraSettings {
            fps: 200,
            fault_probability: 0.0,
        });

        let root = CancellationToken::new();
        let mut h = WorkerHandle::start(Box::new(camera), &deps, &Bus::new(8), &root);
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.stop();
        h.wait().await;

        let queue = store.frame_queue();
        assert_eq!(queue.len(), 4);
        assert!(queue.dropped() > 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn certain_fault_reports_errors_and_stops_producing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(crate::SharedStore::open(dir.path().join("s.json"), 4));
        let deps = WorkerDeps::new(Arc::clone(&store), Arc::new(Settings::default()));
        let camera = CameraWorker::new(&CameraSettings {
            fps: 30,
            fault_probability: 1.0,
        });

        let root = CancellationToken::new();
        let h = WorkerHandle::start(Box::new(camera), &deps, &Bus::new(8), &root);
        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert!(h.consecutive_errors() >= 2);
        assert!(store.frame_queue().is_empty());
        h.stop();
    }
}
