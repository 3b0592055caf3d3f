//! Counter-based producer/consumer pair for exercising the frame queue
//! without any camera.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::WorkerError;
use crate::store::Frame;
use crate::workers::{Worker, WorkerContext};

/// Pushes one numbered frame per second.
#[derive(Debug, Default)]
pub struct ProducerWorker {
    counter: u64,
}

impl ProducerWorker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Worker for ProducerWorker {
    fn name(&self) -> &str {
        "producer"
    }

    async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let queue = ctx.store().frame_queue();
        while !ctx.is_stopping() {
            self.counter += 1;
            queue.push(Frame::synthetic(self.counter));
            info!(worker = ctx.name(), seq = self.counter, "added");
            ctx.report_health();
            ctx.sleep(Duration::from_secs(1)).await;
        }
        Ok(())
    }
}

/// Pops frames and logs their sequence numbers.
#[derive(Debug, Default)]
pub struct ConsumerWorker {
    consumed: u64,
}

impl ConsumerWorker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Worker for ConsumerWorker {
    fn name(&self) -> &str {
        "consumer"
    }

    async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let queue = ctx.store().frame_queue();
        while !ctx.is_stopping() {
            // The timeout doubles as the stop-flag check point.
            let Some(frame) = queue.pop_timeout(Duration::from_secs(1)).await else {
                continue;
            };
            self.consumed += 1;
            info!(worker = ctx.name(), seq = frame.seq, total = self.consumed, "consumed");
            ctx.report_health();
            ctx.sleep(Duration::from_millis(500)).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    use crate::events::Bus;
    use crate::workers::WorkerHandle;
    use crate::workers::context::tests::deps_in;

    #[tokio::test(flavor = "multi_thread")]
    async fn consumer_sees_what_producer_pushed() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps_in(dir.path());
        let bus = Bus::new(8);
        let root = CancellationToken::new();

        let mut producer = WorkerHandle::start(Box::new(ProducerWorker::new()), &deps, &bus, &root);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(deps.store.frame_queue().len(), 1);

        let mut consumer = WorkerHandle::start(Box::new(ConsumerWorker::new()), &deps, &bus, &root);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(deps.store.frame_queue().is_empty());

        root.cancel();
        assert!(producer.join_timeout(Duration::from_secs(2)).await);
        assert!(consumer.join_timeout(Duration::from_secs(2)).await);
    }
}
