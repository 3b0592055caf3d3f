//! # Bounded drop-oldest queue for producer/consumer handoff.
//!
//! [`FrameQueue`] connects one worker that produces data (camera) with one that
//! consumes it (detector). It favors fresh data over history:
//!
//! ```text
//! capacity = 3
//! push(a) push(b) push(c)     [a, b, c]
//! push(d)                     [b, c, d]   (a evicted, dropped += 1)
//! try_pop()                   -> b
//! ```
//!
//! ## Rules
//! - `len() <= capacity()` at all times.
//! - A push into a full queue evicts exactly one item (the oldest) and returns it.
//! - Retained items keep FIFO order.
//! - The queue carries its own lock; holders of an `Arc<FrameQueue>` never go
//!   through the shared store's lock to push or pop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// One captured image handed from the camera to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Producer-assigned sequence number.
    pub seq: u64,
    pub captured_at: Instant,
    pub width: u32,
    pub height: u32,
    /// Raw grayscale pixels (may be empty for synthetic frames).
    pub pixels: Vec<u8>,
}

impl Frame {
    /// A small synthetic frame used when no real camera is attached.
    pub fn synthetic(seq: u64) -> Self {
        Self {
            seq,
            captured_at: Instant::now(),
            width: 640,
            height: 480,
            pixels: Vec::new(),
        }
    }
}

/// Bounded FIFO that evicts its oldest element when full.
#[derive(Debug)]
pub struct FrameQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    dropped: AtomicU64,
    ready: Notify,
}

impl<T> FrameQueue<T> {
    /// Creates an empty queue. Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
            ready: Notify::new(),
        }
    }

    /// Appends `item`, evicting and returning the oldest element if the queue is full.
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = {
            let mut items = self.lock();
            let evicted = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(item);
            evicted
        };
        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_one();
        evicted
    }

    /// Removes the oldest element without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Waits up to `timeout` for an element.
    ///
    /// Returns `None` when nothing arrived in time. Consumers use this as their
    /// stop-flag check point.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of items evicted by full-queue pushes since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// A panicking holder cannot leave the deque half-updated, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
