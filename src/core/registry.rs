//! # Worker registry: ordered slots keyed by worker name.
//!
//! Each [`Slot`] remembers how to rebuild its worker (`identifier`), the
//! cumulative `restart_count`, and the live instance if there is one.
//!
//! ## Rules
//! - Slots keep registration order; health checks walk them in that order.
//! - Names are unique; a second registration under the same name is refused.
//! - `restart_count` only ever grows while the process runs.
//! - A slot outlives its instances: replacing or losing an instance never
//!   removes the slot.

use std::sync::Arc;

use crate::workers::WorkerHandle;

/// Bookkeeping for one supervised worker.
#[derive(Debug)]
pub struct Slot {
    pub name: Arc<str>,
    /// Catalog identifier the worker was built from.
    pub identifier: String,
    pub restart_count: u32,
    /// `None` when a replacement failed to build.
    pub instance: Option<WorkerHandle>,
}

impl Slot {
    /// Increments and returns the cumulative failure count.
    pub fn record_failure(&mut self) -> u32 {
        self.restart_count = self.restart_count.saturating_add(1);
        self.restart_count
    }

    /// `(is_alive, consecutive_errors)` of the current instance.
    pub fn observe(&self) -> Option<(bool, u32)> {
        self.instance
            .as_ref()
            .map(|h| (h.is_alive(), h.consecutive_errors()))
    }
}

/// Ordered collection of slots.
#[derive(Debug, Default)]
pub struct Registry {
    slots: Vec<Slot>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends a new slot with `restart_count = 0`.
    ///
    /// Returns the handle back when the name is already taken.
    pub fn insert(&mut self, identifier: &str, handle: WorkerHandle) -> Result<(), WorkerHandle> {
        if self.contains(handle.name()) {
            return Err(handle);
        }
        self.slots.push(Slot {
            name: Arc::from(handle.name()),
            identifier: identifier.to_string(),
            restart_count: 0,
            instance: Some(handle),
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| &*s.name == name)
    }

    pub fn slots_mut(&mut self) -> std::slice::IterMut<'_, Slot> {
        self.slots.iter_mut()
    }

    /// Instances currently held, in registration order.
    pub fn instances_mut(&mut self) -> impl Iterator<Item = &mut WorkerHandle> {
        self.slots.iter_mut().filter_map(|s| s.instance.as_mut())
    }

    /// Worker names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use crate::error::WorkerError;
    use crate::events::Bus;
    use crate::workers::context::tests::deps_in;
    use crate::workers::{Worker, WorkerContext};

    struct Named(&'static str);

    #[async_trait]
    impl Worker for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
            ctx.stopped().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_names_are_refused_and_order_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps_in(dir.path());
        let bus = Bus::new(8);
        let root = CancellationToken::new();
        let start = |n| WorkerHandle::start(Box::new(Named(n)), &deps, &bus, &root);

        let mut reg = Registry::new();
        assert!(reg.insert("camera", start("camera")).is_ok());
        assert!(reg.insert("sensors", start("sensors")).is_ok());
        let rejected = reg.insert("pkg.Camera", start("camera")).unwrap_err();
        rejected.stop();

        assert_eq!(reg.names(), vec!["camera", "sensors"]);
        assert_eq!(reg.get("camera").map(|s| s.identifier.as_str()), Some("camera"));
        assert_eq!(reg.get("camera").map(|s| s.restart_count), Some(0));
        root.cancel();
    }

    #[tokio::test]
    async fn failures_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps_in(dir.path());
        let handle = WorkerHandle::start(
            Box::new(Named("audio")),
            &deps,
            &Bus::new(8),
            &CancellationToken::new(),
        );

        let mut reg = Registry::new();
        reg.insert("audio", handle).unwrap();
        let slot = reg.slots_mut().next().unwrap();
        assert_eq!(slot.record_failure(), 1);
        assert_eq!(slot.record_failure(), 2);
        assert_eq!(slot.observe(), Some((true, 0)));

        slot.instance = None;
        assert_eq!(slot.observe(), None);
    }
}
