//! # Worker catalog: identifier → factory.
//!
//! The service list names workers by identifier. [`WorkerCatalog`] maps each
//! identifier to a factory that builds a fresh instance from [`WorkerDeps`].
//! The supervisor uses it both at startup and for every soft recovery, so a
//! replacement is always built the same way as the first instance.
//!
//! ## Resolution
//! ```text
//! "camera"                                      → exact hit
//! "hostvisor.workers.Camera"                    → last segment → "camera"
//! "src.services.camera_service.CameraService"   → "cameraservice" → strip suffix → "camera"
//! "src.services.dummy_producer.DummyProducer"   → "dummyproducer" → strip prefix → "producer"
//! "lidar"                                       → miss → WorkerError::Fatal
//! ```
//!
//! The short name is the last dotted segment, lowercased, with a `dummy`
//! prefix and a `service`/`worker` suffix removed.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::{WorkerError, panic_message};
use crate::workers::builtin;
use crate::workers::{Worker, WorkerDeps};

/// Builds one worker instance.
pub type WorkerFactory =
    Arc<dyn Fn(&WorkerDeps) -> Result<Box<dyn Worker>, WorkerError> + Send + Sync>;

/// Registry of worker factories keyed by identifier.
#[derive(Clone, Default)]
pub struct WorkerCatalog {
    factories: HashMap<String, WorkerFactory>,
}

impl WorkerCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every built-in worker registered.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        builtin::register_all(&mut catalog);
        catalog
    }

    /// Adds (or replaces) the factory for `id`.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&WorkerDeps) -> Result<Box<dyn Worker>, WorkerError> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&WorkerDeps) -> Result<Box<dyn Worker>, WorkerError> + Send + Sync + 'static,
    {
        self.register(id, factory);
        self
    }

    /// Finds the factory for `id`: exact match first, then the last dotted
    /// segment lowercased.
    pub fn resolve(&self, id: &str) -> Option<&WorkerFactory> {
        if let Some(f) = self.factories.get(id) {
            return Some(f);
        }
        let segment = id.rsplit('.').next()?.to_ascii_lowercase();
        self.factories
            .get(&segment)
            .or_else(|| self.factories.get(short_name(&segment)))
    }

    /// Makes `alias` resolve to the factory already registered under `target`.
    ///
    /// Returns `false` (and registers nothing) when `target` is unknown.
    pub fn alias(&mut self, alias: impl Into<String>, target: &str) -> bool {
        match self.factories.get(target).cloned() {
            Some(factory) => {
                self.factories.insert(alias.into(), factory);
                true
            }
            None => false,
        }
    }

    /// Builds a new instance for `id`.
    ///
    /// Unknown identifiers and panicking factories are reported as
    /// [`WorkerError::Fatal`]; nothing escapes to the caller.
    pub fn instantiate(&self, id: &str, deps: &WorkerDeps) -> Result<Box<dyn Worker>, WorkerError> {
        let factory = self
            .resolve(id)
            .ok_or_else(|| WorkerError::fatal(format!("unknown worker identifier '{id}'")))?;

        match catch_unwind(AssertUnwindSafe(|| factory(deps))) {
            Ok(built) => built,
            Err(payload) => Err(WorkerError::fatal(format!(
                "factory for '{id}' panicked: {}",
                panic_message(&*payload)
            ))),
        }
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

fn short_name(segment: &str) -> &str {
    let s = segment.strip_prefix("dummy").unwrap_or(segment);
    let s = s
        .strip_suffix("service")
        .or_else(|| s.strip_suffix("worker"))
        .unwrap_or(s);
    if s.is_empty() { segment } else { s }
}

impl std::fmt::Debug for WorkerCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerCatalog")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::workers::WorkerContext;
    use crate::workers::context::tests::deps_in;

    struct Idle;

    #[async_trait]
    impl Worker for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        async fn main_loop(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
            ctx.stopped().await;
            Ok(())
        }
    }

    #[test]
    fn qualified_identifiers_fall_back_to_short_name() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = WorkerCatalog::new().with("idle", |_| Ok(Box::new(Idle)));

        let deps = deps_in(dir.path());
        assert!(catalog.instantiate("idle", &deps).is_ok());
        assert!(catalog.instantiate("plant.services.Idle", &deps).is_ok());
        assert!(catalog.resolve("lidar").is_none());
    }

    #[test]
    fn class_paths_of_the_python_deployment_resolve_to_builtins() {
        let catalog = WorkerCatalog::builtin();
        let cases = [
            ("src.services.camera_service.CameraService", "camera"),
            ("src.services.sensor_service.SensorsService", "sensors"),
            ("src.services.audio_service.AudioService", "audio"),
            ("src.services.yolo_service.YoloService", "detector"),
            ("src.services.dummy_producer.DummyProducer", "producer"),
            ("src.services.dummy_consumer.DummyConsumer", "consumer"),
        ];
        for (path, builtin) in cases {
            let got = catalog.resolve(path).expect(path);
            let want = catalog.resolve(builtin).unwrap();
            assert!(Arc::ptr_eq(got, want), "{path} should resolve to {builtin}");
        }
        assert!(catalog.resolve("src.services.Service").is_none());
    }

    #[test]
    fn alias_requires_a_known_target() {
        let mut catalog = WorkerCatalog::new().with("idle", |_| Ok(Box::new(Idle)));
        assert!(catalog.alias("rest", "idle"));
        assert!(!catalog.alias("nap", "sleep"));
        assert!(catalog.resolve("rest").is_some());
        assert!(catalog.resolve("nap").is_none());
    }

    #[test]
    fn unknown_identifier_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkerCatalog::new()
            .instantiate("lidar", &deps_in(dir.path()))
            .err()
            .unwrap();
        assert_eq!(err.as_label(), "worker_fatal");
    }

    #[test]
    fn panicking_factory_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = WorkerCatalog::new().with("flaky", |_| panic!("no /dev/video0"));

        let err = catalog
            .instantiate("flaky", &deps_in(dir.path()))
            .err()
            .unwrap();
        assert!(err.to_string().contains("no /dev/video0"));
    }

    #[test]
    fn builtin_catalog_knows_every_simulated_unit() {
        let catalog = WorkerCatalog::builtin();
        let ids = catalog.identifiers();
        for id in ["audio", "camera", "consumer", "detector", "producer", "sensors"] {
            assert!(ids.contains(&id), "missing {id}");
        }
    }
}
