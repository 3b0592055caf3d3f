use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{
    config::SupervisorConfig,
    restart::{DryRunRestart, HostRestart},
    supervisor::Supervisor,
};
use crate::{
    events::Bus,
    subscribers::{LogWriter, Subscribe, SubscriberSet},
    workers::{WorkerCatalog, WorkerDeps},
};

/// Builder for constructing a [`Supervisor`].
///
/// Defaults: the built-in worker catalog, a [`DryRunRestart`] host restart and
/// a single [`LogWriter`] subscriber.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    deps: WorkerDeps,
    catalog: WorkerCatalog,
    restart: Arc<dyn HostRestart>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration and worker dependencies.
    pub fn new(cfg: SupervisorConfig, deps: WorkerDeps) -> Self {
        Self {
            cfg,
            deps,
            catalog: WorkerCatalog::builtin(),
            restart: Arc::new(DryRunRestart),
            subscribers: vec![Arc::new(LogWriter::new())],
        }
    }

    /// Sets the catalog used to build workers at startup and on every soft recovery.
    pub fn with_catalog(mut self, catalog: WorkerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the action taken at the end of hard recovery.
    pub fn with_restart(mut self, restart: Arc<dyn HostRestart>) -> Self {
        self.restart = restart;
        self
    }

    /// Replaces the event subscribers.
    ///
    /// Subscribers receive runtime events (worker lifecycle, diagnosis,
    /// recovery) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor and spawns its subscriber listener.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let runtime_token = CancellationToken::new();
        let listener = subs.spawn_listener(&bus, runtime_token.clone());

        Arc::new(Supervisor::new_internal(
            self.cfg,
            bus,
            self.catalog,
            self.deps,
            self.restart,
            runtime_token,
            listener,
        ))
    }
}
