pub mod clock;
pub mod hub;
pub mod registry;
pub mod round;
pub mod scheduler;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod storage;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{notifier::LogNotifier, word_source::WordBank},
};

use self::{
    clock::SystemClock,
    hub::ConnectionHub,
    registry::{RegistryDeps, SessionRegistry},
    snapshot::SnapshotWriter,
    storage::StorageSlot,
};

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, live rooms, sockets and storage handle.
pub struct AppState {
    config: Arc<AppConfig>,
    storage: Arc<StorageSlot>,
    hub: Arc<ConnectionHub>,
    registry: Arc<SessionRegistry>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a snapshot store is installed. Must be
    /// called from within a Tokio runtime, as it spawns the snapshot writer.
    pub fn new(config: AppConfig) -> SharedState {
        let config = Arc::new(config);
        let storage = Arc::new(StorageSlot::new());
        let hub = Arc::new(ConnectionHub::new());
        let registry = SessionRegistry::new(RegistryDeps {
            config: Arc::clone(&config),
            words: Arc::new(WordBank::default()),
            broadcaster: hub.clone(),
            clock: Arc::new(SystemClock),
            snapshots: SnapshotWriter::spawn(Arc::clone(&storage)),
            notifier: Arc::new(LogNotifier),
        });

        Arc::new(Self {
            config,
            storage,
            hub,
            registry,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Snapshot store slot and degraded flag.
    pub fn storage(&self) -> Arc<StorageSlot> {
        Arc::clone(&self.storage)
    }

    /// Live WebSocket connections and their room subscriptions.
    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    /// Registry of live rooms.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        self.storage.is_degraded()
    }
}
