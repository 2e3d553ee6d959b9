use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::dao::snapshot_store::SnapshotStore;

/// Holder of the currently installed snapshot store and of the degraded flag.
///
/// The application starts degraded until a store is installed.
pub struct StorageSlot {
    store: RwLock<Option<Arc<dyn SnapshotStore>>>,
    degraded: watch::Sender<bool>,
}

impl Default for StorageSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageSlot {
    /// Empty, degraded slot.
    pub fn new() -> Self {
        let (degraded_tx, _rx) = watch::channel(true);
        Self {
            store: RwLock::new(None),
            degraded: degraded_tx,
        }
    }

    /// Obtain a handle to the current snapshot store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn SnapshotStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new snapshot store implementation and leave degraded mode.
    pub async fn install(&self, store: Arc<dyn SnapshotStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.set_degraded(false);
    }

    /// Remove the current snapshot store and enter degraded mode.
    pub async fn clear(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.set_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn set_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Wait until a healthy store is installed and return it.
    pub async fn wait_ready(&self) -> Arc<dyn SnapshotStore> {
        let mut watcher = self.degraded.subscribe();
        loop {
            if !*watcher.borrow_and_update() {
                if let Some(store) = self.store().await {
                    return store;
                }
            }
            if watcher.changed().await.is_err() {
                // Unreachable while `self` owns the sender; park instead of spinning.
                std::future::pending::<()>().await;
            }
        }
    }
}
