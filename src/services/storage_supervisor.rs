use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{snapshot_store::SnapshotStore, storage::StorageError},
    state::storage::StorageSlot,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Reconnect to the snapshot store and keep the storage slot degraded while it is unavailable.
pub async fn run<F, Fut>(storage: Arc<StorageSlot>, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn SnapshotStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                storage.install(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if storage.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                storage.set_degraded(false);
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(_) => {
                            let mut attempt = 0;
                            let mut reconnect_delay = INITIAL_DELAY;
                            let mut reconnected = false;

                            while attempt < MAX_RECONNECT_ATTEMPTS {
                                match store.try_reconnect().await {
                                    Ok(()) => {
                                        info!(
                                            "storage reconnection succeeded after health check failure"
                                        );
                                        reconnected = true;
                                        break;
                                    }
                                    Err(reconnect_err) => {
                                        if attempt == 0 {
                                            warn!(
                                                attempt, error = %reconnect_err,
                                                "storage reconnect first attempt failed; entering in degraded mode"
                                            );
                                            storage.set_degraded(true);
                                        } else {
                                            warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                                        };
                                        attempt += 1;
                                        sleep(reconnect_delay).await;
                                        reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                                    }
                                }
                            }

                            if reconnected {
                                storage.set_degraded(false);
                                sleep(HEALTH_POLL_INTERVAL).await;
                                continue;
                            } else {
                                warn!(
                                    "exhausted storage reconnect attempts; staying in degraded mode"
                                );
                                storage.clear().await;
                                break;
                            }
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::atomic::{AtomicBool, AtomicU32, Ordering},
    };

    use futures::future::{BoxFuture, ready};

    use super::*;
    use crate::dao::{models::StoredSnapshot, storage::StorageResult};

    #[derive(Default)]
    struct FlakyStore {
        down: AtomicBool,
    }

    fn outage() -> StorageError {
        StorageError::unavailable("down".into(), io::Error::other("down"))
    }

    impl SnapshotStore for FlakyStore {
        fn put(&self, _snapshot: StoredSnapshot) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(ready(Ok(())))
        }
        fn get_all(&self) -> BoxFuture<'static, StorageResult<Vec<StoredSnapshot>>> {
            Box::pin(ready(Ok(Vec::new())))
        }
        fn delete(&self, _room_code: String) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(ready(Ok(())))
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let result = if self.down.load(Ordering::SeqCst) {
                Err(outage())
            } else {
                Ok(())
            };
            Box::pin(ready(result))
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.health_check()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connects_are_retried_then_installed() {
        let storage = Arc::new(StorageSlot::new());
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let supervisor = tokio::spawn(run(storage.clone(), move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(outage())
                } else {
                    Ok(Arc::new(FlakyStore::default()) as Arc<dyn SnapshotStore>)
                }
            }
        }));

        sleep(Duration::from_secs(4)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(!storage.is_degraded());
        supervisor.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn health_failures_enter_degraded_mode() {
        let storage = Arc::new(StorageSlot::new());
        let store = Arc::new(FlakyStore::default());
        let shared = store.clone();
        let supervisor = tokio::spawn(run(storage.clone(), move || {
            let store = shared.clone();
            async move { Ok(store as Arc<dyn SnapshotStore>) }
        }));

        sleep(Duration::from_millis(100)).await;
        assert!(!storage.is_degraded());

        store.down.store(true, Ordering::SeqCst);
        sleep(HEALTH_POLL_INTERVAL + Duration::from_millis(100)).await;
        assert!(storage.is_degraded());

        store.down.store(false, Ordering::SeqCst);
        sleep(Duration::from_secs(30)).await;
        assert!(!storage.is_degraded());
        supervisor.abort();
    }
}
