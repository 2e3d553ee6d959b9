use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, ready};

use super::SnapshotStore;
use crate::dao::{models::StoredSnapshot, storage::StorageResult};

/// Process-local [`SnapshotStore`], used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    rows: Arc<DashMap<String, StoredSnapshot>>,
}

impl MemorySnapshotStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `rows`.
    pub fn with_rows(rows: impl IntoIterator<Item = StoredSnapshot>) -> Self {
        let store = Self::new();
        for row in rows {
            store.rows.insert(row.room_code.clone(), row);
        }
        store
    }

    /// Snapshot currently stored for `room_code`.
    pub fn row(&self, room_code: &str) -> Option<StoredSnapshot> {
        self.rows.get(room_code).map(|row| row.clone())
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn put(&self, snapshot: StoredSnapshot) -> BoxFuture<'static, StorageResult<()>> {
        self.rows.insert(snapshot.room_code.clone(), snapshot);
        Box::pin(ready(Ok(())))
    }

    fn get_all(&self) -> BoxFuture<'static, StorageResult<Vec<StoredSnapshot>>> {
        let rows = self.rows.iter().map(|row| row.value().clone()).collect();
        Box::pin(ready(Ok(rows)))
    }

    fn delete(&self, room_code: String) -> BoxFuture<'static, StorageResult<()>> {
        self.rows.remove(&room_code);
        Box::pin(ready(Ok(())))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }
}
