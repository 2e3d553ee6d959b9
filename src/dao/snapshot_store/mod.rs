pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::models::StoredSnapshot;
use crate::dao::storage::StorageResult;

pub use self::memory::MemorySnapshotStore;

/// Abstraction over the durable store holding one snapshot per live room.
pub trait SnapshotStore: Send + Sync {
    fn put(&self, snapshot: StoredSnapshot) -> BoxFuture<'static, StorageResult<()>>;
    fn get_all(&self) -> BoxFuture<'static, StorageResult<Vec<StoredSnapshot>>>;
    fn delete(&self, room_code: String) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
