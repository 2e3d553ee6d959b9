use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::warn;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::MongoSnapshotDocument,
};
use crate::dao::{models::StoredSnapshot, snapshot_store::SnapshotStore, storage::StorageResult};

const SNAPSHOT_COLLECTION_NAME: &str = "snapshots";

/// MongoDB-backed [`SnapshotStore`] implementation.
#[derive(Clone)]
pub struct MongoSnapshotStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Keeps the connection pool alive alongside the database handle.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSnapshotStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"persisted_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("snapshot_persisted_at_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SNAPSHOT_COLLECTION_NAME,
                index: "persisted_at",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoSnapshotDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoSnapshotDocument>(SNAPSHOT_COLLECTION_NAME)
    }

    async fn raw_collection(&self) -> Collection<Document> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<Document>(SNAPSHOT_COLLECTION_NAME)
    }

    async fn put(&self, snapshot: StoredSnapshot) -> MongoResult<()> {
        let room_code = snapshot.room_code.clone();
        let document: MongoSnapshotDocument = snapshot.into();
        let collection = self.collection().await;
        collection
            .replace_one(doc! {"_id": room_code.as_str()}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveSnapshot { room_code, source })?;

        Ok(())
    }

    /// List every snapshot row, skipping documents that do not have the expected shape.
    async fn get_all(&self) -> MongoResult<Vec<StoredSnapshot>> {
        let collection = self.raw_collection().await;

        let documents: Vec<Document> = collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListSnapshots { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListSnapshots { source })?;

        let mut rows = Vec::with_capacity(documents.len());
        for document in documents {
            match MongoSnapshotDocument::try_from(document) {
                Ok(document) => rows.push(document.into()),
                Err(err) => warn!(error = %err, "skipping malformed snapshot document"),
            }
        }
        Ok(rows)
    }

    async fn delete(&self, room_code: String) -> MongoResult<()> {
        let collection = self.collection().await;
        collection
            .delete_one(doc! {"_id": room_code.as_str()})
            .await
            .map_err(|source| MongoDaoError::DeleteSnapshot { room_code, source })?;
        Ok(())
    }
}

impl SnapshotStore for MongoSnapshotStore {
    fn put(&self, snapshot: StoredSnapshot) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.put(snapshot).await.map_err(Into::into) })
    }

    fn get_all(&self) -> BoxFuture<'static, StorageResult<Vec<StoredSnapshot>>> {
        let store = self.clone();
        Box::pin(async move { store.get_all().await.map_err(Into::into) })
    }

    fn delete(&self, room_code: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete(room_code).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
