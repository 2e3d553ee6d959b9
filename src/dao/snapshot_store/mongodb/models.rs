use mongodb::bson::{DateTime, Document};
use serde::{Deserialize, Serialize};

use super::error::MongoDaoError;
use crate::dao::models::StoredSnapshot;

/// One row of the `snapshots` collection, keyed by room code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSnapshotDocument {
    #[serde(rename = "_id")]
    room_code: String,
    payload: String,
    persisted_at: DateTime,
}

impl From<StoredSnapshot> for MongoSnapshotDocument {
    fn from(value: StoredSnapshot) -> Self {
        Self {
            room_code: value.room_code,
            payload: value.payload,
            persisted_at: DateTime::from_system_time(value.persisted_at),
        }
    }
}

impl From<MongoSnapshotDocument> for StoredSnapshot {
    fn from(value: MongoSnapshotDocument) -> Self {
        Self {
            room_code: value.room_code,
            payload: value.payload,
            persisted_at: value.persisted_at.to_system_time(),
        }
    }
}

impl TryFrom<Document> for MongoSnapshotDocument {
    type Error = MongoDaoError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        let malformed = |reason: String| MongoDaoError::MalformedSnapshot {
            id: document
                .get("_id")
                .map(ToString::to_string)
                .unwrap_or_else(|| "<missing>".into()),
            reason,
        };
        let room_code = document
            .get_str("_id")
            .map_err(|err| malformed(format!("_id: {err}")))?;
        let payload = document
            .get_str("payload")
            .map_err(|err| malformed(format!("payload: {err}")))?;
        let persisted_at = document
            .get_datetime("persisted_at")
            .map_err(|err| malformed(format!("persisted_at: {err}")))?;

        Ok(Self {
            room_code: room_code.to_owned(),
            payload: payload.to_owned(),
            persisted_at: *persisted_at,
        })
    }
}
