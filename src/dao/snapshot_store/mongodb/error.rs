use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures of the MongoDB snapshot backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save snapshot of room `{room_code}`")]
    SaveSnapshot {
        room_code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete snapshot of room `{room_code}`")]
    DeleteSnapshot {
        room_code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list snapshots")]
    ListSnapshots {
        #[source]
        source: MongoError,
    },
    #[error("snapshot document {id} is malformed: {reason}")]
    MalformedSnapshot { id: String, reason: String },
}
