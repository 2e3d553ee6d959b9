use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of live rooms.
    pub rooms: usize,
}

impl HealthResponse {
    /// Snapshots are being persisted.
    pub fn ok(rooms: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
        }
    }

    /// Snapshot persistence is unavailable; rooms keep running from memory.
    pub fn degraded(rooms: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            rooms,
        }
    }
}
