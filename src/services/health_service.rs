use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the snapshot store and report the degraded flag with the live room count.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.storage().store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    let rooms = state.registry().room_count();
    if state.is_degraded() {
        HealthResponse::degraded(rooms)
    } else {
        HealthResponse::ok(rooms)
    }
}
