//! Business logic powering the admin REST routes.

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{ActionResponse, CloseRoomRequest, RoomListItem},
        validation::normalize_room_code,
    },
    error::GameError,
    state::{
        SharedState,
        session::{CloseReason, RemovalReason},
    },
};

/// Every live room.
pub async fn list_rooms(state: &SharedState) -> Vec<RoomListItem> {
    state.registry().list_rooms().await
}

/// Close a room on behalf of an administrator.
pub async fn close_room(
    state: &SharedState,
    code: &str,
    request: CloseRoomRequest,
) -> Result<ActionResponse, GameError> {
    let code = normalize_room_code(code);
    state
        .registry()
        .close_session(&code, CloseReason::Admin)
        .await?;
    info!(room = %code, note = request.note.as_deref().unwrap_or(""), "room closed by admin");
    Ok(ActionResponse {
        message: format!("room {code} closed"),
    })
}

/// Force a player out of a room.
pub async fn remove_player(
    state: &SharedState,
    code: &str,
    client_id: Uuid,
) -> Result<ActionResponse, GameError> {
    let code = normalize_room_code(code);
    state
        .registry()
        .remove_player(&code, client_id, RemovalReason::Kicked)
        .await?;
    Ok(ActionResponse {
        message: format!("player {client_id} removed from room {code}"),
    })
}
