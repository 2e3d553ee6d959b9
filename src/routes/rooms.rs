use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::{session::SessionView, validation::normalize_room_code},
    error::AppError,
    state::SharedState,
};

/// Public read-only room endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/rooms/{code}", get(get_room))
}

#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code, case insensitive")),
    responses(
        (status = 200, description = "Full room state", body = SessionView),
        (status = 404, description = "Unknown room")
    )
)]
/// Return the full state of a live room.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let view = state
        .registry()
        .session_view(&normalize_room_code(&code))
        .await?;
    Ok(Json(view))
}
