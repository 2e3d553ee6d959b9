use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::admin::{ActionResponse, CloseRoomRequest, RoomListItem},
    error::AppError,
    services::admin_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only room management endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/rooms", get(list_rooms))
        .route("/admin/rooms/{code}/close", post(close_room))
        .route(
            "/admin/rooms/{code}/players/{client_id}",
            delete(remove_player),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// List every live room with its teams and player counts.
#[utoipa::path(
    get,
    path = "/admin/rooms",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token")),
    responses((status = 200, description = "Live rooms", body = [RoomListItem]))
)]
pub async fn list_rooms(State(state): State<SharedState>) -> Json<Vec<RoomListItem>> {
    Json(admin_service::list_rooms(&state).await)
}

/// Close a room; connected clients receive `game_ended`.
#[utoipa::path(
    post,
    path = "/admin/rooms/{code}/close",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token"),
    ("code" = String, Path, description = "Room code to close")),
    request_body = CloseRoomRequest,
    responses(
        (status = 200, description = "Room closed", body = ActionResponse),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn close_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<CloseRoomRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::close_room(&state, &code, payload).await?))
}

/// Kick a player out of a room.
#[utoipa::path(
    delete,
    path = "/admin/rooms/{code}/players/{client_id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token"),
    ("code" = String, Path, description = "Room code"),
    ("client_id" = Uuid, Path, description = "Client id of the player to remove")),
    responses(
        (status = 200, description = "Player removed", body = ActionResponse),
        (status = 404, description = "Unknown room or player")
    )
)]
pub async fn remove_player(
    State(state): State<SharedState>,
    Path((code, client_id)): Path<(String, Uuid)>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        admin_service::remove_player(&state, &code, client_id).await?,
    ))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_token.as_deref() {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "admin API disabled: no admin token configured".into(),
        )),
    }
}
