use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::state::round::InvalidTransition;

/// Failures returned by room-scoped operations of the session registry.
///
/// Every variant carries a stable machine readable [`code`](GameError::code) and renders a
/// user-facing message through [`std::fmt::Display`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// No live room matches the provided code.
    #[error("room `{0}` was not found")]
    RoomNotFound(String),
    /// The room has no team with this identifier.
    #[error("team `{0}` was not found")]
    TeamNotFound(String),
    /// The room has no player with this client id (or connection).
    #[error("player `{0}` was not found")]
    PlayerNotFound(String),
    /// A round cannot start because the target team has no connected member.
    #[error("team `{0}` has no connected players")]
    NoEligiblePlayers(String),
    /// Score or word operations were attempted outside an active round.
    #[error("there is no active round")]
    NoActiveRound,
    /// The finished round is still waiting for the host to judge it.
    #[error("the current round is awaiting review")]
    RoundInReview,
    /// Empty or malformed player/host display name.
    #[error("invalid name: {0}")]
    InvalidName(String),
    /// Any other malformed payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The word source has nothing left to offer.
    #[error("no words available for this room")]
    NoWordsAvailable,
    /// The round state machine refused the requested transition.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl GameError {
    /// Stable tag sent to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "room_not_found",
            GameError::TeamNotFound(_) => "team_not_found",
            GameError::PlayerNotFound(_) => "player_not_found",
            GameError::NoEligiblePlayers(_) => "no_eligible_players",
            GameError::NoActiveRound => "no_active_round",
            GameError::RoundInReview => "round_in_review",
            GameError::InvalidName(_) => "invalid_name",
            GameError::InvalidInput(_) => "invalid_input",
            GameError::NoWordsAvailable => "no_words_available",
            GameError::InvalidTransition(_) => "invalid_transition",
        }
    }
}

impl From<ValidationErrors> for GameError {
    fn from(err: ValidationErrors) -> Self {
        let name_field = err
            .field_errors()
            .keys()
            .any(|field| field.ends_with("name"));
        if name_field {
            GameError::InvalidName(err.to_string())
        } else {
            GameError::InvalidInput(err.to_string())
        }
    }
}

/// Tagged failure body sent back to WebSocket and HTTP clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine readable error tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human readable description.
    pub message: String,
}

impl From<&GameError> for ErrorBody {
    fn from(err: &GameError) -> Self {
        Self {
            code: Some(err.code().to_string()),
            message: err.to_string(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::RoomNotFound(_)
            | GameError::TeamNotFound(_)
            | GameError::PlayerNotFound(_) => AppError::NotFound(err.to_string()),
            GameError::InvalidName(_) | GameError::InvalidInput(_) => {
                AppError::BadRequest(err.to_string())
            }
            GameError::NoEligiblePlayers(_)
            | GameError::NoActiveRound
            | GameError::RoundInReview
            | GameError::NoWordsAvailable
            | GameError::InvalidTransition(_) => AppError::Conflict(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            code: None,
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
