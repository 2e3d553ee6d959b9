//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::session::{Session, TeamId},
};

/// Per-team line of a listed room.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomTeamSummary {
    pub team_id: TeamId,
    pub name: String,
    pub score: u32,
    pub player_count: usize,
}

/// Projection of a room when listed for administrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomListItem {
    pub code: String,
    pub host_name: String,
    pub host_connected: bool,
    pub player_count: usize,
    pub connected_players: usize,
    pub round_active: bool,
    pub teams: Vec<RoomTeamSummary>,
    pub created_at: String,
    pub last_activity: String,
}

impl From<&Session> for RoomListItem {
    fn from(session: &Session) -> Self {
        Self {
            code: session.code.clone(),
            host_name: session.host.name.clone(),
            host_connected: session.host.connection.is_some(),
            player_count: session.players.len(),
            connected_players: session
                .players
                .values()
                .filter(|player| player.connection.is_some())
                .count(),
            round_active: session.round.as_ref().is_some_and(|round| round.active),
            teams: session
                .teams
                .values()
                .map(|team| RoomTeamSummary {
                    team_id: team.id.clone(),
                    name: team.name.clone(),
                    score: team.score,
                    player_count: team.members.len(),
                })
                .collect(),
            created_at: format_system_time(session.created_at),
            last_activity: format_system_time(session.last_activity),
        }
    }
}

/// Optional note attached to an administrative room closure.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CloseRoomRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub note: Option<String>,
}

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}
