//! Client-facing projections of a room.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        round::{FinishReason, RoundPhase},
        session::{Round, ScoringMode, Session, Team, TeamId},
    },
};

/// Round phase as shown to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoundPhase {
    /// Lobby, no round running.
    Idle,
    /// A round is being played.
    Active,
    /// The round is over and awaits the host's judgement.
    Reviewing,
}

impl From<RoundPhase> for VisibleRoundPhase {
    fn from(value: RoundPhase) -> Self {
        match value {
            RoundPhase::Idle | RoundPhase::Finished(_) => VisibleRoundPhase::Idle,
            RoundPhase::Active => VisibleRoundPhase::Active,
            RoundPhase::Reviewing => VisibleRoundPhase::Reviewing,
        }
    }
}

/// Team as broadcast in game state updates.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct TeamView {
    pub id: TeamId,
    pub name: String,
    pub color: String,
    pub score: u32,
    /// Member client ids in join order.
    pub players: Vec<Uuid>,
}

impl From<&Team> for TeamView {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id.clone(),
            name: team.name.clone(),
            color: team.color.clone(),
            score: team.score,
            players: team.members.iter().copied().collect(),
        }
    }
}

/// Player as broadcast in game state updates.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct PlayerView {
    pub client_id: Uuid,
    pub name: String,
    pub team_id: TeamId,
    /// Whether the player currently has a live connection.
    pub connected: bool,
    pub joined_at: String,
}

/// Words one team claimed during the current round.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct TeamClaimsView {
    pub team_id: TeamId,
    pub words: Vec<String>,
}

/// Public view of the current round.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct RoundView {
    pub round_id: Uuid,
    pub team_id: TeamId,
    pub explainer_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explainer_name: Option<String>,
    pub round_seconds: u32,
    pub seconds_left: u32,
    pub round_score: u32,
    pub started_at: String,
    /// `false` while the round waits for judging.
    pub active: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub claims: Vec<TeamClaimsView>,
}

impl RoundView {
    /// Project `round` using `session` to resolve the explainer's name.
    pub fn new(session: &Session, round: &Round) -> Self {
        Self {
            round_id: round.id,
            team_id: round.team_id.clone(),
            explainer_id: round.active_party,
            explainer_name: session
                .players
                .get(&round.active_party)
                .map(|player| player.name.clone()),
            round_seconds: round.round_seconds,
            seconds_left: round.seconds_left,
            round_score: round.round_score,
            started_at: format_system_time(round.started_at),
            active: round.active,
            claims: round
                .claims
                .iter()
                .map(|(team_id, words)| TeamClaimsView {
                    team_id: team_id.clone(),
                    words: words.iter().cloned().collect(),
                })
                .collect(),
        }
    }
}

/// Full room state pushed to every subscriber after each mutation.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct SessionView {
    pub code: String,
    pub host_name: String,
    pub host_connected: bool,
    pub target_score: u32,
    pub default_round_seconds: u32,
    pub scoring: ScoringMode,
    pub categories: Vec<String>,
    pub phase: VisibleRoundPhase,
    pub teams: Vec<TeamView>,
    pub players: Vec<PlayerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundView>,
    /// True when a team reached the target score.
    pub target_reached: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            code: session.code.clone(),
            host_name: session.host.name.clone(),
            host_connected: session.host.connection.is_some(),
            target_score: session.config.target_score,
            default_round_seconds: session.config.default_round_seconds,
            scoring: session.config.scoring,
            categories: session.config.categories.clone(),
            phase: session.phase().into(),
            teams: session.teams.values().map(TeamView::from).collect(),
            players: session
                .players
                .values()
                .map(|player| PlayerView {
                    client_id: player.client_id,
                    name: player.name.clone(),
                    team_id: player.team_id.clone(),
                    connected: player.connection.is_some(),
                    joined_at: format_system_time(player.joined_at),
                })
                .collect(),
            round: session
                .round
                .as_ref()
                .map(|round| RoundView::new(session, round)),
            target_reached: session.target_reached(),
            created_at: format_system_time(session.created_at),
            updated_at: format_system_time(session.updated_at),
        }
    }
}

/// Points a team earned in a committed round.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct TeamRoundResult {
    pub team_id: TeamId,
    pub name: String,
    pub color: String,
    pub round_points: u32,
    pub total_score: u32,
}

/// Outcome of a committed round.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct RoundResults {
    pub room_code: String,
    pub reason: FinishReason,
    /// Team that owned the round.
    pub team_id: TeamId,
    /// Points credited to the owning team.
    pub round_score: u32,
    /// Owning team's cumulative score after the commit.
    pub total_score: u32,
    /// Per-team breakdown; a single entry in accumulator mode.
    pub results: Vec<TeamRoundResult>,
    pub target_reached: bool,
}

/// Reply to a successful join or player reconnect.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct JoinResponse {
    pub client_id: Uuid,
    pub team_id: TeamId,
    pub session: SessionView,
}

/// A word drawn for the active party.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct WordResponse {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Reply to a word claim.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct SubmitWordResponse {
    /// Normalized word.
    pub word: String,
    /// `false` when the team had already claimed it.
    pub accepted: bool,
}

/// Reply carrying an updated score.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct ScoreResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    pub score: u32,
}
