use std::time::SystemTime;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::GameError, state::round::RoundPhase};

/// Stable per-player identity, kept across reconnects.
pub type ClientId = Uuid;
/// Transient identity of one WebSocket connection.
pub type ConnectionId = Uuid;
/// Short team key (`A`, `B`, ...).
pub type TeamId = String;

/// How rounds are scored in a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// The host adjusts a live round score that is credited to the playing team.
    #[default]
    Accumulator,
    /// Teams claim words live; only words claimed by a single team score.
    Uniqueness,
    /// Like [`ScoringMode::Uniqueness`] but the host approves each team's words first.
    JudgedUniqueness,
}

impl ScoringMode {
    /// Whether players claim words during rounds.
    pub fn claims_words(self) -> bool {
        !matches!(self, ScoringMode::Accumulator)
    }
}

/// Why a room was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The host ended the game.
    Ended,
    /// An administrator closed the room.
    Admin,
    /// The room was idle for too long.
    Expired,
}

/// Why a player left a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The host or an administrator removed the player.
    Kicked,
    /// The player's connection dropped.
    Disconnected,
}

/// Per-room round settings chosen at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundConfig {
    /// Score a team needs to win the game.
    pub target_score: u32,
    /// Round duration used when start-round does not supply one.
    pub default_round_seconds: u32,
    /// Word bank categories to draw from (empty means all).
    pub categories: Vec<String>,
    /// Room specific words that replace the word bank when non-empty.
    pub custom_words: Vec<String>,
    /// Scoring variant.
    pub scoring: ScoringMode,
}

/// The host of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Display name.
    pub name: String,
    /// Current connection, `None` while disconnected.
    pub connection: Option<ConnectionId>,
}

/// A team competing in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Team key.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Cosmetic color (CSS hex).
    pub color: String,
    /// Cumulative score.
    pub score: u32,
    /// Member client ids in join order.
    pub members: IndexSet<ClientId>,
}

/// A player known to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable client id.
    pub client_id: ClientId,
    /// Display name.
    pub name: String,
    /// Team the player belongs to.
    pub team_id: TeamId,
    /// Current connection, `None` while disconnected.
    pub connection: Option<ConnectionId>,
    /// When the player joined the room.
    pub joined_at: SystemTime,
}

/// The round currently played in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// Unique id, used to tell stale timer ticks apart.
    pub id: Uuid,
    /// Team owning the round.
    pub team_id: TeamId,
    /// Player explaining/guessing this round.
    pub active_party: ClientId,
    /// Total duration in seconds.
    pub round_seconds: u32,
    /// Countdown.
    pub seconds_left: u32,
    /// Live accumulated score (accumulator mode).
    pub round_score: u32,
    /// When the round started.
    pub started_at: SystemTime,
    /// `false` once the countdown stopped and the round awaits judging.
    pub active: bool,
    /// Normalized words claimed per team (uniqueness modes).
    pub claims: IndexMap<TeamId, IndexSet<String>>,
}

/// One live game room.
#[derive(Debug, Clone)]
pub struct Session {
    /// Room code.
    pub code: String,
    /// Room host.
    pub host: Host,
    /// Creation time.
    pub created_at: SystemTime,
    /// Last structural change.
    pub updated_at: SystemTime,
    /// Last room-scoped event, drives the inactivity sweep.
    pub last_activity: SystemTime,
    /// Round settings.
    pub config: RoundConfig,
    /// Teams in creation order.
    pub teams: IndexMap<TeamId, Team>,
    /// Players in join order.
    pub players: IndexMap<ClientId, Player>,
    /// Current round, if any.
    pub round: Option<Round>,
    /// Set when the room was torn down while another task waited for it.
    pub closed: bool,
}

impl Session {
    /// Build an empty room.
    pub fn new(
        code: String,
        host: Host,
        config: RoundConfig,
        teams: Vec<Team>,
        now: SystemTime,
    ) -> Self {
        Self {
            code,
            host,
            created_at: now,
            updated_at: now,
            last_activity: now,
            config,
            teams: teams.into_iter().map(|team| (team.id.clone(), team)).collect(),
            players: IndexMap::new(),
            round: None,
            closed: false,
        }
    }

    /// Current round phase derived from the round slot.
    pub fn phase(&self) -> RoundPhase {
        match &self.round {
            None => RoundPhase::Idle,
            Some(round) if round.active => RoundPhase::Active,
            Some(_) => RoundPhase::Reviewing,
        }
    }

    /// Record activity on the room.
    pub fn touch(&mut self, now: SystemTime) {
        self.last_activity = now;
        self.updated_at = now;
    }

    /// Resolve a join request: the requested team when it exists, otherwise the first team.
    pub fn resolve_join_team(&self, requested: Option<&str>) -> Result<TeamId, GameError> {
        if let Some(requested) = requested.map(str::trim).filter(|id| !id.is_empty()) {
            if self.teams.contains_key(requested) {
                return Ok(requested.to_string());
            }
        }

        self.teams
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| GameError::TeamNotFound(requested.unwrap_or_default().to_string()))
    }

    /// Add a player and its team membership in one step.
    pub fn add_player(&mut self, player: Player) -> Result<(), GameError> {
        let team = self
            .teams
            .get_mut(&player.team_id)
            .ok_or_else(|| GameError::TeamNotFound(player.team_id.clone()))?;
        team.members.insert(player.client_id);
        self.players.insert(player.client_id, player);
        Ok(())
    }

    /// Remove a player together with its team membership.
    pub fn remove_player(&mut self, client_id: &ClientId) -> Option<Player> {
        let player = self.players.shift_remove(client_id)?;
        if let Some(team) = self.teams.get_mut(&player.team_id) {
            team.members.shift_remove(client_id);
        }
        Some(player)
    }

    /// Find the player bound to `connection`.
    pub fn player_by_connection(&self, connection: ConnectionId) -> Option<&Player> {
        self.players
            .values()
            .find(|player| player.connection == Some(connection))
    }

    /// Members of `team_id` that currently have a connection.
    pub fn connected_members(&self, team_id: &str) -> Vec<ClientId> {
        let Some(team) = self.teams.get(team_id) else {
            return Vec::new();
        };

        team.members
            .iter()
            .filter(|client_id| {
                self.players
                    .get(*client_id)
                    .is_some_and(|player| player.connection.is_some())
            })
            .copied()
            .collect()
    }

    /// Connections of the members of `team_id`.
    pub fn team_connections(&self, team_id: &str) -> Vec<ConnectionId> {
        self.teams
            .get(team_id)
            .map(|team| {
                team.members
                    .iter()
                    .filter_map(|client_id| self.players.get(client_id))
                    .filter_map(|player| player.connection)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check that team member lists are exactly the inverse of player team ids.
    pub fn membership_is_consistent(&self) -> bool {
        let players_ok = self.players.values().all(|player| {
            self.teams
                .get(&player.team_id)
                .is_some_and(|team| team.members.contains(&player.client_id))
        });
        let teams_ok = self.teams.values().all(|team| {
            team.members.iter().all(|client_id| {
                self.players
                    .get(client_id)
                    .is_some_and(|player| player.team_id == team.id)
            })
        });
        players_ok && teams_ok
    }

    /// Whether any team reached the room's target score.
    pub fn target_reached(&self) -> bool {
        self.config.target_score > 0
            && self
                .teams
                .values()
                .any(|team| team.score >= self.config.target_score)
    }
}
