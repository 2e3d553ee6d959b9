//! Persisted shape of a room.
//!
//! Snapshots never carry connection ids: every player comes back disconnected and must
//! reconnect. Team member lists are rebuilt from the players' team ids on restore.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::session::ScoringMode;

/// Opaque snapshot row as exchanged with a [`SnapshotStore`](crate::dao::snapshot_store::SnapshotStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    /// Room code, unique key of the row.
    pub room_code: String,
    /// JSON encoded [`SessionSnapshot`].
    pub payload: String,
    /// When the snapshot was taken.
    pub persisted_at: SystemTime,
}

/// Full durable state of one room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Room code.
    pub room_code: String,
    /// Host display name.
    pub host_name: String,
    /// Creation time.
    pub created_at: SystemTime,
    /// Last structural change.
    pub updated_at: SystemTime,
    /// Last room-scoped event.
    pub last_activity: SystemTime,
    /// Round settings.
    pub config: RoundConfigEntity,
    /// Teams in creation order.
    pub teams: Vec<TeamEntity>,
    /// Players in join order.
    pub players: Vec<PlayerEntity>,
    /// Current round, if any.
    #[serde(default)]
    pub round: Option<RoundEntity>,
    /// When the snapshot was taken; remaining round time is derived from it.
    pub persisted_at: SystemTime,
}

/// Persisted round settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundConfigEntity {
    pub target_score: u32,
    pub default_round_seconds: u32,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub custom_words: Vec<String>,
    #[serde(default)]
    pub scoring: ScoringMode,
}

/// Persisted team, without its member list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    pub id: String,
    pub name: String,
    pub color: String,
    pub score: u32,
}

/// Persisted player, without its connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    pub client_id: Uuid,
    pub name: String,
    pub team_id: String,
    pub joined_at: SystemTime,
}

/// Persisted round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    pub id: Uuid,
    pub team_id: String,
    pub active_party: Uuid,
    pub round_seconds: u32,
    pub seconds_left: u32,
    pub round_score: u32,
    pub started_at: SystemTime,
    pub active: bool,
    #[serde(default)]
    pub claims: Vec<TeamClaimsEntity>,
}

/// Words a team claimed in the persisted round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamClaimsEntity {
    pub team_id: String,
    pub words: Vec<String>,
}
