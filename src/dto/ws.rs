//! Frames exchanged over the game WebSocket.
//!
//! Every inbound frame is a JSON object tagged by `type`, optionally carrying a
//! client-chosen `request_id` that is echoed in the matching [`ServerMessage::Reply`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        session::{RoundResults, RoundView, SessionView},
        validation::{validate_display_name, validate_room_code},
    },
    error::{ErrorBody, GameError},
    state::{
        round::FinishReason,
        session::{CloseReason, ScoringMode, TeamId},
    },
};

/// Inbound frame: a [`ClientMessage`] plus its correlation id.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    /// Echoed back in the reply.
    #[serde(default)]
    pub request_id: Option<u64>,
    /// The operation.
    #[serde(flatten)]
    pub message: ClientMessage,
}

/// Operations accepted from host and player clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new room; the sender becomes its host.
    CreateRoom(CreateRoomRequest),
    /// Join a room as a player.
    JoinRoom(JoinRoomRequest),
    /// Re-attach the sender as the host of a room.
    ReconnectHost(RoomRef),
    /// Re-attach the sender to a known player.
    ReconnectPlayer(ReconnectPlayerRequest),
    /// Ask for a fresh game state.
    GetState(RoomRef),
    /// Start a round.
    StartRound(StartRoundRequest),
    /// Adjust the live round score (accumulator mode).
    ChangeRoundScore(RoundScoreRequest),
    /// Correct a team's cumulative score.
    AdjustTeamScore(TeamScoreRequest),
    /// Claim a word for the sender's team (uniqueness modes).
    SubmitWord(SubmitWordRequest),
    /// Commit a reviewed round with the approved words.
    FinalizeRound(FinalizeRoundRequest),
    /// End the current round early.
    EndRound(RoomRef),
    /// Close the room for everyone.
    EndGame(RoomRef),
    /// Remove a player from the room.
    RemovePlayer(RemovePlayerRequest),
    /// Draw the next word for the active party.
    RequestNextWord(RoomRef),
}

impl ClientMessage {
    /// Stable operation name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::CreateRoom(_) => "create_room",
            ClientMessage::JoinRoom(_) => "join_room",
            ClientMessage::ReconnectHost(_) => "reconnect_host",
            ClientMessage::ReconnectPlayer(_) => "reconnect_player",
            ClientMessage::GetState(_) => "get_state",
            ClientMessage::StartRound(_) => "start_round",
            ClientMessage::ChangeRoundScore(_) => "change_round_score",
            ClientMessage::AdjustTeamScore(_) => "adjust_team_score",
            ClientMessage::SubmitWord(_) => "submit_word",
            ClientMessage::FinalizeRound(_) => "finalize_round",
            ClientMessage::EndRound(_) => "end_round",
            ClientMessage::EndGame(_) => "end_game",
            ClientMessage::RemovePlayer(_) => "remove_player",
            ClientMessage::RequestNextWord(_) => "request_next_word",
        }
    }

    /// Run the payload's field validation.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            ClientMessage::CreateRoom(request) => request.validate(),
            ClientMessage::JoinRoom(request) => request.validate(),
            ClientMessage::ReconnectPlayer(request) => request.validate(),
            ClientMessage::StartRound(request) => request.validate(),
            ClientMessage::ChangeRoundScore(request) => request.validate(),
            ClientMessage::AdjustTeamScore(request) => request.validate(),
            ClientMessage::SubmitWord(request) => request.validate(),
            ClientMessage::FinalizeRound(request) => request.validate(),
            ClientMessage::RemovePlayer(request) => request.validate(),
            ClientMessage::ReconnectHost(request)
            | ClientMessage::GetState(request)
            | ClientMessage::EndRound(request)
            | ClientMessage::EndGame(request)
            | ClientMessage::RequestNextWord(request) => request.validate(),
        }
    }
}

/// Payload naming only a room.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RoomRef {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
}

/// Room creation options; everything but the host name is optional.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub host_name: String,
    #[serde(default)]
    #[validate(range(min = 1, max = 26))]
    pub team_count: Option<u32>,
    /// Custom names keyed by team id.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub team_names: IndexMap<TeamId, String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 10000))]
    pub target_score: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 1, max = 3600))]
    pub round_seconds: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub custom_words: Vec<String>,
    #[serde(default)]
    pub scoring: ScoringMode,
}

/// Player join request.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    #[validate(custom(function = "validate_display_name"))]
    pub player_name: String,
    /// Preferred team; the first team is used when missing or unknown.
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

/// Player reconnect request.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ReconnectPlayerRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    pub client_id: Uuid,
}

/// Round start request.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct StartRoundRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    /// Team to play; the first team with a connected member when missing.
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Explainer; a random connected member of the team when missing.
    #[serde(default)]
    pub explainer_client_id: Option<Uuid>,
    #[serde(default)]
    #[validate(range(min = 1, max = 3600))]
    pub duration_seconds: Option<u32>,
}

/// Live round score adjustment.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RoundScoreRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    #[validate(range(min = -1000, max = 1000))]
    pub delta: i32,
}

/// Cumulative team score correction.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct TeamScoreRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    pub team_id: TeamId,
    #[validate(range(min = -1000, max = 1000))]
    pub delta: i32,
}

/// Word claim.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SubmitWordRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    #[validate(length(min = 1, max = 64))]
    pub word: String,
}

/// Host judgement of a reviewed round.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct FinalizeRoundRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    /// Approved words keyed by team id; missing teams approve nothing.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub approved_words_by_team: IndexMap<TeamId, Vec<String>>,
}

/// Player removal request.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RemovePlayerRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    pub client_id: Uuid,
}

/// Frames pushed to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Answer to one inbound frame.
    Reply {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<u64>,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },
    /// Full room state after a mutation.
    GameState {
        session: SessionView,
    },
    /// A round started.
    RoundStarted {
        room_code: String,
        round: RoundView,
    },
    /// One countdown second elapsed.
    RoundTick {
        room_code: String,
        seconds_left: u32,
    },
    /// The live round score changed.
    RoundScoreUpdated {
        room_code: String,
        round_score: u32,
    },
    /// A round was committed.
    RoundFinished(RoundResults),
    /// The countdown of a round reached zero.
    RoundTimeUp {
        room_code: String,
        team_id: TeamId,
        team_name: String,
        round_score: u32,
    },
    /// A word claim was accepted for the recipient's team.
    WordAccepted {
        room_code: String,
        team_id: TeamId,
        word: String,
    },
    /// The recipient was removed from the room.
    RemovedFromRoom {
        room_code: String,
        reason: String,
    },
    /// The room was closed.
    GameEnded {
        room_code: String,
        reason: CloseReason,
    },
}

impl ServerMessage {
    /// Successful reply carrying `data`.
    pub fn reply_ok(request_id: Option<u64>, data: Value) -> Self {
        ServerMessage::Reply {
            request_id,
            ok: true,
            data: (!data.is_null()).then_some(data),
            error: None,
        }
    }

    /// Failed reply carrying the tagged error.
    pub fn reply_err(request_id: Option<u64>, err: &GameError) -> Self {
        ServerMessage::Reply {
            request_id,
            ok: false,
            data: None,
            error: Some(ErrorBody::from(err)),
        }
    }

    /// Finish reason of a committed round, if this is a round result.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        match self {
            ServerMessage::RoundFinished(results) => Some(results.reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn inbound_frames_are_tagged_by_type() {
        let envelope: InboundEnvelope = serde_json::from_value(json!({
            "type": "join_room",
            "request_id": 7,
            "room_code": "ab3d",
            "player_name": "Dana",
        }))
        .unwrap();

        assert_eq!(envelope.request_id, Some(7));
        match envelope.message {
            ClientMessage::JoinRoom(request) => {
                assert_eq!(request.player_name, "Dana");
                assert!(request.team_id.is_none());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn unknown_types_are_rejected() {
        let parsed = serde_json::from_value::<InboundEnvelope>(json!({ "type": "dance" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn blank_player_name_fails_validation_as_name_error() {
        let message = ClientMessage::JoinRoom(JoinRoomRequest {
            room_code: "AB3D".into(),
            player_name: "  ".into(),
            team_id: None,
        });
        let err: GameError = message.validate().unwrap_err().into();
        assert!(matches!(err, GameError::InvalidName(_)));
    }

    #[test]
    fn replies_serialize_flat() {
        let reply = ServerMessage::reply_err(Some(3), &GameError::NoActiveRound);
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["type"], "reply");
        assert_eq!(value["request_id"], 3);
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["code"], "no_active_round");

        let tick = ServerMessage::RoundTick {
            room_code: "AB3D".into(),
            seconds_left: 4,
        };
        let value = serde_json::to_value(&tick).unwrap();
        assert_eq!(value, json!({ "type": "round_tick", "room_code": "AB3D", "seconds_left": 4 }));
    }
}
