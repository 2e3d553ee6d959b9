//! Routing of inbound WebSocket operations to the session registry.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    dto::{
        session::{ScoreResponse, SubmitWordResponse, WordResponse},
        ws::{ClientMessage, InboundEnvelope, ServerMessage},
    },
    error::GameError,
    state::{
        SharedState,
        session::{CloseReason, ConnectionId, RemovalReason},
    },
};

/// Run one inbound operation for `connection` and build its reply frame.
pub async fn handle_message(
    state: &SharedState,
    connection: ConnectionId,
    envelope: InboundEnvelope,
) -> ServerMessage {
    let request_id = envelope.request_id;
    let kind = envelope.message.kind();
    match dispatch(state, connection, envelope.message).await {
        Ok(data) => ServerMessage::reply_ok(request_id, data),
        Err(err) => {
            debug!(%connection, kind, code = err.code(), error = %err, "operation rejected");
            ServerMessage::reply_err(request_id, &err)
        }
    }
}

async fn dispatch(
    state: &SharedState,
    connection: ConnectionId,
    message: ClientMessage,
) -> Result<Value, GameError> {
    message.validate()?;
    let registry = state.registry();

    let data = match message {
        ClientMessage::CreateRoom(request) => {
            to_value(&registry.create_session(request, Some(connection)).await?)
        }
        ClientMessage::JoinRoom(request) => {
            to_value(&registry.join_session(request, Some(connection)).await?)
        }
        ClientMessage::ReconnectHost(request) => {
            to_value(&registry.reconnect_host(&request.room_code, connection).await?)
        }
        ClientMessage::ReconnectPlayer(request) => to_value(
            &registry
                .reconnect_player(&request.room_code, request.client_id, connection)
                .await?,
        ),
        ClientMessage::GetState(request) => {
            to_value(&registry.session_view(&request.room_code).await?)
        }
        ClientMessage::StartRound(request) => to_value(&registry.start_round(request).await?),
        ClientMessage::ChangeRoundScore(request) => {
            let score = registry.change_round_score(request).await?;
            to_value(&ScoreResponse {
                team_id: None,
                score,
            })
        }
        ClientMessage::AdjustTeamScore(request) => {
            let team_id = request.team_id.clone();
            let score = registry.adjust_team_score(request).await?;
            to_value(&ScoreResponse {
                team_id: Some(team_id),
                score,
            })
        }
        ClientMessage::SubmitWord(request) => {
            let (word, accepted) = registry
                .submit_word(&request.room_code, connection, &request.word)
                .await?;
            to_value(&SubmitWordResponse { word, accepted })
        }
        ClientMessage::FinalizeRound(request) => {
            to_value(&registry.finalize_round(request).await?)
        }
        ClientMessage::EndRound(request) => to_value(&registry.end_round(&request.room_code).await?),
        ClientMessage::EndGame(request) => {
            registry
                .close_session(&request.room_code, CloseReason::Ended)
                .await?;
            Value::Null
        }
        ClientMessage::RemovePlayer(request) => {
            registry
                .remove_player(&request.room_code, request.client_id, RemovalReason::Kicked)
                .await?;
            Value::Null
        }
        ClientMessage::RequestNextWord(request) => {
            let word = registry.next_word(&request.room_code).await?;
            to_value(&WordResponse {
                word: word.text,
                category: word.category,
            })
        }
    };

    Ok(data)
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        warn!(error = %err, "failed to serialize reply payload");
        Value::Null
    })
}
