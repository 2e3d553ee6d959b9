use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{InboundEnvelope, ServerMessage},
    error::GameError,
    services::room_service,
    state::{SharedState, hub::Broadcaster},
};

/// Handle the full lifecycle of one host or player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    state.hub().register(connection_id, outbound_tx.clone());
    info!(%connection_id, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(%connection_id, payload = %text.as_str(), "received client message");
                let reply = match parse_envelope(text.as_str()) {
                    Ok(envelope) => {
                        room_service::handle_message(&state, connection_id, envelope).await
                    }
                    Err((request_id, err)) => {
                        warn!(%connection_id, error = %err, "rejecting malformed client message");
                        ServerMessage::reply_err(request_id, &err)
                    }
                };
                state.hub().send_to_connection(connection_id, &reply);
            }
            Ok(Message::Ping(payload)) => {
                if outbound_tx.send(Message::Pong(payload)).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                warn!(%connection_id, "ignoring binary frame");
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket receive error");
                break;
            }
        }
    }

    state.hub().unregister(connection_id);
    state.registry().disconnect(connection_id).await;
    info!(%connection_id, "client disconnected");
    finalize(writer_task, outbound_tx).await;
}

/// Decode an inbound frame, keeping its `request_id` when only the operation is invalid.
fn parse_envelope(text: &str) -> Result<InboundEnvelope, (Option<u64>, GameError)> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| (None, GameError::InvalidInput(format!("malformed JSON: {err}"))))?;
    let request_id = value.get("request_id").and_then(Value::as_u64);
    serde_json::from_value(value).map_err(|err| {
        (
            request_id,
            GameError::InvalidInput(format!("unsupported message: {err}")),
        )
    })
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_frames_keep_their_request_id() {
        let (request_id, err) =
            parse_envelope(r#"{ "type": "teleport", "request_id": 12 }"#).unwrap_err();
        assert_eq!(request_id, Some(12));
        assert!(matches!(err, GameError::InvalidInput(_)));

        let (request_id, _) = parse_envelope("not json").unwrap_err();
        assert!(request_id.is_none());
    }

    #[test]
    fn well_formed_frames_parse() {
        let envelope = parse_envelope(r#"{ "type": "get_state", "room_code": "AB3D" }"#).unwrap();
        assert!(envelope.request_id.is_none());
        assert_eq!(envelope.message.kind(), "get_state");
    }
}
