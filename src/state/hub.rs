use std::collections::HashSet;

use axum::extract::ws::{Message, Utf8Bytes};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{dto::ws::ServerMessage, state::session::ConnectionId};

/// Outbound side of the room fan-out used by the session registry.
pub trait Broadcaster: Send + Sync {
    /// Deliver `message` to every connection subscribed to `room`.
    fn send_to_room(&self, room: &str, message: &ServerMessage);
    /// Deliver `message` to one connection.
    fn send_to_connection(&self, connection: ConnectionId, message: &ServerMessage);
    /// Subscribe `connection` to `room`.
    fn join_room(&self, room: &str, connection: ConnectionId);
    /// Unsubscribe `connection` from `room`.
    fn leave_room(&self, room: &str, connection: ConnectionId);
    /// Drop every subscription to `room`.
    fn close_room(&self, room: &str);
}

/// Registry of live WebSocket writers and of their room subscriptions.
#[derive(Default)]
pub struct ConnectionHub {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    rooms: DashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionHub {
    /// Empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the writer channel of a freshly accepted socket.
    pub fn register(&self, connection: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.connections.insert(connection, tx);
    }

    /// Forget a socket and all of its subscriptions.
    pub fn unregister(&self, connection: ConnectionId) {
        self.connections.remove(&connection);
        self.rooms.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
    }

    /// Number of live sockets.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections currently subscribed to `room`.
    pub fn room_members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    fn deliver(&self, connection: ConnectionId, payload: Utf8Bytes, context: &'static str) {
        let Some(tx) = self.connections.get(&connection).map(|tx| tx.clone()) else {
            debug!(%connection, context, "dropping message for unknown connection");
            return;
        };

        if tx.send(Message::Text(payload)).is_err() {
            warn!(%connection, context, "websocket writer closed; dropping connection");
            self.unregister(connection);
        }
    }
}

/// Serialize a frame once so it can be fanned out to many sockets.
fn encode(message: &ServerMessage) -> Option<Utf8Bytes> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text.into()),
        Err(err) => {
            warn!(error = %err, "failed to serialize websocket payload");
            None
        }
    }
}

impl Broadcaster for ConnectionHub {
    fn send_to_room(&self, room: &str, message: &ServerMessage) {
        let Some(payload) = encode(message) else {
            return;
        };
        for connection in self.room_members(room) {
            self.deliver(connection, payload.clone(), "room broadcast");
        }
    }

    fn send_to_connection(&self, connection: ConnectionId, message: &ServerMessage) {
        if let Some(payload) = encode(message) {
            self.deliver(connection, payload, "direct message");
        }
    }

    fn join_room(&self, room: &str, connection: ConnectionId) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection);
    }

    fn leave_room(&self, room: &str, connection: ConnectionId) {
        self.rooms.remove_if_mut(room, |_, members| {
            members.remove(&connection);
            members.is_empty()
        });
    }

    fn close_room(&self, room: &str) {
        self.rooms.remove(room);
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn tick(seconds_left: u32) -> ServerMessage {
        ServerMessage::RoundTick {
            room_code: "ABCD".into(),
            seconds_left,
        }
    }

    #[tokio::test]
    async fn room_broadcast_reaches_only_subscribers() {
        let hub = ConnectionHub::new();
        let (member_tx, mut member_rx) = mpsc::unbounded_channel();
        let (other_tx, mut other_rx) = mpsc::unbounded_channel();
        let member = Uuid::new_v4();
        let other = Uuid::new_v4();
        hub.register(member, member_tx);
        hub.register(other, other_tx);
        hub.join_room("ABCD", member);

        hub.send_to_room("ABCD", &tick(4));

        match member_rx.recv().await {
            Some(Message::Text(text)) => assert!(text.as_str().contains("\"seconds_left\":4")),
            other => panic!("unexpected frame {other:?}"),
        }
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_writers_are_pruned() {
        let hub = ConnectionHub::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Uuid::new_v4();
        hub.register(connection, tx);
        hub.join_room("ABCD", connection);
        drop(rx);

        hub.send_to_room("ABCD", &tick(1));
        assert_eq!(hub.connection_count(), 0);
        assert!(hub.room_members("ABCD").is_empty());
    }

    #[test]
    fn leaving_the_last_member_drops_the_room() {
        let hub = ConnectionHub::new();
        let connection = Uuid::new_v4();
        hub.join_room("ABCD", connection);
        hub.leave_room("ABCD", connection);
        assert!(hub.room_members("ABCD").is_empty());
        assert!(hub.rooms.is_empty());
    }
}
