#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};

use uuid::Uuid;
use wordmania_back::{
    config::AppConfig,
    dao::snapshot_store::MemorySnapshotStore,
    dto::{
        session::{RoundResults, RoundView, SessionView},
        ws::{CreateRoomRequest, JoinRoomRequest, ServerMessage, StartRoundRequest},
    },
    services::{notifier::LogNotifier, word_source::WordBank},
    state::{
        clock::ManualClock,
        hub::Broadcaster,
        registry::{RegistryDeps, SessionRegistry},
        session::{ClientId, ConnectionId, ScoringMode},
        snapshot::SnapshotWriter,
        storage::StorageSlot,
    },
};

/// Start of the manual clock used by every harness.
pub fn epoch() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

/// Who a recorded message was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Room(String),
    Connection(ConnectionId),
}

/// Broadcaster that keeps every outbound message in memory.
#[derive(Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<(Target, ServerMessage)>>,
}

impl RecordingBroadcaster {
    pub fn messages(&self) -> Vec<(Target, ServerMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<RoundResults> {
        self.messages()
            .into_iter()
            .filter_map(|(_, message)| match message {
                ServerMessage::RoundFinished(results) => Some(results),
                _ => None,
            })
            .collect()
    }

    pub fn ticks(&self) -> Vec<u32> {
        self.messages()
            .into_iter()
            .filter_map(|(_, message)| match message {
                ServerMessage::RoundTick { seconds_left, .. } => Some(seconds_left),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, kind: fn(&ServerMessage) -> bool) -> usize {
        self.messages()
            .iter()
            .filter(|(_, message)| kind(message))
            .count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn send_to_room(&self, room: &str, message: &ServerMessage) {
        self.sent
            .lock()
            .unwrap()
            .push((Target::Room(room.to_string()), message.clone()));
    }

    fn send_to_connection(&self, connection: ConnectionId, message: &ServerMessage) {
        self.sent
            .lock()
            .unwrap()
            .push((Target::Connection(connection), message.clone()));
    }

    fn join_room(&self, _room: &str, _connection: ConnectionId) {}

    fn leave_room(&self, _room: &str, _connection: ConnectionId) {}

    fn close_room(&self, _room: &str) {}
}

/// A registry wired to in-memory collaborators.
pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub events: Arc<RecordingBroadcaster>,
    pub clock: Arc<ManualClock>,
    pub store: MemorySnapshotStore,
    pub storage: Arc<StorageSlot>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default(), MemorySnapshotStore::new()).await
    }

    pub async fn with_store(store: MemorySnapshotStore) -> Self {
        Self::with_config(AppConfig::default(), store).await
    }

    pub async fn with_config(config: AppConfig, store: MemorySnapshotStore) -> Self {
        let storage = Arc::new(StorageSlot::new());
        storage.install(Arc::new(store.clone())).await;
        let events = Arc::new(RecordingBroadcaster::default());
        let clock = Arc::new(ManualClock::new(epoch()));
        let registry = SessionRegistry::new(RegistryDeps {
            config: Arc::new(config),
            words: Arc::new(WordBank::default()),
            broadcaster: events.clone(),
            clock: clock.clone(),
            snapshots: SnapshotWriter::spawn(storage.clone()),
            notifier: Arc::new(LogNotifier),
        });

        Self {
            registry,
            events,
            clock,
            store,
            storage,
        }
    }

    /// Open a two-team room and return its code.
    pub async fn room(&self, scoring: ScoringMode) -> String {
        self.registry
            .create_session(
                CreateRoomRequest {
                    host_name: "Host".into(),
                    scoring,
                    ..Default::default()
                },
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap()
            .code
    }

    /// Join a connected player and return its client and connection ids.
    pub async fn join(&self, code: &str, name: &str, team: &str) -> (ClientId, ConnectionId) {
        let connection = Uuid::new_v4();
        let joined = self
            .registry
            .join_session(
                JoinRoomRequest {
                    room_code: code.to_string(),
                    player_name: name.to_string(),
                    team_id: Some(team.to_string()),
                },
                Some(connection),
            )
            .await
            .unwrap();
        (joined.client_id, connection)
    }

    pub async fn start(
        &self,
        code: &str,
        team: &str,
        explainer: Option<ClientId>,
        seconds: u32,
    ) -> RoundView {
        self.registry
            .start_round(StartRoundRequest {
                room_code: code.to_string(),
                team_id: Some(team.to_string()),
                explainer_client_id: explainer,
                duration_seconds: Some(seconds),
            })
            .await
            .unwrap()
    }

    pub async fn view(&self, code: &str) -> SessionView {
        self.registry.session_view(code).await.unwrap()
    }

    /// Wait until every queued snapshot write has reached the store.
    pub async fn settle(&self) {
        tokio::task::yield_now().await;
        self.registry.flush_snapshots().await.unwrap();
    }
}

/// Team membership and player team ids are mutual inverses.
pub fn assert_membership_consistent(view: &SessionView) {
    for player in &view.players {
        let team = view
            .teams
            .iter()
            .find(|team| team.id == player.team_id)
            .expect("player references a known team");
        assert!(team.players.contains(&player.client_id));
    }
    for team in &view.teams {
        for member in &team.players {
            let player = view
                .players
                .iter()
                .find(|player| player.client_id == *member)
                .expect("member is a known player");
            assert_eq!(player.team_id, team.id);
        }
    }
}

pub fn score_of(view: &SessionView, team: &str) -> u32 {
    view.teams
        .iter()
        .find(|candidate| candidate.id == team)
        .map(|team| team.score)
        .unwrap_or_default()
}
