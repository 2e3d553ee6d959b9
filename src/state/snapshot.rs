//! Conversion between live rooms and their persisted snapshots, plus the background writer.

use std::{sync::Arc, time::SystemTime};

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            PlayerEntity, RoundConfigEntity, RoundEntity, SessionSnapshot, StoredSnapshot,
            TeamClaimsEntity, TeamEntity,
        },
        snapshot_store::SnapshotStore,
        storage::{StorageError, StorageResult},
    },
    state::{
        scoring::claim_set,
        session::{Host, Player, Round, RoundConfig, Session, Team},
        storage::StorageSlot,
    },
};

/// Reasons a stored snapshot cannot be turned back into a room.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("snapshot row `{row}` holds room `{payload}`")]
    RoomCodeMismatch { row: String, payload: String },
    #[error("snapshot has no teams")]
    NoTeams,
    #[error("player `{client_id}` references unknown team `{team_id}`")]
    UnknownPlayerTeam { client_id: Uuid, team_id: String },
    #[error("round references unknown team `{0}`")]
    UnknownRoundTeam(String),
}

/// Capture the durable part of `session`.
pub fn capture(session: &Session, persisted_at: SystemTime) -> SessionSnapshot {
    SessionSnapshot {
        room_code: session.code.clone(),
        host_name: session.host.name.clone(),
        created_at: session.created_at,
        updated_at: session.updated_at,
        last_activity: session.last_activity,
        config: RoundConfigEntity {
            target_score: session.config.target_score,
            default_round_seconds: session.config.default_round_seconds,
            categories: session.config.categories.clone(),
            custom_words: session.config.custom_words.clone(),
            scoring: session.config.scoring,
        },
        teams: session
            .teams
            .values()
            .map(|team| TeamEntity {
                id: team.id.clone(),
                name: team.name.clone(),
                color: team.color.clone(),
                score: team.score,
            })
            .collect(),
        players: session
            .players
            .values()
            .map(|player| PlayerEntity {
                client_id: player.client_id,
                name: player.name.clone(),
                team_id: player.team_id.clone(),
                joined_at: player.joined_at,
            })
            .collect(),
        round: session.round.as_ref().map(|round| RoundEntity {
            id: round.id,
            team_id: round.team_id.clone(),
            active_party: round.active_party,
            round_seconds: round.round_seconds,
            seconds_left: round.seconds_left,
            round_score: round.round_score,
            started_at: round.started_at,
            active: round.active,
            claims: round
                .claims
                .iter()
                .map(|(team_id, words)| TeamClaimsEntity {
                    team_id: team_id.clone(),
                    words: words.iter().cloned().collect(),
                })
                .collect(),
        }),
        persisted_at,
    }
}

impl TryFrom<SessionSnapshot> for Session {
    type Error = SnapshotError;

    fn try_from(value: SessionSnapshot) -> Result<Self, Self::Error> {
        if value.teams.is_empty() {
            return Err(SnapshotError::NoTeams);
        }

        let teams = value
            .teams
            .into_iter()
            .map(|team| Team {
                id: team.id,
                name: team.name,
                color: team.color,
                score: team.score,
                members: IndexSet::new(),
            })
            .collect::<Vec<_>>();

        let mut session = Session::new(
            value.room_code,
            Host {
                name: value.host_name,
                connection: None,
            },
            RoundConfig {
                target_score: value.config.target_score,
                default_round_seconds: value.config.default_round_seconds,
                categories: value.config.categories,
                custom_words: value.config.custom_words,
                scoring: value.config.scoring,
            },
            teams,
            value.created_at,
        );
        session.updated_at = value.updated_at;
        session.last_activity = value.last_activity;

        for player in value.players {
            let client_id = player.client_id;
            let team_id = player.team_id.clone();
            session
                .add_player(Player {
                    client_id,
                    name: player.name,
                    team_id: player.team_id,
                    connection: None,
                    joined_at: player.joined_at,
                })
                .map_err(|_| SnapshotError::UnknownPlayerTeam { client_id, team_id })?;
        }

        if let Some(round) = value.round {
            if !session.teams.contains_key(&round.team_id) {
                return Err(SnapshotError::UnknownRoundTeam(round.team_id));
            }
            let claims = round
                .claims
                .into_iter()
                .filter(|claims| session.teams.contains_key(&claims.team_id))
                .map(|claims| (claims.team_id, claim_set(claims.words)))
                .collect::<IndexMap<_, _>>();
            session.round = Some(Round {
                id: round.id,
                team_id: round.team_id,
                active_party: round.active_party,
                round_seconds: round.round_seconds,
                seconds_left: round.seconds_left,
                round_score: round.round_score,
                started_at: round.started_at,
                active: round.active,
                claims,
            });
        }

        Ok(session)
    }
}

/// Serialize `session` into a store row.
pub fn encode(session: &Session, persisted_at: SystemTime) -> Result<StoredSnapshot, serde_json::Error> {
    let snapshot = capture(session, persisted_at);
    Ok(StoredSnapshot {
        room_code: session.code.clone(),
        payload: serde_json::to_string(&snapshot)?,
        persisted_at,
    })
}

/// Rebuild a room from a store row, returning it with its snapshot time.
pub fn decode(row: &StoredSnapshot) -> Result<(Session, SystemTime), SnapshotError> {
    let snapshot: SessionSnapshot = serde_json::from_str(&row.payload)?;
    if snapshot.room_code != row.room_code {
        return Err(SnapshotError::RoomCodeMismatch {
            row: row.room_code.clone(),
            payload: snapshot.room_code,
        });
    }
    let persisted_at = snapshot.persisted_at;
    Ok((Session::try_from(snapshot)?, persisted_at))
}

enum WriteCommand {
    Put(StoredSnapshot),
    Delete(String),
    Flush(oneshot::Sender<()>),
}

/// Handle to the single task that applies snapshot writes in submission order.
///
/// Puts are dropped while the storage slot is degraded; the next mutation of the room
/// produces a fresh snapshot anyway. Deletes are kept as pending removals and replayed
/// once the slot is healthy again, or superseded by a later put of the same code.
#[derive(Clone)]
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl SnapshotWriter {
    /// Spawn the writer task on the current runtime.
    pub fn spawn(storage: Arc<StorageSlot>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(storage, rx));
        Self { tx }
    }

    /// Queue the snapshot of `session`.
    pub fn put(&self, session: &Session, now: SystemTime) {
        match encode(session, now) {
            Ok(row) => self.send(WriteCommand::Put(row)),
            Err(err) => warn!(room = %session.code, error = %err, "failed to encode snapshot"),
        }
    }

    /// Queue the removal of `room_code`'s snapshot.
    pub fn delete(&self, room_code: &str) {
        self.send(WriteCommand::Delete(room_code.to_string()));
    }

    /// Resolve once every write queued before this call was applied.
    pub async fn flush(&self) -> StorageResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteCommand::Flush(done_tx)).is_err() {
            return Err(StorageError::WriterStopped);
        }
        done_rx.await.map_err(|_| StorageError::WriterStopped)
    }

    fn send(&self, command: WriteCommand) {
        if self.tx.send(command).is_err() {
            warn!("snapshot writer stopped; dropping write");
        }
    }
}

async fn current_store(storage: &StorageSlot) -> Option<Arc<dyn SnapshotStore>> {
    if storage.is_degraded() {
        return None;
    }
    storage.store().await
}

async fn run_writer(storage: Arc<StorageSlot>, mut rx: mpsc::UnboundedReceiver<WriteCommand>) {
    let mut degraded = storage.degraded_watcher();
    let mut pending_deletes = IndexSet::new();

    loop {
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else { break };
                apply(&storage, &mut pending_deletes, command).await;
            }
            Ok(()) = degraded.changed() => {
                let healthy = !*degraded.borrow_and_update();
                if healthy && !pending_deletes.is_empty() {
                    if let Some(store) = current_store(&storage).await {
                        replay_deletes(&store, &mut pending_deletes).await;
                    }
                }
            }
        }
    }
    debug!("snapshot writer stopped");
}

async fn apply(
    storage: &StorageSlot,
    pending_deletes: &mut IndexSet<String>,
    command: WriteCommand,
) {
    match command {
        WriteCommand::Put(row) => {
            let room = row.room_code.clone();
            pending_deletes.shift_remove(&room);
            let Some(store) = current_store(storage).await else {
                debug!(%room, "storage degraded; skipping snapshot");
                return;
            };
            replay_deletes(&store, pending_deletes).await;
            if let Err(err) = store.put(row).await {
                warn!(%room, error = %err, "failed to persist snapshot");
            }
        }
        WriteCommand::Delete(room) => {
            pending_deletes.insert(room.clone());
            match current_store(storage).await {
                Some(store) => replay_deletes(&store, pending_deletes).await,
                None => debug!(%room, "storage degraded; snapshot removal postponed"),
            }
        }
        WriteCommand::Flush(done) => {
            if !pending_deletes.is_empty() {
                if let Some(store) = current_store(storage).await {
                    replay_deletes(&store, pending_deletes).await;
                }
            }
            let _ = done.send(());
        }
    }
}

/// Apply postponed removals oldest first, stopping at the first failure.
async fn replay_deletes(store: &Arc<dyn SnapshotStore>, pending_deletes: &mut IndexSet<String>) {
    while let Some(room) = pending_deletes.first().cloned() {
        if let Err(err) = store.delete(room.clone()).await {
            warn!(%room, error = %err, "failed to delete snapshot; will retry");
            return;
        }
        pending_deletes.shift_remove(&room);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        dao::snapshot_store::MemorySnapshotStore,
        state::session::{ScoringMode, Team},
    };

    fn session() -> Session {
        let team = |id: &str| Team {
            id: id.into(),
            name: format!("Team {id}"),
            color: "#2ecc71".into(),
            score: 3,
            members: IndexSet::new(),
        };
        let mut session = Session::new(
            "WXYZ".into(),
            Host {
                name: "Noa".into(),
                connection: Some(Uuid::new_v4()),
            },
            RoundConfig {
                target_score: 40,
                default_round_seconds: 60,
                categories: vec!["animals".into()],
                custom_words: Vec::new(),
                scoring: ScoringMode::Uniqueness,
            },
            vec![team("A"), team("B")],
            SystemTime::UNIX_EPOCH,
        );
        let dana = Uuid::new_v4();
        session
            .add_player(Player {
                client_id: dana,
                name: "Dana".into(),
                team_id: "A".into(),
                connection: Some(Uuid::new_v4()),
                joined_at: SystemTime::UNIX_EPOCH,
            })
            .unwrap();
        let mut claims = IndexMap::new();
        claims.insert("A".to_string(), claim_set(["cat", "dog"]));
        claims.insert("B".to_string(), IndexSet::new());
        session.round = Some(Round {
            id: Uuid::new_v4(),
            team_id: "A".into(),
            active_party: dana,
            round_seconds: 60,
            seconds_left: 42,
            round_score: 0,
            started_at: SystemTime::UNIX_EPOCH,
            active: true,
            claims,
        });
        session
    }

    #[test]
    fn restored_rooms_come_back_disconnected() {
        let original = session();
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(18);
        let row = encode(&original, at).unwrap();

        let (restored, persisted_at) = decode(&row).unwrap();
        assert_eq!(persisted_at, at);
        assert_eq!(restored.code, "WXYZ");
        assert!(restored.host.connection.is_none());
        assert!(restored.players.values().all(|player| player.connection.is_none()));
        assert!(restored.membership_is_consistent());
        assert_eq!(restored.teams["A"].score, 3);
        assert_eq!(restored.round, original.round);
    }

    #[test]
    fn corrupt_payloads_are_rejected() {
        let row = StoredSnapshot {
            room_code: "WXYZ".into(),
            payload: "{ not json".into(),
            persisted_at: SystemTime::UNIX_EPOCH,
        };
        assert!(matches!(decode(&row), Err(SnapshotError::Decode(_))));
    }

    #[test]
    fn players_of_unknown_teams_are_rejected() {
        let mut snapshot = capture(&session(), SystemTime::UNIX_EPOCH);
        snapshot.players[0].team_id = "Q".into();
        let err = Session::try_from(snapshot).unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownPlayerTeam { .. }));
    }

    #[tokio::test]
    async fn writer_applies_puts_and_deletes_in_order() {
        let storage = Arc::new(StorageSlot::new());
        let store = MemorySnapshotStore::new();
        storage.install(Arc::new(store.clone())).await;
        let writer = SnapshotWriter::spawn(storage);

        writer.put(&session(), SystemTime::UNIX_EPOCH);
        writer.flush().await.unwrap();
        assert!(store.row("WXYZ").is_some());

        writer.delete("WXYZ");
        writer.flush().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn writer_skips_writes_while_degraded() {
        let storage = Arc::new(StorageSlot::new());
        let store = MemorySnapshotStore::new();
        storage.install(Arc::new(store.clone())).await;
        storage.set_degraded(true);
        let writer = SnapshotWriter::spawn(storage);

        writer.put(&session(), SystemTime::UNIX_EPOCH);
        writer.flush().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn removals_queued_while_degraded_are_replayed_on_recovery() {
        let storage = Arc::new(StorageSlot::new());
        let store = MemorySnapshotStore::new();
        storage.install(Arc::new(store.clone())).await;
        let writer = SnapshotWriter::spawn(storage.clone());

        writer.put(&session(), SystemTime::UNIX_EPOCH);
        writer.flush().await.unwrap();
        assert!(store.row("WXYZ").is_some());

        storage.set_degraded(true);
        writer.delete("WXYZ");
        writer.flush().await.unwrap();
        assert!(store.row("WXYZ").is_some());

        storage.set_degraded(false);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn a_later_put_supersedes_a_postponed_removal() {
        let storage = Arc::new(StorageSlot::new());
        let store = MemorySnapshotStore::new();
        storage.install(Arc::new(store.clone())).await;
        storage.set_degraded(true);
        let writer = SnapshotWriter::spawn(storage.clone());

        writer.delete("WXYZ");
        writer.put(&session(), SystemTime::UNIX_EPOCH);
        writer.flush().await.unwrap();
        storage.set_degraded(false);

        writer.put(&session(), SystemTime::UNIX_EPOCH);
        writer.flush().await.unwrap();
        assert!(store.row("WXYZ").is_some());
    }
}
