mod common;

use std::{sync::Arc, time::Duration};

use indexmap::{IndexMap, IndexSet};
use tokio::time::sleep;
use uuid::Uuid;
use wordmania_back::{
    config::AppConfig,
    dao::{models::StoredSnapshot, snapshot_store::MemorySnapshotStore},
    dto::session::VisibleRoundPhase,
    state::{
        round::FinishReason,
        session::{CloseReason, Host, Player, Round, RoundConfig, ScoringMode, Session},
        snapshot,
    },
};

use common::{Harness, epoch, score_of};

/// A two-team room whose team A round is running with `seconds_left` seconds to go.
fn room_with_round(code: &str, seconds_left: u32, round_score: u32) -> Session {
    let config = AppConfig::default();
    let mut session = Session::new(
        code.to_string(),
        Host {
            name: "Host".into(),
            connection: Some(Uuid::new_v4()),
        },
        RoundConfig {
            target_score: 40,
            default_round_seconds: 60,
            categories: Vec::new(),
            custom_words: Vec::new(),
            scoring: ScoringMode::Accumulator,
        },
        config.build_teams(None, &IndexMap::new()),
        epoch(),
    );
    let dana = Uuid::new_v4();
    session
        .add_player(Player {
            client_id: dana,
            name: "Dana".into(),
            team_id: "A".into(),
            connection: Some(Uuid::new_v4()),
            joined_at: epoch(),
        })
        .unwrap();
    session
        .add_player(Player {
            client_id: Uuid::new_v4(),
            name: "Omer".into(),
            team_id: "B".into(),
            connection: None,
            joined_at: epoch(),
        })
        .unwrap();
    session.round = Some(Round {
        id: Uuid::new_v4(),
        team_id: "A".into(),
        active_party: dana,
        round_seconds: 60,
        seconds_left,
        round_score,
        started_at: epoch(),
        active: true,
        claims: IndexMap::<String, IndexSet<String>>::new(),
    });
    session
}

#[tokio::test(start_paused = true)]
async fn rounds_that_expired_while_offline_are_committed_on_restore() {
    let row = snapshot::encode(&room_with_round("WXYZ", 30, 7), epoch()).unwrap();
    let store = MemorySnapshotStore::with_rows([row]);
    let harness = Harness::with_store(store.clone()).await;
    harness.clock.advance(Duration::from_secs(45));

    let report = harness.registry.restore_from(Arc::new(store)).await;
    assert_eq!(report.restored, 1);
    assert_eq!(report.expired_rounds, 1);
    assert_eq!(report.skipped, 0);

    let finished = harness.events.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].reason, FinishReason::Timer);
    assert_eq!(finished[0].total_score, 7);

    let view = harness.view("WXYZ").await;
    assert_eq!(view.phase, VisibleRoundPhase::Idle);
    assert_eq!(score_of(&view, "A"), 7);
    assert!(!view.host_connected);
    assert!(view.players.iter().all(|player| !player.connected));
    assert!(!harness.registry.has_countdown("WXYZ"));
}

#[tokio::test(start_paused = true)]
async fn rounds_with_time_left_resume_their_countdown() {
    let row = snapshot::encode(&room_with_round("WXYZ", 30, 2), epoch()).unwrap();
    let store = MemorySnapshotStore::with_rows([row]);
    let harness = Harness::with_store(store.clone()).await;
    harness.clock.advance(Duration::from_secs(10));

    let report = harness.registry.restore_from(Arc::new(store)).await;
    assert_eq!(report.restored, 1);
    assert_eq!(report.expired_rounds, 0);
    assert!(harness.registry.has_countdown("wxyz"));

    let round = harness.view("WXYZ").await.round.unwrap();
    assert_eq!(round.seconds_left, 20);
    assert!(round.active);

    sleep(Duration::from_millis(20_500)).await;
    let finished = harness.events.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].reason, FinishReason::Timer);
    assert_eq!(score_of(&harness.view("WXYZ").await, "A"), 2);
}

#[tokio::test(start_paused = true)]
async fn unreadable_snapshots_are_skipped() {
    let good = snapshot::encode(&room_with_round("GOOD", 30, 0), epoch()).unwrap();
    let corrupt = StoredSnapshot {
        room_code: "BAD2".into(),
        payload: "{ not json".into(),
        persisted_at: epoch(),
    };
    let store = MemorySnapshotStore::with_rows([corrupt, good]);
    let harness = Harness::with_store(store.clone()).await;

    let report = harness.registry.restore_from(Arc::new(store)).await;
    assert_eq!(report.restored, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(harness.registry.room_count(), 1);
    assert!(harness.registry.session_view("BAD2").await.is_err());
    assert!(harness.registry.session_view("GOOD").await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn restored_players_reattach_with_their_client_id() {
    let session = room_with_round("WXYZ", 30, 0);
    let omer = session
        .players
        .values()
        .find(|player| player.name == "Omer")
        .map(|player| player.client_id)
        .unwrap();
    let store = MemorySnapshotStore::with_rows([snapshot::encode(&session, epoch()).unwrap()]);
    let harness = Harness::with_store(store.clone()).await;
    harness.registry.restore_from(Arc::new(store)).await;

    let connection = Uuid::new_v4();
    let joined = harness
        .registry
        .reconnect_player("wxyz", omer, connection)
        .await
        .unwrap();
    assert_eq!(joined.team_id, "B");
    assert!(
        joined
            .session
            .players
            .iter()
            .any(|player| player.client_id == omer && player.connected)
    );
}

#[tokio::test(start_paused = true)]
async fn snapshots_follow_the_room_lifecycle() {
    let harness = Harness::new().await;
    let code = harness.room(ScoringMode::Accumulator).await;
    harness.join(&code, "Dana", "A").await;
    harness.settle().await;

    let row = harness.store.row(&code).expect("snapshot persisted");
    let (restored, _) = snapshot::decode(&row).unwrap();
    assert_eq!(restored.players.len(), 1);
    assert!(restored.players.values().all(|player| player.connection.is_none()));
    assert!(restored.membership_is_consistent());

    harness
        .registry
        .close_session(&code, CloseReason::Ended)
        .await
        .unwrap();
    harness.settle().await;
    assert!(harness.store.row(&code).is_none());
}

#[tokio::test(start_paused = true)]
async fn degraded_storage_skips_writes() {
    let harness = Harness::new().await;
    harness.storage.set_degraded(true);
    let code = harness.room(ScoringMode::Accumulator).await;
    harness.settle().await;
    assert!(harness.store.row(&code).is_none());

    harness.storage.set_degraded(false);
    harness.join(&code, "Dana", "A").await;
    harness.settle().await;
    assert!(harness.store.row(&code).is_some());
}

#[tokio::test(start_paused = true)]
async fn rooms_closed_while_degraded_stay_closed_after_restart() {
    let harness = Harness::new().await;
    let code = harness.room(ScoringMode::Accumulator).await;
    harness.join(&code, "Dana", "A").await;
    harness.settle().await;
    assert!(harness.store.row(&code).is_some());

    harness.storage.set_degraded(true);
    harness
        .registry
        .close_session(&code, CloseReason::Ended)
        .await
        .unwrap();
    harness.settle().await;
    assert!(harness.store.row(&code).is_some());

    harness.storage.set_degraded(false);
    harness.settle().await;
    assert!(harness.store.row(&code).is_none());

    let restarted = Harness::with_store(harness.store.clone()).await;
    let report = restarted
        .registry
        .restore_from(Arc::new(harness.store.clone()))
        .await;
    assert_eq!(report.restored, 0);
    assert!(restarted.registry.session_view(&code).await.is_err());
}
