mod common;

use wordmania_back::{
    dto::ws::{CreateRoomRequest, RoundScoreRequest, ServerMessage, TeamScoreRequest},
    error::GameError,
    state::{round::FinishReason, session::ScoringMode},
};

use common::{Harness, Target, score_of};

#[tokio::test(start_paused = true)]
async fn only_words_claimed_by_a_single_team_score() {
    let harness = Harness::new().await;
    let code = harness
        .registry
        .create_session(
            CreateRoomRequest {
                host_name: "Host".into(),
                team_count: Some(3),
                scoring: ScoringMode::Uniqueness,
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap()
        .code;
    let (_, first) = harness.join(&code, "Dana", "A").await;
    let (_, second) = harness.join(&code, "Omer", "B").await;
    let (_, third) = harness.join(&code, "Lior", "C").await;
    harness.start(&code, "A", None, 60).await;

    for (connection, word) in [
        (first, "cat"),
        (first, "dog"),
        (second, "dog"),
        (second, "bird"),
        (third, "cat"),
    ] {
        harness
            .registry
            .submit_word(&code, connection, word)
            .await
            .unwrap();
    }

    let results = harness.registry.end_round(&code).await.unwrap().unwrap();
    assert_eq!(results.reason, FinishReason::Manual);
    let points: Vec<(String, u32)> = results
        .results
        .iter()
        .map(|result| (result.team_id.clone(), result.round_points))
        .collect();
    assert_eq!(
        points,
        vec![("A".into(), 0), ("B".into(), 1), ("C".into(), 0)]
    );

    let view = harness.view(&code).await;
    assert_eq!(score_of(&view, "A"), 0);
    assert_eq!(score_of(&view, "B"), 1);
    assert_eq!(score_of(&view, "C"), 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_claims_are_deduplicated_after_normalization() {
    let harness = Harness::new().await;
    let code = harness.room(ScoringMode::Uniqueness).await;
    let (_, dana) = harness.join(&code, "Dana", "A").await;
    let (_, noga) = harness.join(&code, "Noga", "A").await;
    let (_, omer) = harness.join(&code, "Omer", "B").await;
    harness.start(&code, "A", None, 60).await;
    harness.events.clear();

    let first = harness
        .registry
        .submit_word(&code, dana, "  Ice   Cream ")
        .await
        .unwrap();
    assert_eq!(first, ("ice cream".to_string(), true));
    let second = harness
        .registry
        .submit_word(&code, noga, "ice cream")
        .await
        .unwrap();
    assert_eq!(second, ("ice cream".to_string(), false));

    let accepted: Vec<Target> = harness
        .events
        .messages()
        .into_iter()
        .filter(|(_, message)| matches!(message, ServerMessage::WordAccepted { .. }))
        .map(|(target, _)| target)
        .collect();
    assert_eq!(accepted.len(), 2);
    assert!(accepted.contains(&Target::Connection(dana)));
    assert!(accepted.contains(&Target::Connection(noga)));
    assert!(!accepted.contains(&Target::Connection(omer)));

    let round = harness.view(&code).await.round.unwrap();
    let team_a = round
        .claims
        .iter()
        .find(|claims| claims.team_id == "A")
        .unwrap();
    assert_eq!(team_a.words, vec!["ice cream".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn word_claims_need_an_active_round_and_a_claiming_mode() {
    let harness = Harness::new().await;
    let uniqueness = harness.room(ScoringMode::Uniqueness).await;
    let (_, dana) = harness.join(&uniqueness, "Dana", "A").await;
    assert_eq!(
        harness
            .registry
            .submit_word(&uniqueness, dana, "cat")
            .await
            .unwrap_err(),
        GameError::NoActiveRound
    );

    let accumulator = harness.room(ScoringMode::Accumulator).await;
    let (_, omer) = harness.join(&accumulator, "Omer", "A").await;
    harness.start(&accumulator, "A", None, 60).await;
    assert!(matches!(
        harness.registry.submit_word(&accumulator, omer, "cat").await,
        Err(GameError::InvalidInput(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn round_score_never_drops_below_zero() {
    let harness = Harness::new().await;
    let code = harness.room(ScoringMode::Accumulator).await;
    harness.join(&code, "Dana", "A").await;
    harness.start(&code, "A", None, 60).await;

    let change = |delta| RoundScoreRequest {
        room_code: code.clone(),
        delta,
    };
    assert_eq!(harness.registry.change_round_score(change(-5)).await.unwrap(), 0);
    assert_eq!(harness.registry.change_round_score(change(3)).await.unwrap(), 3);
    assert_eq!(harness.registry.change_round_score(change(-1)).await.unwrap(), 2);
    assert_eq!(
        harness
            .events
            .count(|message| matches!(message, ServerMessage::RoundScoreUpdated { .. })),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn target_score_is_reported_when_reached() {
    let harness = Harness::new().await;
    let code = harness
        .registry
        .create_session(
            CreateRoomRequest {
                host_name: "Host".into(),
                target_score: Some(5),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap()
        .code;
    harness.join(&code, "Dana", "A").await;
    harness
        .registry
        .adjust_team_score(TeamScoreRequest {
            room_code: code.clone(),
            team_id: "A".into(),
            delta: 3,
        })
        .await
        .unwrap();
    harness.start(&code, "A", None, 60).await;
    harness
        .registry
        .change_round_score(RoundScoreRequest {
            room_code: code.clone(),
            delta: 2,
        })
        .await
        .unwrap();

    let results = harness.registry.end_round(&code).await.unwrap().unwrap();
    assert_eq!(results.total_score, 5);
    assert!(results.target_reached);
    assert!(harness.view(&code).await.target_reached);
}
