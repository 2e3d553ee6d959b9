//! Registry of live rooms and the operations that mutate them.
//!
//! Every room sits behind its own async mutex. All mutations of a room, the broadcast of
//! the resulting state and the queuing of its snapshot happen while that lock is held, so
//! observers see the mutations of one room in a single total order.

use std::{
    sync::{Arc, Weak},
    time::SystemTime,
};

use dashmap::{DashMap, mapref::entry::Entry};
use indexmap::{IndexMap, IndexSet};
use rand::{Rng, seq::IndexedRandom};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{models::StoredSnapshot, snapshot_store::SnapshotStore, storage::StorageResult},
    dto::{
        admin::RoomListItem,
        session::{JoinResponse, RoundResults, RoundView, SessionView, TeamRoundResult},
        validation::{normalize_room_code, sanitize_display_name},
        ws::{
            CreateRoomRequest, FinalizeRoundRequest, JoinRoomRequest, RoundScoreRequest,
            ServerMessage, StartRoundRequest, TeamScoreRequest,
        },
    },
    error::GameError,
    services::{
        notifier::{Notification, NotificationSink},
        word_source::{Word, WordSource},
    },
    state::{
        clock::{Clock, elapsed_secs},
        hub::Broadcaster,
        round::{FinishReason, RoundEvent, RoundPhase},
        scheduler::{RoundScheduler, TickOutcome},
        scoring::{apply_delta, claim_set, normalize_word, unique_word_counts},
        session::{
            ClientId, CloseReason, ConnectionId, Host, Player, RemovalReason, Round, RoundConfig,
            ScoringMode, Session, TeamId,
        },
        snapshot::{self, SnapshotWriter},
    },
};

/// Alphabet of generated room codes; ambiguous glyphs (`I`, `O`, `0`, `1`) are left out.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Collaborators of the [`SessionRegistry`].
pub struct RegistryDeps {
    /// Room defaults and limits.
    pub config: Arc<AppConfig>,
    /// Word supplier for the active party.
    pub words: Arc<dyn WordSource>,
    /// Outbound fan-out.
    pub broadcaster: Arc<dyn Broadcaster>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
    /// Snapshot persistence queue.
    pub snapshots: SnapshotWriter,
    /// Lifecycle notifications.
    pub notifier: Arc<dyn NotificationSink>,
}

/// Result of stopping the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Scores were committed and the room is back in its lobby.
    Committed(RoundResults),
    /// The countdown stopped; the host must judge the claims.
    AwaitingReview,
    /// There was no active round to stop.
    NotActive,
}

/// Counters reported by [`SessionRegistry::restore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Rooms put back in the registry.
    pub restored: usize,
    /// Restored rounds whose time ran out while the process was down.
    pub expired_rounds: usize,
    /// Rows that could not be decoded or collided with a live room.
    pub skipped: usize,
}

/// Owner of every live room.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    scheduler: RoundScheduler,
    deps: RegistryDeps,
    this: Weak<SessionRegistry>,
}

impl SessionRegistry {
    /// Build a registry with the default one second countdown.
    pub fn new(deps: RegistryDeps) -> Arc<Self> {
        Self::with_scheduler(deps, RoundScheduler::default())
    }

    /// Build a registry around a custom scheduler.
    pub fn with_scheduler(deps: RegistryDeps, scheduler: RoundScheduler) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            sessions: DashMap::new(),
            scheduler,
            deps,
            this: this.clone(),
        })
    }

    /// Room defaults and limits.
    pub fn config(&self) -> &AppConfig {
        &self.deps.config
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether a countdown is running for `code`.
    pub fn has_countdown(&self, code: &str) -> bool {
        self.scheduler.is_running(&normalize_room_code(code))
    }

    /// Number of running countdowns across all rooms.
    pub fn countdown_count(&self) -> usize {
        self.scheduler.active_count()
    }

    fn handle(&self, code: &str) -> Result<Arc<Mutex<Session>>, GameError> {
        let code = normalize_room_code(code);
        self.sessions
            .get(&code)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(GameError::RoomNotFound(code))
    }

    async fn lock(&self, code: &str) -> Result<OwnedMutexGuard<Session>, GameError> {
        let session = self.handle(code)?.lock_owned().await;
        if session.closed {
            return Err(GameError::RoomNotFound(session.code.clone()));
        }
        Ok(session)
    }

    fn all_handles(&self) -> Vec<Arc<Mutex<Session>>> {
        self.sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn now(&self) -> SystemTime {
        self.deps.clock.now()
    }

    /// Broadcast the full state of `session` and queue its snapshot.
    fn publish(&self, session: &Session) {
        self.deps.broadcaster.send_to_room(
            &session.code,
            &ServerMessage::GameState {
                session: SessionView::from(session),
            },
        );
        self.deps.snapshots.put(session, self.now());
    }

    /// Open a new room hosted by `host_connection`.
    pub async fn create_session(
        &self,
        request: CreateRoomRequest,
        host_connection: Option<ConnectionId>,
    ) -> Result<SessionView, GameError> {
        let host_name = sanitize_display_name(&request.host_name)?;
        let config = &self.deps.config;
        let teams = config.build_teams(request.team_count, &request.team_names);
        let round_config = RoundConfig {
            target_score: request
                .target_score
                .unwrap_or(config.default_target_score),
            default_round_seconds: config.clamp_round_seconds(
                request
                    .round_seconds
                    .unwrap_or(config.default_round_seconds),
            ),
            categories: distinct_trimmed(request.categories),
            custom_words: distinct_trimmed(request.custom_words),
            scoring: request.scoring,
        };
        let now = self.now();

        let handle = loop {
            let code = generate_room_code(config.room_code_length);
            match self.sessions.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let session = Session::new(
                        code,
                        Host {
                            name: host_name.clone(),
                            connection: host_connection,
                        },
                        round_config.clone(),
                        teams.clone(),
                        now,
                    );
                    let handle = Arc::new(Mutex::new(session));
                    slot.insert(Arc::clone(&handle));
                    break handle;
                }
            }
        };

        let session = handle.lock().await;
        if let Some(connection) = host_connection {
            self.deps.broadcaster.join_room(&session.code, connection);
        }
        info!(
            room = %session.code,
            host = %session.host.name,
            teams = session.teams.len(),
            scoring = ?session.config.scoring,
            "room created"
        );
        self.publish(&session);
        self.deps.notifier.notify(Notification::RoomCreated {
            room_code: session.code.clone(),
            host_name: session.host.name.clone(),
        });

        Ok(SessionView::from(&*session))
    }

    /// Add a player to a room; the requested team is used when it exists.
    pub async fn join_session(
        &self,
        request: JoinRoomRequest,
        connection: Option<ConnectionId>,
    ) -> Result<JoinResponse, GameError> {
        let name = sanitize_display_name(&request.player_name)?;
        let mut session = self.lock(&request.room_code).await?;
        let team_id = session.resolve_join_team(request.team_id.as_deref())?;
        let now = self.now();
        let client_id = Uuid::new_v4();

        session.add_player(Player {
            client_id,
            name,
            team_id: team_id.clone(),
            connection,
            joined_at: now,
        })?;
        session.touch(now);
        if let Some(connection) = connection {
            self.deps.broadcaster.join_room(&session.code, connection);
        }
        info!(room = %session.code, %client_id, team = %team_id, "player joined");
        self.publish(&session);

        Ok(JoinResponse {
            client_id,
            team_id,
            session: SessionView::from(&*session),
        })
    }

    /// Re-attach the host of `code` to `connection`.
    pub async fn reconnect_host(
        &self,
        code: &str,
        connection: ConnectionId,
    ) -> Result<SessionView, GameError> {
        let mut session = self.lock(code).await?;
        if let Some(previous) = session.host.connection.replace(connection) {
            if previous != connection {
                self.deps.broadcaster.leave_room(&session.code, previous);
            }
        }
        session.touch(self.now());
        self.deps.broadcaster.join_room(&session.code, connection);
        info!(room = %session.code, "host reconnected");
        self.publish(&session);

        Ok(SessionView::from(&*session))
    }

    /// Re-attach a known player to `connection`.
    pub async fn reconnect_player(
        &self,
        code: &str,
        client_id: ClientId,
        connection: ConnectionId,
    ) -> Result<JoinResponse, GameError> {
        let mut session = self.lock(code).await?;
        let room = session.code.clone();
        let player = session
            .players
            .get_mut(&client_id)
            .ok_or_else(|| GameError::PlayerNotFound(client_id.to_string()))?;
        if let Some(previous) = player.connection.replace(connection) {
            if previous != connection {
                self.deps.broadcaster.leave_room(&room, previous);
            }
        }
        let team_id = player.team_id.clone();
        session.touch(self.now());
        self.deps.broadcaster.join_room(&room, connection);
        info!(%room, %client_id, "player reconnected");
        self.publish(&session);

        Ok(JoinResponse {
            client_id,
            team_id,
            session: SessionView::from(&*session),
        })
    }

    /// Remove a player from a room.
    pub async fn remove_player(
        &self,
        code: &str,
        client_id: ClientId,
        reason: RemovalReason,
    ) -> Result<(), GameError> {
        let mut session = self.lock(code).await?;
        self.remove_player_locked(&mut session, client_id, reason)
    }

    fn remove_player_locked(
        &self,
        session: &mut Session,
        client_id: ClientId,
        reason: RemovalReason,
    ) -> Result<(), GameError> {
        let player = session
            .remove_player(&client_id)
            .ok_or_else(|| GameError::PlayerNotFound(client_id.to_string()))?;
        session.touch(self.now());

        if let Some(connection) = player.connection {
            if reason == RemovalReason::Kicked {
                self.deps.broadcaster.send_to_connection(
                    connection,
                    &ServerMessage::RemovedFromRoom {
                        room_code: session.code.clone(),
                        reason: "removed by the host".into(),
                    },
                );
            }
            self.deps.broadcaster.leave_room(&session.code, connection);
        }
        info!(
            room = %session.code,
            %client_id,
            team = %player.team_id,
            reason = ?reason,
            "player removed"
        );

        let was_active_party = session
            .round
            .as_ref()
            .is_some_and(|round| round.active && round.active_party == client_id);
        if was_active_party {
            self.finalize_locked(session, FinishReason::Disconnect);
        } else {
            self.publish(session);
        }
        Ok(())
    }

    /// Handle a dropped transport connection.
    ///
    /// The host keeps its room and only loses its connection; a player bound to the
    /// connection is removed from its room.
    pub async fn disconnect(&self, connection: ConnectionId) {
        for handle in self.all_handles() {
            let mut session = handle.lock().await;
            if session.closed {
                continue;
            }

            if session.host.connection == Some(connection) {
                session.host.connection = None;
                if let Some(player) = session
                    .players
                    .values_mut()
                    .find(|player| player.connection == Some(connection))
                {
                    player.connection = None;
                }
                self.deps.broadcaster.leave_room(&session.code, connection);
                info!(room = %session.code, "host disconnected; room kept");
                self.publish(&session);
                continue;
            }

            let client_id = session
                .player_by_connection(connection)
                .map(|player| player.client_id);
            if let Some(client_id) = client_id {
                if let Err(err) =
                    self.remove_player_locked(&mut session, client_id, RemovalReason::Disconnected)
                {
                    warn!(room = %session.code, error = %err, "failed to remove disconnected player");
                }
            }
        }
    }

    /// Start a round, finalizing the running one first.
    pub async fn start_round(&self, request: StartRoundRequest) -> Result<RoundView, GameError> {
        let mut session = self.lock(&request.room_code).await?;
        if session.phase() == RoundPhase::Reviewing {
            return Err(GameError::RoundInReview);
        }

        let team_id = match request
            .team_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            Some(id) if session.teams.contains_key(id) => id.to_string(),
            Some(id) => return Err(GameError::TeamNotFound(id.to_string())),
            None => session
                .teams
                .keys()
                .find(|id| !session.connected_members(id).is_empty())
                .cloned()
                .ok_or_else(|| {
                    GameError::NoEligiblePlayers(
                        session.teams.keys().next().cloned().unwrap_or_default(),
                    )
                })?,
        };

        let eligible = session.connected_members(&team_id);
        if eligible.is_empty() {
            return Err(GameError::NoEligiblePlayers(team_id));
        }
        let active_party = match request.explainer_client_id {
            Some(client_id) if eligible.contains(&client_id) => client_id,
            Some(client_id) => return Err(GameError::PlayerNotFound(client_id.to_string())),
            None => *eligible
                .choose(&mut rand::rng())
                .ok_or_else(|| GameError::NoEligiblePlayers(team_id.clone()))?,
        };
        let seconds = self.deps.config.clamp_round_seconds(
            request
                .duration_seconds
                .unwrap_or(session.config.default_round_seconds),
        );

        // A superseded round is committed as is, even in judged rooms.
        if session.phase() == RoundPhase::Active {
            self.commit_round(&mut session, FinishReason::Manual, None);
        }
        session.phase().next(RoundEvent::Start)?;

        let now = self.now();
        let claims = if session.config.scoring.claims_words() {
            session
                .teams
                .keys()
                .map(|id| (id.clone(), IndexSet::new()))
                .collect()
        } else {
            IndexMap::new()
        };
        let round = Round {
            id: Uuid::new_v4(),
            team_id,
            active_party,
            round_seconds: seconds,
            seconds_left: seconds,
            round_score: 0,
            started_at: now,
            active: true,
            claims,
        };
        let round_id = round.id;
        session.round = Some(round);
        session.touch(now);
        self.schedule_countdown(&session.code, round_id);

        let view = session
            .round
            .as_ref()
            .map(|round| RoundView::new(&session, round))
            .ok_or(GameError::NoActiveRound)?;
        info!(
            room = %session.code,
            team = %view.team_id,
            explainer = %view.explainer_id,
            seconds,
            "round started"
        );
        self.deps.broadcaster.send_to_room(
            &session.code,
            &ServerMessage::RoundStarted {
                room_code: session.code.clone(),
                round: view.clone(),
            },
        );
        self.publish(&session);

        Ok(view)
    }

    fn schedule_countdown(&self, code: &str, round_id: Uuid) {
        let registry = self.this.clone();
        let room = code.to_string();
        self.scheduler.start(code, round_id, move || {
            let registry = registry.clone();
            let room = room.clone();
            async move {
                match registry.upgrade() {
                    Some(registry) => registry.tick_round(&room, round_id).await,
                    None => TickOutcome::Stop,
                }
            }
        });
    }

    /// Advance the countdown of `round_id` by one second.
    ///
    /// Ticks for a round that is no longer current are ignored.
    pub async fn tick_round(&self, code: &str, round_id: Uuid) -> TickOutcome {
        let Ok(mut session) = self.lock(code).await else {
            return TickOutcome::Stop;
        };
        let Some(round) = session
            .round
            .as_mut()
            .filter(|round| round.id == round_id && round.active)
        else {
            return TickOutcome::Stop;
        };

        round.seconds_left = round.seconds_left.saturating_sub(1);
        let seconds_left = round.seconds_left;
        if seconds_left == 0 {
            self.finalize_locked(&mut session, FinishReason::Timer);
            return TickOutcome::Stop;
        }

        debug!(room = %session.code, seconds_left, "round tick");
        self.deps.broadcaster.send_to_room(
            &session.code,
            &ServerMessage::RoundTick {
                room_code: session.code.clone(),
                seconds_left,
            },
        );
        TickOutcome::Continue
    }

    /// Stop the active round of `session`.
    ///
    /// Judged rooms park the round for review unless `reason` is [`FinishReason::Judged`];
    /// every other case commits scores right away.
    fn finalize_locked(&self, session: &mut Session, reason: FinishReason) -> FinalizeOutcome {
        let Some(round) = session.round.as_ref().filter(|round| round.active) else {
            return FinalizeOutcome::NotActive;
        };
        let round_id = round.id;
        self.scheduler.cancel_round(&session.code, round_id);

        if session.config.scoring == ScoringMode::JudgedUniqueness
            && reason != FinishReason::Judged
        {
            if let Err(err) = session.phase().next(RoundEvent::Review(reason)) {
                warn!(room = %session.code, error = %err, "cannot park round for review");
                return FinalizeOutcome::NotActive;
            }
            let mut time_up = None;
            if let Some(round) = session.round.as_mut() {
                round.active = false;
                time_up = Some((round.team_id.clone(), round.round_score));
            }
            session.touch(self.now());
            info!(room = %session.code, reason = ?reason, "round awaiting review");
            if let (FinishReason::Timer, Some((team_id, round_score))) = (reason, time_up) {
                self.send_time_up(session, team_id, round_score);
            }
            self.publish(session);
            return FinalizeOutcome::AwaitingReview;
        }

        self.commit_round(session, reason, None)
    }

    /// Credit the points of the current round and return the room to its lobby.
    fn commit_round(
        &self,
        session: &mut Session,
        reason: FinishReason,
        approved: Option<IndexMap<TeamId, IndexSet<String>>>,
    ) -> FinalizeOutcome {
        let finished = match session.phase().next(RoundEvent::Finish(reason)) {
            Ok(phase) => phase,
            Err(err) => {
                warn!(room = %session.code, error = %err, "cannot commit round");
                return FinalizeOutcome::NotActive;
            }
        };
        let Some(round) = session.round.take() else {
            return FinalizeOutcome::NotActive;
        };
        self.scheduler.cancel_round(&session.code, round.id);

        let points: IndexMap<TeamId, u32> = match session.config.scoring {
            ScoringMode::Accumulator => {
                IndexMap::from([(round.team_id.clone(), round.round_score)])
            }
            ScoringMode::Uniqueness => unique_word_counts(&round.claims),
            ScoringMode::JudgedUniqueness => {
                unique_word_counts(approved.as_ref().unwrap_or(&round.claims))
            }
        };
        for (team_id, earned) in &points {
            if let Some(team) = session.teams.get_mut(team_id) {
                team.score = team.score.saturating_add(*earned);
            }
        }
        let results = points
            .iter()
            .filter_map(|(team_id, earned)| {
                session.teams.get(team_id).map(|team| TeamRoundResult {
                    team_id: team.id.clone(),
                    name: team.name.clone(),
                    color: team.color.clone(),
                    round_points: *earned,
                    total_score: team.score,
                })
            })
            .collect::<Vec<_>>();
        let round_score = points.get(&round.team_id).copied().unwrap_or(0);
        let total_score = session
            .teams
            .get(&round.team_id)
            .map(|team| team.score)
            .unwrap_or(0);
        debug_assert!(finished.next(RoundEvent::Commit).is_ok());
        session.touch(self.now());

        let summary = RoundResults {
            room_code: session.code.clone(),
            reason,
            team_id: round.team_id.clone(),
            round_score,
            total_score,
            results,
            target_reached: session.target_reached(),
        };
        info!(
            room = %session.code,
            team = %round.team_id,
            round_score,
            total_score,
            reason = ?reason,
            "round finished"
        );
        self.deps.broadcaster.send_to_room(
            &session.code,
            &ServerMessage::RoundFinished(summary.clone()),
        );
        if reason == FinishReason::Timer {
            self.send_time_up(session, round.team_id.clone(), round_score);
        }
        self.publish(session);
        self.deps.notifier.notify(Notification::RoundFinished {
            room_code: session.code.clone(),
            team_id: round.team_id,
            round_score,
            reason,
        });

        FinalizeOutcome::Committed(summary)
    }

    fn send_time_up(&self, session: &Session, team_id: TeamId, round_score: u32) {
        let team_name = session
            .teams
            .get(&team_id)
            .map(|team| team.name.clone())
            .unwrap_or_default();
        self.deps.broadcaster.send_to_room(
            &session.code,
            &ServerMessage::RoundTimeUp {
                room_code: session.code.clone(),
                team_id,
                team_name,
                round_score,
            },
        );
    }

    /// End the running round early. Returns `None` when the round now awaits review.
    pub async fn end_round(&self, code: &str) -> Result<Option<RoundResults>, GameError> {
        let mut session = self.lock(code).await?;
        match session.phase() {
            RoundPhase::Reviewing => return Err(GameError::RoundInReview),
            RoundPhase::Active => {}
            _ => return Err(GameError::NoActiveRound),
        }

        match self.finalize_locked(&mut session, FinishReason::Manual) {
            FinalizeOutcome::Committed(results) => Ok(Some(results)),
            FinalizeOutcome::AwaitingReview => Ok(None),
            FinalizeOutcome::NotActive => Err(GameError::NoActiveRound),
        }
    }

    /// Commit the round of a judged room with the words the host approved.
    pub async fn finalize_round(
        &self,
        request: FinalizeRoundRequest,
    ) -> Result<RoundResults, GameError> {
        let mut session = self.lock(&request.room_code).await?;
        if session.config.scoring != ScoringMode::JudgedUniqueness {
            return Err(GameError::InvalidInput(
                "rounds of this room are not judged by the host".into(),
            ));
        }
        if session.round.is_none() {
            return Err(GameError::NoActiveRound);
        }
        if let Some(unknown) = request
            .approved_words_by_team
            .keys()
            .find(|team_id| !session.teams.contains_key(*team_id))
        {
            return Err(GameError::TeamNotFound(unknown.clone()));
        }

        let approved = session
            .teams
            .keys()
            .map(|team_id| {
                let words = request
                    .approved_words_by_team
                    .get(team_id)
                    .map(|words| claim_set(words))
                    .unwrap_or_default();
                (team_id.clone(), words)
            })
            .collect::<IndexMap<_, _>>();

        match self.commit_round(&mut session, FinishReason::Judged, Some(approved)) {
            FinalizeOutcome::Committed(results) => Ok(results),
            FinalizeOutcome::AwaitingReview | FinalizeOutcome::NotActive => {
                Err(GameError::NoActiveRound)
            }
        }
    }

    /// Adjust the live round score, floored at zero.
    pub async fn change_round_score(&self, request: RoundScoreRequest) -> Result<u32, GameError> {
        let mut session = self.lock(&request.room_code).await?;
        if session.config.scoring != ScoringMode::Accumulator {
            return Err(GameError::InvalidInput(
                "live round scores are only kept in accumulator rooms".into(),
            ));
        }
        let round = session
            .round
            .as_mut()
            .filter(|round| round.active)
            .ok_or(GameError::NoActiveRound)?;
        round.round_score = apply_delta(round.round_score, request.delta);
        let round_score = round.round_score;
        session.touch(self.now());

        self.deps.broadcaster.send_to_room(
            &session.code,
            &ServerMessage::RoundScoreUpdated {
                room_code: session.code.clone(),
                round_score,
            },
        );
        self.publish(&session);
        Ok(round_score)
    }

    /// Correct a team's cumulative score, floored at zero.
    pub async fn adjust_team_score(&self, request: TeamScoreRequest) -> Result<u32, GameError> {
        let mut session = self.lock(&request.room_code).await?;
        let team = session
            .teams
            .get_mut(&request.team_id)
            .ok_or_else(|| GameError::TeamNotFound(request.team_id.clone()))?;
        team.score = apply_delta(team.score, request.delta);
        let score = team.score;
        session.touch(self.now());
        info!(
            room = %session.code,
            team = %request.team_id,
            delta = request.delta,
            score,
            "team score adjusted"
        );
        self.publish(&session);
        Ok(score)
    }

    /// Claim `word` for the team of the player bound to `connection`.
    ///
    /// Returns the normalized word and whether it was new for the team.
    pub async fn submit_word(
        &self,
        code: &str,
        connection: ConnectionId,
        word: &str,
    ) -> Result<(String, bool), GameError> {
        let mut session = self.lock(code).await?;
        if !session.config.scoring.claims_words() {
            return Err(GameError::InvalidInput(
                "words are not claimed in accumulator rooms".into(),
            ));
        }
        if session.phase() != RoundPhase::Active {
            return Err(GameError::NoActiveRound);
        }
        let team_id = session
            .player_by_connection(connection)
            .map(|player| player.team_id.clone())
            .ok_or_else(|| GameError::PlayerNotFound(connection.to_string()))?;
        let word = normalize_word(word);
        if word.is_empty() {
            return Err(GameError::InvalidInput("word must not be empty".into()));
        }

        let accepted = session
            .round
            .as_mut()
            .map(|round| {
                round
                    .claims
                    .entry(team_id.clone())
                    .or_default()
                    .insert(word.clone())
            })
            .unwrap_or(false);
        if accepted {
            let message = ServerMessage::WordAccepted {
                room_code: session.code.clone(),
                team_id: team_id.clone(),
                word: word.clone(),
            };
            for member in session.team_connections(&team_id) {
                self.deps.broadcaster.send_to_connection(member, &message);
            }
            session.touch(self.now());
            self.publish(&session);
        }
        Ok((word, accepted))
    }

    /// Draw the next word for the active party of `code`.
    pub async fn next_word(&self, code: &str) -> Result<Word, GameError> {
        let mut session = self.lock(code).await?;
        if session.phase() != RoundPhase::Active {
            return Err(GameError::NoActiveRound);
        }
        let word = self
            .deps
            .words
            .next_word(
                &session.code,
                &session.config.categories,
                &session.config.custom_words,
            )
            .ok_or(GameError::NoWordsAvailable)?;
        session.touch(self.now());
        Ok(word)
    }

    /// Current state of `code`.
    pub async fn session_view(&self, code: &str) -> Result<SessionView, GameError> {
        let session = self.lock(code).await?;
        Ok(SessionView::from(&*session))
    }

    /// Close a room for everyone.
    pub async fn close_session(&self, code: &str, reason: CloseReason) -> Result<(), GameError> {
        let mut session = self.lock(code).await?;
        self.close_locked(&mut session, reason);
        Ok(())
    }

    fn close_locked(&self, session: &mut Session, reason: CloseReason) {
        session.closed = true;
        let code = session.code.clone();
        self.scheduler.cancel(&code);
        self.sessions.remove(&code);

        self.deps.broadcaster.send_to_room(
            &code,
            &ServerMessage::GameEnded {
                room_code: code.clone(),
                reason,
            },
        );
        self.deps.broadcaster.close_room(&code);
        self.deps.words.forget(&code);
        self.deps.snapshots.delete(&code);
        info!(room = %code, reason = ?reason, "room closed");
        self.deps.notifier.notify(Notification::RoomClosed {
            room_code: code,
            reason,
        });
    }

    /// Summaries of every live room, sorted by code.
    pub async fn list_rooms(&self) -> Vec<RoomListItem> {
        let mut rooms = Vec::new();
        for handle in self.all_handles() {
            let session = handle.lock().await;
            if !session.closed {
                rooms.push(RoomListItem::from(&*session));
            }
        }
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        rooms
    }

    /// Close every room idle for longer than the configured inactivity timeout.
    pub async fn sweep_inactive(&self) -> Vec<String> {
        let timeout = self.deps.config.inactivity_timeout;
        let mut swept = Vec::new();
        for handle in self.all_handles() {
            let mut session = handle.lock().await;
            if session.closed {
                continue;
            }
            let idle = self
                .now()
                .duration_since(session.last_activity)
                .unwrap_or_default();
            if idle > timeout {
                swept.push(session.code.clone());
                self.close_locked(&mut session, CloseReason::Expired);
            }
        }
        swept
    }

    /// Load every snapshot of `store` and restore the rooms it holds.
    ///
    /// Pending snapshot writes, postponed removals included, are applied first.
    pub async fn restore_from(&self, store: Arc<dyn SnapshotStore>) -> RestoreReport {
        if let Err(err) = self.flush_snapshots().await {
            warn!(error = %err, "failed to flush pending snapshot writes before restore");
        }
        match store.get_all().await {
            Ok(rows) => self.restore(rows).await,
            Err(err) => {
                warn!(error = %err, "failed to load snapshots; starting empty");
                RestoreReport::default()
            }
        }
    }

    /// Restore rooms from snapshot rows.
    ///
    /// Undecodable rows are skipped. Rounds that were active get their remaining time
    /// reduced by the time elapsed since the snapshot; those that ran out are committed
    /// with [`FinishReason::Timer`], the others resume their countdown.
    pub async fn restore(&self, rows: Vec<StoredSnapshot>) -> RestoreReport {
        let mut report = RestoreReport::default();
        let now = self.now();

        for row in rows {
            let (session, persisted_at) = match snapshot::decode(&row) {
                Ok(decoded) => decoded,
                Err(err) => {
                    warn!(room = %row.room_code, error = %err, "skipping unreadable snapshot");
                    report.skipped += 1;
                    continue;
                }
            };

            let code = session.code.clone();
            let handle = Arc::new(Mutex::new(session));
            match self.sessions.entry(code.clone()) {
                Entry::Occupied(_) => {
                    warn!(room = %code, "room already live; ignoring its snapshot");
                    report.skipped += 1;
                    continue;
                }
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(&handle));
                }
            }

            let mut session = handle.lock().await;
            report.restored += 1;
            let active_round = session
                .round
                .as_ref()
                .filter(|round| round.active)
                .map(|round| (round.id, round.seconds_left));
            let Some((round_id, seconds_left)) = active_round else {
                info!(room = %code, "room restored");
                continue;
            };

            let elapsed = elapsed_secs(persisted_at, now);
            let remaining = u64::from(seconds_left).saturating_sub(elapsed);
            if remaining == 0 {
                info!(room = %code, elapsed, "restored round ran out while offline");
                report.expired_rounds += 1;
                self.finalize_locked(&mut session, FinishReason::Timer);
            } else {
                if let Some(round) = session.round.as_mut() {
                    round.seconds_left = remaining as u32;
                }
                info!(room = %code, seconds_left = remaining, "room restored; round resumed");
                self.schedule_countdown(&code, round_id);
            }
        }

        info!(
            restored = report.restored,
            expired_rounds = report.expired_rounds,
            skipped = report.skipped,
            "snapshot restore finished"
        );
        report
    }

    /// Resolve once every snapshot write queued so far was applied.
    pub async fn flush_snapshots(&self) -> StorageResult<()> {
        self.deps.snapshots.flush().await
    }

    /// Stop every countdown and wait for queued snapshots to be written.
    pub async fn shutdown(&self) {
        self.scheduler.cancel_all();
        if let Err(err) = self.flush_snapshots().await {
            warn!(error = %err, "failed to flush snapshots on shutdown");
        }
        info!(rooms = self.sessions.len(), "session registry stopped");
    }
}

fn generate_room_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length.max(1))
        .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
        .collect()
}

fn distinct_trimmed(values: Vec<String>) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}
