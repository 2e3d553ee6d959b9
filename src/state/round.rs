use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Phases a room goes through while playing rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No round exists; the room sits in its lobby.
    Idle,
    /// A round is running and its countdown is ticking.
    Active,
    /// Time is up and the host still has to judge the claimed words.
    Reviewing,
    /// Scores are being committed; the round is about to be cleared.
    Finished(FinishReason),
}

/// Why a round stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The host ended the round early.
    Manual,
    /// The countdown reached zero.
    Timer,
    /// The active party left the room.
    Disconnect,
    /// The host submitted the approved words of a reviewed round.
    Judged,
}

/// Events that can be applied to a room's round phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// Start a new round.
    Start,
    /// Stop the countdown and wait for the host to judge claims.
    Review(FinishReason),
    /// Stop the round and commit its scores.
    Finish(FinishReason),
    /// Scores committed; return to the lobby.
    Commit,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the room was in when the invalid event was received.
    pub from: RoundPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoundEvent,
}

impl RoundPhase {
    /// Compute the phase reached by applying `event`, if the transition is valid.
    pub fn next(self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        let next = match (self, event) {
            (RoundPhase::Idle, RoundEvent::Start) => RoundPhase::Active,
            (RoundPhase::Active, RoundEvent::Review(reason)) if reason != FinishReason::Judged => {
                RoundPhase::Reviewing
            }
            (RoundPhase::Active, RoundEvent::Finish(reason)) => RoundPhase::Finished(reason),
            (RoundPhase::Reviewing, RoundEvent::Finish(FinishReason::Judged)) => {
                RoundPhase::Finished(FinishReason::Judged)
            }
            (RoundPhase::Finished(_), RoundEvent::Commit) => RoundPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_round_cycle() {
        let phase = RoundPhase::Idle;
        let phase = phase.next(RoundEvent::Start).unwrap();
        assert_eq!(phase, RoundPhase::Active);
        let phase = phase.next(RoundEvent::Finish(FinishReason::Timer)).unwrap();
        assert_eq!(phase, RoundPhase::Finished(FinishReason::Timer));
        assert_eq!(phase.next(RoundEvent::Commit).unwrap(), RoundPhase::Idle);
    }

    #[test]
    fn reviewed_rounds_only_finish_through_judging() {
        let phase = RoundPhase::Active
            .next(RoundEvent::Review(FinishReason::Timer))
            .unwrap();
        assert_eq!(phase, RoundPhase::Reviewing);

        let err = phase
            .next(RoundEvent::Finish(FinishReason::Manual))
            .unwrap_err();
        assert_eq!(err.from, RoundPhase::Reviewing);

        assert_eq!(
            phase.next(RoundEvent::Finish(FinishReason::Judged)).unwrap(),
            RoundPhase::Finished(FinishReason::Judged)
        );
    }

    #[test]
    fn cannot_start_twice() {
        let err = RoundPhase::Active.next(RoundEvent::Start).unwrap_err();
        assert_eq!(err.event, RoundEvent::Start);
        assert!(RoundPhase::Reviewing.next(RoundEvent::Start).is_err());
    }

    #[test]
    fn idle_rejects_finish() {
        let err = RoundPhase::Idle
            .next(RoundEvent::Finish(FinishReason::Manual))
            .unwrap_err();
        assert_eq!(err.from, RoundPhase::Idle);
    }
}
