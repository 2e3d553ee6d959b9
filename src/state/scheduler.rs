use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::{
    task::AbortHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::debug;
use uuid::Uuid;

/// Period between two countdown ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// What a countdown should do after a tick was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep ticking.
    Continue,
    /// The round is over (or gone); stop the countdown.
    Stop,
}

struct RoundTimer {
    round_id: Uuid,
    handle: AbortHandle,
}

/// Arena of per-room countdown tasks, at most one per room.
pub struct RoundScheduler {
    timers: Arc<DashMap<String, RoundTimer>>,
    period: Duration,
}

impl Default for RoundScheduler {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

impl RoundScheduler {
    /// Build a scheduler ticking every `period`.
    pub fn new(period: Duration) -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            period,
        }
    }

    /// Install the countdown of `round_id` for `room`, cancelling any countdown already there.
    ///
    /// `on_tick` runs once per period until it returns [`TickOutcome::Stop`].
    pub fn start<F, Fut>(&self, room: &str, round_id: Uuid, mut on_tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickOutcome> + Send + 'static,
    {
        self.cancel(room);

        let period = self.period;
        let timers = Arc::clone(&self.timers);
        let room_key = room.to_string();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if on_tick().await == TickOutcome::Stop {
                    break;
                }
            }
            timers.remove_if(&room_key, |_, timer| timer.round_id == round_id);
            debug!(room = %room_key, %round_id, "round countdown stopped");
        });

        let previous = self.timers.insert(
            room.to_string(),
            RoundTimer {
                round_id,
                handle: task.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
        }
    }

    /// Cancel whatever countdown runs for `room`. Returns whether one was installed.
    pub fn cancel(&self, room: &str) -> bool {
        match self.timers.remove(room) {
            Some((_, timer)) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel the countdown of `room` only if it belongs to `round_id`.
    pub fn cancel_round(&self, room: &str, round_id: Uuid) -> bool {
        match self
            .timers
            .remove_if(room, |_, timer| timer.round_id == round_id)
        {
            Some((_, timer)) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every countdown.
    pub fn cancel_all(&self) {
        let rooms = self
            .timers
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        for room in rooms {
            self.cancel(&room);
        }
    }

    /// Whether a live countdown is installed for `room`.
    pub fn is_running(&self, room: &str) -> bool {
        self.timers
            .get(room)
            .is_some_and(|timer| !timer.handle.is_finished())
    }

    /// Number of live countdowns.
    pub fn active_count(&self) -> usize {
        self.timers
            .iter()
            .filter(|timer| !timer.handle.is_finished())
            .count()
    }
}
