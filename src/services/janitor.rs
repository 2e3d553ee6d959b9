use std::{sync::Arc, time::Duration};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::registry::SessionRegistry;

/// Periodically close rooms that have been idle for too long.
pub async fn run(registry: Arc<SessionRegistry>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let swept = registry.sweep_inactive().await;
        if swept.is_empty() {
            debug!(rooms = registry.room_count(), "inactivity sweep found nothing");
        } else {
            info!(count = swept.len(), rooms = ?swept, "closed inactive rooms");
        }
    }
}
