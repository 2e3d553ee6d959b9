use std::{
    sync::Mutex,
    time::{Duration, SystemTime},
};

/// Source of wall-clock time for timestamps and recovery arithmetic.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> SystemTime;
}

/// [`Clock`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Hand-driven [`Clock`] used by tests and tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: SystemTime) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Whole seconds elapsed between `earlier` and `later`, zero when `later` is not after `earlier`.
pub fn elapsed_secs(earlier: SystemTime, later: SystemTime) -> u64 {
    later
        .duration_since(earlier)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(SystemTime::UNIX_EPOCH);
        clock.advance(Duration::from_secs(45));
        assert_eq!(elapsed_secs(SystemTime::UNIX_EPOCH, clock.now()), 45);
    }

    #[test]
    fn elapsed_is_zero_for_future_timestamps() {
        let later = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        assert_eq!(elapsed_secs(later, SystemTime::UNIX_EPOCH), 0);
    }
}
