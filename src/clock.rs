//! Time sources for expiring state.
//!
//! The cache never reads the wall clock directly so tests and the simulator can
//! step time forward deterministically.

use crate::types::Timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock. Starts where it is told and only moves on `advance`/`set`.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.millis.store(timestamp.as_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance((secs as i64).saturating_mul(1_000));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(Timestamp::from_millis(500));
        assert_eq!(clock.now().as_millis(), 500);

        clock.advance(250);
        assert_eq!(clock.now().as_millis(), 750);

        clock.advance_secs(2);
        assert_eq!(clock.now().as_millis(), 2_750);

        clock.set(Timestamp::from_millis(0));
        assert_eq!(clock.now().as_millis(), 0);
    }

    #[test]
    fn system_clock_is_recent() {
        // anything after 2020-01-01
        assert!(SystemClock.now().as_millis() > 1_577_836_800_000);
    }
}
