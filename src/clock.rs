use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for every timer-driven state machine in the crate.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Virtual clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = offset(*guard, by);
        }
    }

    pub fn advance_ms(&self, millis: i64) {
        self.advance(Duration::milliseconds(millis));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = to;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

pub type SharedClock = Arc<dyn Clock>;

/// Longest delay any timer accepts; larger configured values are capped.
pub const MAX_DELAY_MS: u64 = 365 * 24 * 60 * 60 * 1_000;

/// Config-file milliseconds as a chrono duration, capped at [`MAX_DELAY_MS`].
pub fn millis(value: u64) -> Duration {
    Duration::milliseconds(i64::try_from(value.min(MAX_DELAY_MS)).unwrap_or(i64::MAX))
}

/// `at + by`, pinned to the latest representable instant on overflow.
pub fn offset(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::default();
        let start = clock.now();
        assert_eq!(clock.now(), start);
        clock.advance_ms(1_500);
        assert_eq!(clock.now() - start, Duration::milliseconds(1_500));
    }

    #[test]
    fn millis_caps_huge_values() {
        assert_eq!(millis(u64::MAX), millis(MAX_DELAY_MS));
        assert_eq!(millis(1_500), Duration::milliseconds(1_500));
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::seconds(1);
        assert_eq!(offset(late, Duration::days(10)), DateTime::<Utc>::MAX_UTC);
        let start = DateTime::<Utc>::UNIX_EPOCH;
        assert_eq!(offset(start, Duration::seconds(2)) - start, Duration::seconds(2));
    }

    #[test]
    fn clones_share_the_same_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        clock.advance(Duration::seconds(3));
        assert_eq!(other.now(), clock.now());
    }
}
