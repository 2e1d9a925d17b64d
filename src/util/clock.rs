//! Wall-clock timestamps that never go backwards.

use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// Milliseconds since the Unix epoch for a `SystemTime`.
pub fn epoch_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}

/// Millisecond clock clamped to be non-decreasing.
///
/// Wall time can step backwards (NTP, manual changes); snapshots from one
/// collector must still carry non-decreasing timestamps, so a reading older
/// than the previous one is replaced by the previous one.
#[derive(Debug, Clone, Default)]
pub struct MonotonicClock {
    last: Option<i64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in milliseconds since the Unix epoch.
    pub fn now_millis(&mut self) -> i64 {
        self.observe(Utc::now().timestamp_millis())
    }

    /// Clamps an externally obtained timestamp against the previous one.
    pub fn observe(&mut self, millis: i64) -> i64 {
        let ts = match self.last {
            Some(last) => last.max(millis),
            None => millis,
        };
        self.last = Some(ts);
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_observe_never_goes_backwards() {
        let mut clock = MonotonicClock::new();
        assert_eq!(clock.observe(100), 100);
        assert_eq!(clock.observe(90), 100);
        assert_eq!(clock.observe(100), 100);
        assert_eq!(clock.observe(150), 150);
    }

    #[test]
    fn test_now_is_non_decreasing() {
        let mut clock = MonotonicClock::new();
        let mut prev = clock.now_millis();
        for _ in 0..100 {
            let now = clock.now_millis();
            assert!(now >= prev);
            prev = now;
        }
        // Sanity: after 2020-01-01.
        assert!(prev > 1_577_836_800_000);
    }

    #[test]
    fn test_epoch_millis() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(epoch_millis(t), 1_700_000_000_123);
    }
}
