//! Per-domain change watermark.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Highest change timestamp seen by a poller. Never moves backwards.
///
/// Process-global and in memory: pollers re-read a fixed trailing window
/// every cycle, so a restart only resets the fallback used for records
/// whose timestamp fails to parse.
#[derive(Debug)]
pub struct Watermark {
    value: Mutex<DateTime<Utc>>,
}

impl Watermark {
    #[must_use]
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    /// Start `lag` behind `now`.
    #[must_use]
    pub fn lagging(now: DateTime<Utc>, lag: Duration) -> Self {
        Self::new(now - lag)
    }

    #[must_use]
    pub fn get(&self) -> DateTime<Utc> {
        *self.value.lock()
    }

    /// Move forward to `candidate` if it is newer. Returns the current value.
    pub fn advance(&self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        let mut value = self.value.lock();
        if candidate > *value {
            *value = candidate;
        }
        *value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_monotonic() {
        let start = Utc::now();
        let mark = Watermark::new(start);

        let later = start + Duration::minutes(10);
        assert_eq!(mark.advance(later), later);
        assert_eq!(mark.advance(start), later);
        assert_eq!(mark.get(), later);
    }

    #[test]
    fn lagging_starts_behind_now() {
        let now = Utc::now();
        let mark = Watermark::lagging(now, Duration::minutes(30));
        assert_eq!(now - mark.get(), Duration::minutes(30));
    }
}
