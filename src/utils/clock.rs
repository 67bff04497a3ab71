//! Time sources for the timer engine

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::time::Instant;

/// Source of the current timestamp
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock anchor advanced by the Tokio monotonic clock.
///
/// Ignores wall-clock jumps after creation, and follows Tokio's paused
/// test time when the runtime clock is paused. Must be created inside a
/// Tokio runtime when time is paused.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor_utc: DateTime<Utc>,
    anchor_instant: Instant,
}

impl MonotonicClock {
    /// Anchor to the current wall-clock time
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchor to an explicit wall-clock time
    pub fn anchored_at(anchor_utc: DateTime<Utc>) -> Self {
        Self {
            anchor_utc,
            anchor_instant: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.anchor_instant.elapsed();
        ChronoDuration::from_std(elapsed)
            .ok()
            .and_then(|delta| self.anchor_utc.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn manual_clock_moves_only_on_request() {
        let t0 = Utc::now();
        let clock = ManualClock::new(t0);
        assert_eq!(clock.now(), t0);
        clock.advance(ChronoDuration::seconds(3));
        assert_eq!(clock.now(), t0 + ChronoDuration::seconds(3));
        clock.set(t0);
        assert_eq!(clock.now(), t0);
    }

    #[tokio::test(start_paused = true)]
    async fn monotonic_clock_follows_paused_time() {
        let t0 = Utc::now();
        let clock = MonotonicClock::anchored_at(t0);
        assert_eq!(clock.now(), t0);
        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), t0 + ChronoDuration::seconds(90));
    }
}
