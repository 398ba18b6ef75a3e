//! Time sources and the cancellable simulated-matching timer queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::request::RequestId;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(instant.timestamp_millis())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, AtomicOrdering::SeqCst);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis
            .store(instant.timestamp_millis(), AtomicOrdering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(AtomicOrdering::SeqCst))
            .unwrap_or_default()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Handle for one armed matching timer.
///
/// Cancellation and firing both consume the token's timer entry; whichever happens first
/// wins and the other becomes a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchToken {
    request_id: RequestId,
    generation: u64,
}

impl MatchToken {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledMatch {
    deadline_ms: i64,
    token: MatchToken,
}

impl Ord for ScheduledMatch {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by deadline.
        other
            .deadline_ms
            .cmp(&self.deadline_ms)
            .then_with(|| other.token.generation.cmp(&self.token.generation))
    }
}

impl PartialOrd for ScheduledMatch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending simulated-matching deadlines, earliest first.
#[derive(Debug, Default)]
pub struct MatchTimers {
    events: BinaryHeap<ScheduledMatch>,
    next_generation: u64,
}

impl MatchTimers {
    pub fn schedule(&mut self, request_id: RequestId, deadline: DateTime<Utc>) -> MatchToken {
        self.next_generation += 1;
        let token = MatchToken {
            request_id,
            generation: self.next_generation,
        };
        self.events.push(ScheduledMatch {
            deadline_ms: deadline.timestamp_millis(),
            token,
        });
        token
    }

    /// Remove the timer for `token`. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, token: MatchToken) -> bool {
        let before = self.events.len();
        self.events.retain(|event| event.token != token);
        self.events.len() != before
    }

    /// Pop the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<MatchToken> {
        let now_ms = now.timestamp_millis();
        if self.events.peek()?.deadline_ms > now_ms {
            return None;
        }
        self.events.pop().map(|event| event.token)
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.events
            .peek()
            .and_then(|event| DateTime::from_timestamp_millis(event.deadline_ms))
    }

    pub fn is_armed(&self, token: MatchToken) -> bool {
        self.events.iter().any(|event| event.token == token)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn timers_pop_in_deadline_order_once_due() {
        let mut timers = MatchTimers::default();
        let late = timers.schedule(1, t(20));
        let early = timers.schedule(2, t(5));
        let middle = timers.schedule(3, t(10));

        assert_eq!(timers.pop_due(t(4)), None);
        assert_eq!(timers.next_deadline(), Some(t(5)));
        assert_eq!(timers.pop_due(t(10)), Some(early));
        assert_eq!(timers.pop_due(t(10)), Some(middle));
        assert_eq!(timers.pop_due(t(10)), None);
        assert_eq!(timers.pop_due(t(25)), Some(late));
        assert!(timers.is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timers = MatchTimers::default();
        let token = timers.schedule(7, t(100));
        assert!(timers.is_armed(token));
        assert!(timers.cancel(token));
        assert!(!timers.cancel(token), "second cancel is a no-op");
        assert_eq!(timers.pop_due(t(1_000)), None);
    }

    #[test]
    fn fired_timer_cannot_be_cancelled() {
        let mut timers = MatchTimers::default();
        let token = timers.schedule(7, t(100));
        assert_eq!(timers.pop_due(t(100)), Some(token));
        assert!(!timers.cancel(token));
    }

    #[test]
    fn tokens_for_same_request_are_distinct() {
        let mut timers = MatchTimers::default();
        let first = timers.schedule(7, t(100));
        let second = timers.schedule(7, t(100));
        assert_ne!(first, second);
        assert!(timers.cancel(first));
        assert!(timers.is_armed(second));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at(t(1_000));
        let observer = clock.clone();
        clock.advance(Duration::from_millis(2_500));
        assert_eq!(observer.now(), t(3_500));
    }
}
