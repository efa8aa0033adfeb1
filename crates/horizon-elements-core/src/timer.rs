//! One-shot timer queue for the document event loop.
//!
//! Timers are keyed to the document clock rather than the wall clock, so a
//! document with a manual clock fires them deterministically when advanced.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::error::TimerError;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// The callback run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Internal timer data.
struct TimerData {
    /// When this timer should fire.
    fire_time: Instant,
    /// The callback to run, taken when the timer fires.
    callback: TimerCallback,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
    /// Insertion sequence, so timers with equal fire times run in start order.
    seq: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Manages the pending one-shot timers of a document.
#[derive(Default)]
pub struct TimerManager {
    /// All pending timers.
    timers: SlotMap<TimerId, TimerData>,
    /// Priority queue of pending timer fires (min-heap by fire time).
    queue: BinaryHeap<TimerQueueEntry>,
    /// Next insertion sequence number.
    next_seq: u64,
}

impl TimerManager {
    /// Create a new timer manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a one-shot timer that fires `duration` after `now`.
    ///
    /// Returns the timer ID that can be used to cancel the timer.
    pub fn start_one_shot(
        &mut self,
        now: Instant,
        duration: Duration,
        callback: TimerCallback,
    ) -> TimerId {
        let fire_time = now + duration;
        let id = self.timers.insert(TimerData {
            fire_time,
            callback,
        });
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(TimerQueueEntry { id, fire_time, seq });
        id
    }

    /// Stop and remove a pending timer.
    pub fn stop(&mut self, id: TimerId) -> Result<(), TimerError> {
        self.timers
            .remove(id)
            .map(|_| ())
            .ok_or(TimerError::InvalidTimerId)
    }

    /// Check if a timer is still pending.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Get the duration from `now` until the next timer fires, if any.
    pub fn time_until_next(&mut self, now: Instant) -> Option<Duration> {
        // Drop stopped timers from the front of the queue.
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }

        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(now))
    }

    /// Remove the earliest timer due at `now` and return its callback.
    ///
    /// The callback is returned rather than run so the caller can release its
    /// lock before invoking it. Taking one timer at a time lets a callback stop
    /// a later timer that is due in the same pass.
    pub fn pop_expired(&mut self, now: Instant) -> Option<(TimerId, TimerCallback)> {
        while let Some(entry) = self.queue.peek() {
            if entry.fire_time > now {
                return None;
            }
            let entry = self.queue.pop()?;

            // Stopped timers leave stale queue entries behind.
            if let Some(timer) = self.timers.remove(entry.id) {
                tracing::trace!(target: targets::TIMER, id = ?entry.id, "timer fired");
                return Some((entry.id, timer.callback));
            }
        }
        None
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager")
            .field("active", &self.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn counter_callback(counter: &Arc<AtomicUsize>) -> TimerCallback {
        let counter = counter.clone();
        Box::new(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        })
    }

    #[test]
    fn test_timer_fires_once_when_due() {
        let mut timers = TimerManager::new();
        let start = Instant::now();
        let fired = Arc::new(AtomicUsize::new(0));

        let id = timers.start_one_shot(start, Duration::from_millis(100), counter_callback(&fired));
        assert!(timers.is_active(id));

        assert!(timers.pop_expired(start + Duration::from_millis(99)).is_none());

        let (fired_id, callback) = timers
            .pop_expired(start + Duration::from_millis(100))
            .expect("timer should be due");
        assert_eq!(fired_id, id);
        callback();
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);
        assert!(!timers.is_active(id));
        assert!(timers.pop_expired(start + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_stop_timer() {
        let mut timers = TimerManager::new();
        let start = Instant::now();
        let fired = Arc::new(AtomicUsize::new(0));

        let id = timers.start_one_shot(start, Duration::from_millis(10), counter_callback(&fired));
        assert!(timers.stop(id).is_ok());
        assert_eq!(timers.stop(id), Err(TimerError::InvalidTimerId));

        assert!(timers.pop_expired(start + Duration::from_secs(1)).is_none());
        assert_eq!(timers.active_count(), 0);
    }

    #[test]
    fn test_expired_in_fire_order() {
        let mut timers = TimerManager::new();
        let start = Instant::now();
        let fired = Arc::new(AtomicUsize::new(0));

        let late = timers.start_one_shot(start, Duration::from_millis(30), counter_callback(&fired));
        let early = timers.start_one_shot(start, Duration::from_millis(10), counter_callback(&fired));
        let tie = timers.start_one_shot(start, Duration::from_millis(10), counter_callback(&fired));

        let now = start + Duration::from_millis(50);
        let ids: Vec<TimerId> = std::iter::from_fn(|| timers.pop_expired(now))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![early, tie, late]);
    }

    #[test]
    fn test_time_until_next_skips_stopped() {
        let mut timers = TimerManager::new();
        let start = Instant::now();
        let fired = Arc::new(AtomicUsize::new(0));

        let first = timers.start_one_shot(start, Duration::from_millis(5), counter_callback(&fired));
        timers.start_one_shot(start, Duration::from_millis(20), counter_callback(&fired));
        timers.stop(first).unwrap();

        assert_eq!(timers.time_until_next(start), Some(Duration::from_millis(20)));
        assert_eq!(
            timers.time_until_next(start + Duration::from_millis(25)),
            Some(Duration::ZERO)
        );
    }
}
