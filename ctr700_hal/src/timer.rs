//! Timer queue of the event loop.
//!
//! One-shot and interval timers keyed by `TimerId`, ordered by deadline.
//! The queue never reads the clock itself; callers pass `now`, which keeps
//! firing deterministic under test.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

/// Handle of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct TimerEntry<T> {
    event: T,
    period: Option<Duration>,
}

/// Deadline-ordered timers carrying an event of type `T`.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<(Instant, TimerId)>>,
    entries: HashMap<TimerId, TimerEntry<T>>,
    next_id: u64,
}

impl<T: Clone> TimerQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            entries: HashMap::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, due: Instant, event: T, period: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, TimerEntry { event, period });
        self.heap.push(Reverse((due, id)));
        id
    }

    /// Fire `event` once after `delay`.
    pub fn schedule_once(&mut self, now: Instant, delay: Duration, event: T) -> TimerId {
        self.insert(now + delay, event, None)
    }

    /// Fire `event` every `period`, first after one period.
    pub fn schedule_interval(&mut self, now: Instant, period: Duration, event: T) -> TimerId {
        self.insert(now + period, event, Some(period))
    }

    /// Cancel a timer; returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        // The heap entry stays until it surfaces and is skipped.
        self.entries.remove(&id).is_some()
    }

    /// `true` if the timer is still armed.
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse((due, id))) = self.heap.peek().copied() {
            if self.entries.contains_key(&id) {
                return Some(due);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop the next timer due at `now`.
    ///
    /// Interval timers are re-armed one period after their deadline; if that
    /// is already in the past, missed ticks are skipped and the timer is
    /// re-armed one period after `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, T)> {
        loop {
            let Reverse((due, id)) = *self.heap.peek()?;
            if due > now {
                return None;
            }
            self.heap.pop();

            let Some(entry) = self.entries.get(&id) else {
                continue;
            };
            let event = entry.event.clone();
            match entry.period {
                Some(period) => {
                    let mut next = due + period;
                    if next <= now {
                        next = now + period;
                    }
                    self.heap.push(Reverse((next, id)));
                }
                None => {
                    self.entries.remove(&id);
                }
            }
            return Some((id, event));
        }
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
