//! Rolling outcome window for failure-rate evaluation.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Outcome {
    at: Instant,
    failed: bool,
}

/// The last `capacity` call outcomes, optionally limited by age.
#[derive(Debug)]
pub struct OutcomeWindow {
    outcomes: VecDeque<Outcome>,
    failures: usize,
    capacity: usize,
    max_age: Option<Duration>,
}

impl OutcomeWindow {
    pub fn new(capacity: usize, max_age: Option<Duration>) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            failures: 0,
            capacity,
            max_age,
        }
    }

    /// Record one outcome, evicting the oldest beyond capacity.
    pub fn record(&mut self, failed: bool, now: Instant) {
        self.evict_expired(now);
        if self.outcomes.len() == self.capacity {
            self.pop_oldest();
        }
        self.outcomes.push_back(Outcome { at: now, failed });
        if failed {
            self.failures += 1;
        }
    }

    /// True when at least `minimum_calls` outcomes are present and the
    /// failure ratio strictly exceeds `threshold`.
    pub fn exceeds(&mut self, threshold: f64, minimum_calls: usize, now: Instant) -> bool {
        self.evict_expired(now);
        let total = self.outcomes.len();
        if total == 0 || total < minimum_calls {
            return false;
        }
        self.failures as f64 / total as f64 > threshold
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    fn evict_expired(&mut self, now: Instant) {
        let Some(max_age) = self.max_age else {
            return;
        };
        while let Some(oldest) = self.outcomes.front() {
            if now.saturating_duration_since(oldest.at) <= max_age {
                break;
            }
            self.pop_oldest();
        }
    }

    fn pop_oldest(&mut self) {
        if let Some(oldest) = self.outcomes.pop_front() {
            if oldest.failed {
                self.failures -= 1;
            }
        }
    }
}
