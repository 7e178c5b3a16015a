//! Circuit breaker for outbound call protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: target assumed down, requests fail fast to the fallback
//! - Half-Open: one trial request tests whether the target recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure ratio over the rolling window > threshold
//! Open → Half-Open: open_duration elapsed (observed by the next caller)
//! Half-Open → Closed: trial succeeds (window cleared)
//! Half-Open → Open: trial fails (timer restarted)
//! ```
//!
//! # Design Decisions
//! - State and the instant it was entered share one `AtomicU64`, so every
//!   transition is a single compare-and-set and only one thread wins it
//! - Admission reads are lock-free; the outcome window sits behind a mutex
//! - Single trial in Half-Open; concurrent callers are short-circuited
//! - Short-circuited calls are never recorded in the window

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::window::OutcomeWindow;

/// Circuit state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_word(word: u64) -> Self {
        match word & STATE_MASK {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const STATE_BITS: u32 = 2;
const STATE_MASK: u64 = 0b11;

fn pack(state: CircuitState, since_ms: u64) -> u64 {
    (since_ms << STATE_BITS) | state as u64
}

fn entered_ms(word: u64) -> u64 {
    word >> STATE_BITS
}

/// Breaker guarding calls from one caller to one target.
#[derive(Debug)]
pub struct CircuitBreaker {
    target: String,
    config: BreakerConfig,
    epoch: Instant,
    word: AtomicU64,
    trial_in_flight: AtomicBool,
    window: Mutex<OutcomeWindow>,
}

impl CircuitBreaker {
    /// A new breaker starts Closed with an empty window.
    pub fn new(target: impl Into<String>, config: BreakerConfig) -> Self {
        let window = OutcomeWindow::new(config.window_size, config.window_duration());
        Self {
            target: target.into(),
            config,
            epoch: Instant::now(),
            word: AtomicU64::new(pack(CircuitState::Closed, 0)),
            trial_in_flight: AtomicBool::new(false),
            window: Mutex::new(window),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Current stored state.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_word(self.word.load(Ordering::Acquire))
    }

    /// Number of outcomes currently in the window.
    pub fn window_len(&self) -> usize {
        self.lock_window().len()
    }

    /// Ask to place a call. `None` means short-circuit to the fallback.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        loop {
            let word = self.word.load(Ordering::Acquire);
            match CircuitState::from_word(word) {
                CircuitState::Closed => return Some(Permit::new(self, false)),
                CircuitState::Open => {
                    let elapsed = self.now_ms().saturating_sub(entered_ms(word));
                    if elapsed < self.config.open_duration_ms {
                        return None;
                    }
                    // Losing the race is fine: someone else moved it on.
                    if self.transition(word, CircuitState::HalfOpen) {
                        tracing::info!(target_service = %self.target, "Circuit half-open, admitting trial call");
                    }
                }
                CircuitState::HalfOpen => {
                    if self
                        .trial_in_flight
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                    {
                        return None;
                    }
                    if self.state() == CircuitState::HalfOpen {
                        return Some(Permit::new(self, true));
                    }
                    self.trial_in_flight.store(false, Ordering::Release);
                }
            }
        }
    }

    fn on_outcome(&self, trial: bool, failed: bool) {
        if trial {
            self.on_trial_outcome(failed);
            return;
        }

        let mut window = self.lock_window();
        let word = self.word.load(Ordering::Acquire);
        // Outcome of a call admitted before the circuit left Closed.
        if CircuitState::from_word(word) != CircuitState::Closed {
            return;
        }
        let now = Instant::now();
        window.record(failed, now);
        let threshold = self.config.failure_threshold_ratio;
        if window.exceeds(threshold, self.config.minimum_calls(), now)
            && self.transition(word, CircuitState::Open)
        {
            tracing::warn!(
                target_service = %self.target,
                failures = window.failures(),
                calls = window.len(),
                "Circuit opened"
            );
        }
    }

    fn on_trial_outcome(&self, failed: bool) {
        let mut window = self.lock_window();
        let word = self.word.load(Ordering::Acquire);
        if CircuitState::from_word(word) == CircuitState::HalfOpen {
            if failed {
                if self.transition(word, CircuitState::Open) {
                    tracing::warn!(target_service = %self.target, "Trial call failed, circuit reopened");
                }
            } else if self.transition(word, CircuitState::Closed) {
                window.clear();
                tracing::info!(target_service = %self.target, "Trial call succeeded, circuit closed");
            }
        }
        drop(window);
        self.trial_in_flight.store(false, Ordering::Release);
    }

    /// Compare-and-set from the observed `word` to `to`, stamped now.
    fn transition(&self, word: u64, to: CircuitState) -> bool {
        let next = pack(to, self.now_ms());
        let won = self
            .word
            .compare_exchange(word, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            tracing::debug!(
                target_service = %self.target,
                from = %CircuitState::from_word(word),
                to = %to,
                "Circuit transition"
            );
            metrics::record_breaker_transition(&self.target, to);
        }
        won
    }

    fn now_ms(&self) -> u64 {
        Instant::now().saturating_duration_since(self.epoch).as_millis() as u64
    }

    fn lock_window(&self) -> MutexGuard<'_, OutcomeWindow> {
        self.window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Admission to place one call. Must be resolved with `success` or `failure`;
/// a permit dropped unresolved counts as a failed trial when it was the trial.
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    resolved: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            resolved: false,
        }
    }

    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.on_outcome(self.trial, false);
    }

    pub fn failure(mut self) {
        self.resolved = true;
        self.breaker.on_outcome(self.trial, true);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.resolved && self.trial {
            self.breaker.on_outcome(true, true);
        }
    }
}
