//! In-memory named counters.
//!
//! # Responsibilities
//! - Lazily create counters on first reference (increment, reset or get)
//! - Linearizable increment/reset per key
//! - Snapshot enumeration
//!
//! # Design Decisions
//! - Each key owns an `AtomicI64` cell; the map shard lock is held only to
//!   find or create the cell, never during the update itself
//! - Cells are never handed out: all access goes through `CounterStore`
//! - Counters live for the process lifetime (no delete)

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Public view of a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterView {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Default)]
struct Counter {
    value: AtomicI64,
}

/// Registry of named counters, safe under concurrent access.
#[derive(Debug, Default)]
pub struct CounterStore {
    counters: DashMap<String, Arc<Counter>>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &str) -> Arc<Counter> {
        if let Some(counter) = self.counters.get(key) {
            return counter.clone();
        }
        self.counters.entry(key.to_string()).or_default().clone()
    }

    /// Increment `key`, returning the value before the increment.
    pub fn increment(&self, key: &str) -> i64 {
        metrics::record_counter_op("increment");
        let previous = self.cell(key).value.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(key = %key, previous, "Counter incremented");
        previous
    }

    #[cfg(test)]
    pub(crate) fn set(&self, key: &str, value: i64) {
        self.cell(key).value.store(value, Ordering::SeqCst);
    }

    /// Reset `key` to 0, creating it if absent.
    pub fn reset(&self, key: &str) -> i64 {
        metrics::record_counter_op("reset");
        self.cell(key).value.store(0, Ordering::SeqCst);
        tracing::debug!(key = %key, "Counter reset");
        0
    }

    /// Current value of `key`, creating it at 0 if absent.
    pub fn get(&self, key: &str) -> i64 {
        metrics::record_counter_op("get");
        self.cell(key).value.load(Ordering::SeqCst)
    }

    /// Point-in-time value of every counter. Each value is read atomically;
    /// values of different keys may come from different instants.
    pub fn list(&self) -> Vec<CounterView> {
        metrics::record_counter_op("list");
        let mut views: Vec<CounterView> = self
            .counters
            .iter()
            .map(|entry| CounterView {
                name: entry.key().clone(),
                value: entry.value().value.load(Ordering::SeqCst),
            })
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        views
    }

    /// Reset every known counter to 0.
    pub fn reset_all(&self) {
        metrics::record_counter_op("reset_all");
        for entry in self.counters.iter() {
            entry.value().value.store(0, Ordering::SeqCst);
        }
        tracing::info!(counters = self.counters.len(), "All counters reset");
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
