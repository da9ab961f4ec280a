//! Command Buffer statistics: relaxed atomics plus a bounded ring of recent errors.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Bound on `recent_errors` (spec.md §4.2: "a bounded ring of the last N (default 100)").
pub const RECENT_ERRORS_CAPACITY: usize = 100;

#[derive(Debug)]
pub struct Stats {
    commands_processed: AtomicU64,
    queries_processed: AtomicU64,
    commands_in_flight: AtomicUsize,
    capacity: usize,
    started_at: Instant,
    recent_errors: Mutex<VecDeque<String>>,
}

/// Point-in-time snapshot. Counters are each monotonic but the snapshot is
/// not transactional across them (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub commands_processed: u64,
    pub queries_processed: u64,
    pub commands_in_flight: usize,
    pub capacity: usize,
    pub uptime: std::time::Duration,
    pub recent_errors: Vec<String>,
}

impl Stats {
    pub fn new(capacity: usize) -> Self {
        Self {
            commands_processed: AtomicU64::new(0),
            queries_processed: AtomicU64::new(0),
            commands_in_flight: AtomicUsize::new(0),
            capacity,
            started_at: Instant::now(),
            recent_errors: Mutex::new(VecDeque::with_capacity(RECENT_ERRORS_CAPACITY)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn commands_in_flight(&self) -> usize {
        self.commands_in_flight.load(Ordering::Relaxed)
    }

    pub fn command_admitted(&self) {
        self.commands_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_completed(&self) {
        self.commands_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn query_completed(&self) {
        self.queries_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, message: impl Into<String>) {
        let mut guard = self.recent_errors.lock().expect("recent_errors mutex poisoned");
        if guard.len() >= RECENT_ERRORS_CAPACITY {
            guard.pop_front();
        }
        guard.push_back(message.into());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commands_processed: self.commands_processed.load(Ordering::Relaxed),
            queries_processed: self.queries_processed.load(Ordering::Relaxed),
            commands_in_flight: self.commands_in_flight.load(Ordering::Relaxed),
            capacity: self.capacity,
            uptime: self.started_at.elapsed(),
            recent_errors: self.recent_errors.lock().expect("recent_errors mutex poisoned").iter().cloned().collect(),
        }
    }
}
