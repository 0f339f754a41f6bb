//! Bounded in-memory history of recent alerts.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::domain::ArbitrageAlert;

/// AlertHistory keeps the last `capacity` alerts, oldest evicted first.
#[derive(Debug)]
pub struct AlertHistory {
    capacity: usize,
    entries: Mutex<VecDeque<ArbitrageAlert>>,
}

impl AlertHistory {
    /// Creates a history holding at most `capacity` alerts (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, alert: ArbitrageAlert) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(alert);
    }

    /// Returns up to `n` alerts, newest first.
    pub fn recent(&self, n: usize) -> Vec<ArbitrageAlert> {
        self.entries.lock().iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
