//! Process-wide counters.

use serde::{Deserialize, Serialize};

/// Counters live inside the queue state and are bumped under the same lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCounter {
    enqueued: u64,
    fetched: u64,
    posted: u64,
    leases_expired: u64,
}

impl MetricsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&mut self) {
        self.enqueued += 1;
    }

    pub fn record_fetched(&mut self) {
        self.fetched += 1;
    }

    pub fn record_posted(&mut self) {
        self.posted += 1;
    }

    pub fn record_lease_expired(&mut self) {
        self.leases_expired += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued,
            fetched: self.fetched,
            posted: self.posted,
            leases_expired: self.leases_expired,
        }
    }
}

/// Read-only copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub enqueued: u64,
    pub fetched: u64,
    pub posted: u64,
    pub leases_expired: u64,
}
