//! Composite queue state guarded by a single lock.

use chrono::{DateTime, Utc};

use super::{
    Completion, LeaseDecision, LeaseScheduler, MetricsCounter, ResponseRegistry, TaskStore,
};
use crate::domain::{CompletionVersion, LeaseTtl, QueueError, ResponseEnvelope, Task};

/// Everything the queue mutates.
///
/// Design:
/// - One owned value per process (or per test), injected into `QueueService`.
/// - Every method here is a complete read-then-write step; the service runs each one
///   under its single mutex, so no two steps interleave.
/// - No I/O in here (logging happens after the lock is released).
#[derive(Debug, Default)]
pub struct QueueState {
    pub(crate) store: TaskStore,
    pub(crate) registry: ResponseRegistry,
    pub(crate) metrics: MetricsCounter,
    scheduler: LeaseScheduler,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, task: Task) -> Result<&Task, QueueError> {
        let task = self.store.append(task)?;
        self.metrics.record_enqueued();
        Ok(task)
    }

    pub fn lease_next(&mut self, now: DateTime<Utc>, ttl: LeaseTtl) -> Option<LeaseDecision> {
        let decision = self.scheduler.lease_next(&mut self.store, now, ttl)?;
        if decision.reclaimed_expired {
            self.metrics.record_lease_expired();
        }
        self.metrics.record_fetched();
        Some(decision)
    }

    pub fn complete(&mut self, envelope: ResponseEnvelope) -> Result<Completion, QueueError> {
        let done = self.registry.complete(&mut self.store, envelope)?;
        if done.version == CompletionVersion::Fresh {
            self.metrics.record_posted();
        }
        Ok(done)
    }
}
