//! LeaseScheduler: picks the next dispatchable task and installs a lease.

use chrono::{DateTime, Utc};

use super::TaskStore;
use crate::domain::{LeaseTtl, PromptEnvelope};

/// Result of one scheduling scan.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaseDecision {
    pub envelope: PromptEnvelope,
    pub lease_until: DateTime<Utc>,
    /// The chosen task had a previous lease that had run out.
    pub reclaimed_expired: bool,
}

/// Stateless; operates on the store it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaseScheduler;

impl LeaseScheduler {
    /// Lease the first eligible task in insertion order.
    ///
    /// Eligible = not completed, and never leased or `lease_until <= now`.
    /// Validly leased tasks are skipped, not reordered. Only the chosen task is
    /// inspected for expiry; the scan stops at the first hit.
    pub fn lease_next(
        &self,
        store: &mut TaskStore,
        now: DateTime<Utc>,
        ttl: LeaseTtl,
    ) -> Option<LeaseDecision> {
        let task = store.iter_mut().find(|t| t.is_eligible_at(now))?;

        let reclaimed_expired = task.lease_until.is_some();
        let lease_until = now + ttl.as_delta();
        task.lease_until = Some(lease_until);

        Some(LeaseDecision {
            envelope: task.envelope(),
            lease_until,
            reclaimed_expired,
        })
    }
}
