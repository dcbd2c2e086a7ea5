//! Lease TTL bounds.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use super::QueueError;

/// Upper limit for `max_secs` in any configuration (one week).
pub const LEASE_SECS_CEILING: u64 = 7 * 24 * 60 * 60;

/// Allowed lease durations, in seconds.
///
/// Requests outside `[min_secs, max_secs]` are rejected, not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseBounds {
    pub min_secs: u64,
    pub max_secs: u64,
    /// Used when the caller does not ask for a specific TTL.
    pub default_secs: u64,
}

impl Default for LeaseBounds {
    fn default() -> Self {
        Self {
            min_secs: 10,
            max_secs: 600,
            default_secs: 120,
        }
    }
}

impl LeaseBounds {
    /// Validate a requested TTL (or fall back to the default).
    pub fn ttl(&self, requested: Option<u64>) -> Result<LeaseTtl, QueueError> {
        let secs = requested.unwrap_or(self.default_secs);
        let out_of_range = QueueError::LeaseTtlOutOfRange {
            requested: secs,
            min: self.min_secs,
            max: self.max_secs,
        };
        if secs < self.min_secs || secs > self.max_secs {
            return Err(out_of_range);
        }
        let delta = i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or(out_of_range)?;
        Ok(LeaseTtl { secs, delta })
    }

    /// min > 0, min <= default <= max, max <= `LEASE_SECS_CEILING`.
    pub fn is_consistent(&self) -> bool {
        self.min_secs > 0
            && self.min_secs <= self.default_secs
            && self.default_secs <= self.max_secs
            && self.max_secs <= LEASE_SECS_CEILING
    }
}

/// A validated lease duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseTtl {
    secs: u64,
    delta: TimeDelta,
}

impl LeaseTtl {
    pub fn secs(self) -> u64 {
        self.secs
    }

    pub fn as_delta(self) -> TimeDelta {
        self.delta
    }
}
