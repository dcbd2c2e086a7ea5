//! Dedupe keys and the fallback rule used to resolve them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::TaskId;

/// Key under which a completion result is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupeKey(String);

impl DedupeKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Content-stable key for a task id: lowercase hex SHA-256 of the id.
    pub fn derive(task_id: &TaskId) -> Self {
        let digest = Sha256::digest(task_id.as_str().as_bytes());
        Self(hex::encode(digest))
    }

    /// Caller-supplied key, `None` when absent or blank.
    pub fn supplied(raw: Option<&str>) -> Option<Self> {
        raw.filter(|s| !s.trim().is_empty()).map(Self::new)
    }

    /// Resolve the effective key.
    ///
    /// Order: caller-supplied → the task's stored key → `derive(task_id)`.
    pub fn resolve(
        supplied: Option<DedupeKey>,
        stored: Option<&DedupeKey>,
        task_id: &TaskId,
    ) -> Self {
        supplied
            .or_else(|| stored.cloned())
            .unwrap_or_else(|| Self::derive(task_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
