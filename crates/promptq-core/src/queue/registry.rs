//! ResponseRegistry: idempotency ledger and committed results.

use std::collections::HashMap;

use super::TaskStore;
use crate::domain::{
    CompletionVersion, DedupeKey, QueueError, ResponseEnvelope, StoredResponse,
};

/// Outcome of a completion, with the key it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub key: DedupeKey,
    pub version: CompletionVersion,
}

/// At most one stored response per dedupe key; first writer wins.
#[derive(Debug, Default)]
pub struct ResponseRegistry {
    responses: HashMap<DedupeKey, StoredResponse>,
}

impl ResponseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completion.
    ///
    /// Check-then-write: nothing is mutated unless the key is new. The caller holds the
    /// queue lock for the whole call.
    pub fn complete(
        &mut self,
        store: &mut TaskStore,
        envelope: ResponseEnvelope,
    ) -> Result<Completion, QueueError> {
        let task = store.get_mut(&envelope.task_id)?;
        let key = DedupeKey::resolve(
            DedupeKey::supplied(envelope.dedupe_key.as_deref()),
            Some(&task.dedupe_key),
            &envelope.task_id,
        );

        if self.responses.contains_key(&key) {
            return Ok(Completion {
                key,
                version: CompletionVersion::Duplicate,
            });
        }

        task.completed = true;
        self.responses
            .insert(key.clone(), StoredResponse::new(key.clone(), envelope));
        Ok(Completion {
            key,
            version: CompletionVersion::Fresh,
        })
    }

    pub fn get(&self, key: &DedupeKey) -> Option<&StoredResponse> {
        self.responses.get(key)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
