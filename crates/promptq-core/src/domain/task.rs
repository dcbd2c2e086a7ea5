use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DedupeKey, TaskId};

/// Caller-defined key/value mapping, passed through unmodified.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A unit of work held by the TaskStore.
///
/// `completed` only ever goes false -> true.
/// `lease_until` keeps the last lease for diagnostics; an expired value counts as "not leased".
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: TaskId,
    pub prompt: String,
    pub metadata: Metadata,
    pub dedupe_key: DedupeKey,
    pub lease_until: Option<DateTime<Utc>>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// The prompt is stored trimmed; emptiness is checked by the store on append.
    pub fn new(
        task_id: TaskId,
        prompt: &str,
        metadata: Metadata,
        dedupe_key: DedupeKey,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            prompt: prompt.trim().to_string(),
            metadata,
            dedupe_key,
            lease_until: None,
            completed: false,
            created_at,
        }
    }

    /// Holds a lease that has not yet expired at `now`.
    pub fn is_leased_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lease_until, Some(until) if until > now)
    }

    /// Not completed and not validly leased.
    pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
        !self.completed && !self.is_leased_at(now)
    }

    /// Dispatch-relevant fields only (never the completion state).
    pub fn envelope(&self) -> PromptEnvelope {
        PromptEnvelope {
            task_id: self.task_id.clone(),
            prompt: self.prompt.clone(),
            metadata: self.metadata.clone(),
            dedupe_key: self.dedupe_key.clone(),
        }
    }

    pub fn view_at(&self, now: DateTime<Utc>) -> TaskView {
        TaskView {
            task_id: self.task_id.clone(),
            prompt: self.prompt.clone(),
            metadata: self.metadata.clone(),
            dedupe_key: self.dedupe_key.clone(),
            lease_until: self.lease_until,
            leased: self.is_leased_at(now),
            completed: self.completed,
            created_at: self.created_at,
        }
    }
}

/// Input of `submit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrompt {
    pub prompt: String,
    #[serde(default, rename = "meta", alias = "metadata")]
    pub metadata: Metadata,
    #[serde(default)]
    pub dedupe_key: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl NewPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn with_task_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Output of `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submitted {
    pub task_id: TaskId,
    pub dedupe_key: DedupeKey,
}

/// What a worker receives from `lease-next`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptEnvelope {
    pub task_id: TaskId,
    pub prompt: String,
    #[serde(default, rename = "meta", alias = "metadata")]
    pub metadata: Metadata,
    pub dedupe_key: DedupeKey,
}

/// Read-only inspection view of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub task_id: TaskId,
    pub prompt: String,
    #[serde(default, rename = "meta", alias = "metadata")]
    pub metadata: Metadata,
    pub dedupe_key: DedupeKey,
    pub lease_until: Option<DateTime<Utc>>,
    pub leased: bool,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}
