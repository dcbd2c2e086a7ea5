//! Completion reports.

use serde::{Deserialize, Serialize};

use super::{DedupeKey, TaskId};

/// Token accounting reported by the worker.
///
/// Kept as the JSON the worker sent (`prompt_tokens`, `completion_tokens`, ...) and served back
/// unchanged, unknown keys included.
pub type Usage = serde_json::Value;

/// A completion report.
///
/// `dedupe_key` is optional on the way in; the stored copy always carries the resolved key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub task_id: TaskId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedupe_key: Option<String>,
}

impl ResponseEnvelope {
    pub fn new(task_id: TaskId, content: impl Into<String>) -> Self {
        Self {
            task_id,
            content: content.into(),
            usage: None,
            trace_id: None,
            dedupe_key: None,
        }
    }

    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

/// Whether a completion was the first for its dedupe key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionVersion {
    Fresh,
    Duplicate,
}

/// Acknowledgment returned by `complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionAck {
    pub ok: bool,
    pub version: CompletionVersion,
}

impl From<CompletionVersion> for CompletionAck {
    fn from(version: CompletionVersion) -> Self {
        Self { ok: true, version }
    }
}

/// A stored completion: the envelope plus the key it was filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    pub dedupe_key: DedupeKey,
    pub task_id: TaskId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl StoredResponse {
    pub fn new(dedupe_key: DedupeKey, envelope: ResponseEnvelope) -> Self {
        Self {
            dedupe_key,
            task_id: envelope.task_id,
            content: envelope.content,
            usage: envelope.usage,
            trace_id: envelope.trace_id,
        }
    }
}
