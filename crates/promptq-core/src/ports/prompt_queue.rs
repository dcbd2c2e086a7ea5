//! PromptQueue port - producer/worker から見たキューの表面
//!
//! `QueueService`（プロセス内）と CLI の HTTP クライアントがこの trait を実装します。
//! HTTP 層・worker harness はこの trait だけに依存します。

use async_trait::async_trait;

use crate::app::Health;
use crate::domain::{
    CompletionAck, DedupeKey, NewPrompt, PromptEnvelope, QueueError, ResponseEnvelope,
    StoredResponse, Submitted, TaskId, TaskView,
};
use crate::queue::MetricsSnapshot;

/// Errors surfaced through the port.
///
/// Remote implementations add transport failures on top of the queue's own errors.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("transport: {0}")]
    Transport(String),
}

#[async_trait]
pub trait PromptQueue: Send + Sync {
    /// Enqueue a prompt.
    async fn submit(&self, request: NewPrompt) -> Result<Submitted, PortError>;

    /// Lease the next eligible prompt. `Ok(None)` means nothing is ready right now.
    ///
    /// Never waits for a future task.
    async fn lease_next(&self, lease_secs: Option<u64>)
    -> Result<Option<PromptEnvelope>, PortError>;

    /// Report a result. Repeating a report with the same dedupe key is a no-op.
    async fn complete(&self, envelope: ResponseEnvelope) -> Result<CompletionAck, PortError>;

    async fn metrics(&self) -> Result<MetricsSnapshot, PortError>;

    async fn health(&self) -> Result<Health, PortError>;

    async fn task(&self, task_id: &TaskId) -> Result<TaskView, PortError>;

    async fn response(&self, key: &DedupeKey) -> Result<StoredResponse, PortError>;
}
