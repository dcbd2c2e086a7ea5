//! Worker harness: lease → handle → complete.
//!
//! The handler (e.g. a language-model client) is out of scope here; anything that turns a
//! `PromptEnvelope` into a `Completion` can be plugged in.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{PromptEnvelope, ResponseEnvelope, Usage};
use crate::ports::PromptQueue;

/// Result produced by a handler for one prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<Usage>,
    pub trace_id: Option<String>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("handler failed: {0}")]
    Handler(String),
}

/// Processes one leased prompt.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn handle(&self, envelope: &PromptEnvelope) -> Result<Completion, WorkerError>;
}

/// Returns the prompt unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl PromptHandler for EchoHandler {
    async fn handle(&self, envelope: &PromptEnvelope) -> Result<Completion, WorkerError> {
        Ok(Completion::text(envelope.prompt.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    /// `None` lets the queue pick its default TTL.
    pub lease_secs: Option<u64>,
    /// Sleep when nothing is ready (or the queue errored).
    pub idle_backoff: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            lease_secs: None,
            idle_backoff: Duration::from_millis(500),
        }
    }
}

/// A set of worker loops sharing one queue and one handler.
///
/// Each loop leases with `options.lease_secs`, runs the handler, and reports the result under the
/// envelope's dedupe key. Stopping is cooperative:
/// - `request_shutdown()` で新しい lease を取らなくなる。idle backoff 中の worker もすぐ起きる
/// - handler 実行中の prompt はそのまま完了報告まで進む（キャンセルしない）
/// - `shutdown_and_join()` は全 loop の終了を待つ
pub struct WorkerGroup {
    stop: watch::Sender<bool>,
    loops: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Start `n` loops. `n == 0` yields an empty group.
    pub fn spawn(
        n: usize,
        queue: Arc<dyn PromptQueue>,
        handler: Arc<dyn PromptHandler>,
        options: WorkerOptions,
    ) -> Self {
        let (stop, stopped) = watch::channel(false);
        let loops = (0..n)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let handler = Arc::clone(&handler);
                let mut stopped = stopped.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, queue, handler, options, &mut stopped).await;
                    tracing::debug!(worker_id, "worker stopped");
                })
            })
            .collect();
        Self { stop, loops }
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn request_shutdown(&self) {
        // send only fails once every loop has already exited
        let _ = self.stop.send(true);
    }

    /// Stop leasing, then wait for every loop (including in-flight reports) to finish.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for (worker_id, handle) in self.loops.into_iter().enumerate() {
            if let Err(e) = handle.await {
                tracing::warn!(worker_id, error = %e, "worker task panicked");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn PromptQueue>,
    handler: Arc<dyn PromptHandler>,
    options: WorkerOptions,
    stopped: &mut watch::Receiver<bool>,
) {
    while !*stopped.borrow() {
        let envelope = match queue.lease_next(options.lease_secs).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                idle(stopped, options.idle_backoff).await;
                continue;
            }
            Err(e) => {
                tracing::warn!(worker_id, error = %e, "lease failed");
                idle(stopped, options.idle_backoff).await;
                continue;
            }
        };

        let completion = match handler.handle(&envelope).await {
            Ok(completion) => completion,
            Err(e) => {
                // no retry here: the lease runs out and the task is dispatched again
                tracing::warn!(worker_id, task_id = %envelope.task_id, error = %e, "handler failed");
                continue;
            }
        };

        let report = ResponseEnvelope {
            task_id: envelope.task_id.clone(),
            content: completion.content,
            usage: completion.usage,
            trace_id: completion.trace_id,
            dedupe_key: Some(envelope.dedupe_key.to_string()),
        };
        match queue.complete(report).await {
            Ok(ack) => {
                tracing::debug!(worker_id, task_id = %envelope.task_id, version = ?ack.version, "completion reported")
            }
            Err(e) => {
                tracing::warn!(worker_id, task_id = %envelope.task_id, error = %e, "completion report failed")
            }
        }
    }
}

/// Sleep for `backoff`, returning early on shutdown.
async fn idle(stopped: &mut watch::Receiver<bool>, backoff: Duration) {
    tokio::select! {
        _ = stopped.changed() => {},
        _ = tokio::time::sleep(backoff) => {},
    }
}
