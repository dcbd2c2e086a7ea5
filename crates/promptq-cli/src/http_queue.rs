//! `PromptQueue` over HTTP, for producers and workers running outside the server process.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use promptq_core::domain::{
    CompletionAck, DedupeKey, NewPrompt, PromptEnvelope, QueueError, ResponseEnvelope,
    StoredResponse, Submitted, TaskId, TaskView,
};
use promptq_core::queue::MetricsSnapshot;
use promptq_core::{Health, PortError, PromptQueue};

#[derive(Debug, Deserialize)]
struct Detail {
    detail: String,
}

pub struct HttpQueue {
    base: String,
    client: Client,
}

impl HttpQueue {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `{base}{prefix}/{segment}`, percent-encoding the segment (ids may contain `/`, `?`, `#`).
    fn resource_url(&self, prefix: &str, segment: &str) -> String {
        format!("{}{}/{}", self.base, prefix, urlencoding::encode(segment))
    }
}

fn transport(e: reqwest::Error) -> PortError {
    PortError::Transport(e.to_string())
}

/// Decode a 2xx body, or turn a rejection into an error.
///
/// `known` maps the status back to a queue error when the request alone tells us which one.
async fn decode<T: DeserializeOwned>(
    resp: Response,
    known: impl FnOnce(StatusCode) -> Option<QueueError>,
) -> Result<T, PortError> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.map_err(transport);
    }
    if let Some(e) = known(status) {
        return Err(e.into());
    }
    let detail = match resp.json::<Detail>().await {
        Ok(d) => d.detail,
        Err(_) => String::from("<no detail>"),
    };
    Err(PortError::Transport(format!("{status}: {detail}")))
}

#[async_trait]
impl PromptQueue for HttpQueue {
    async fn submit(&self, request: NewPrompt) -> Result<Submitted, PortError> {
        let supplied = TaskId::supplied(request.task_id.as_deref());
        let empty = request.prompt.trim().is_empty();
        let resp = self
            .client
            .post(self.url("/putPrompt"))
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        decode(resp, |status| match status {
            StatusCode::BAD_REQUEST if empty => Some(QueueError::EmptyPrompt),
            StatusCode::CONFLICT => supplied.map(QueueError::DuplicateTaskId),
            _ => None,
        })
        .await
    }

    async fn lease_next(&self, lease_secs: Option<u64>) -> Result<Option<PromptEnvelope>, PortError> {
        let mut req = self.client.get(self.url("/getPrompt"));
        if let Some(secs) = lease_secs {
            req = req.query(&[("leaseSeconds", secs)]);
        }
        let resp = req.send().await.map_err(transport)?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        // ttl bounds live on the server, so a 400 stays a transport error with its detail
        decode(resp, |_| None).await.map(Some)
    }

    async fn complete(&self, envelope: ResponseEnvelope) -> Result<CompletionAck, PortError> {
        let task_id = envelope.task_id.clone();
        let resp = self
            .client
            .post(self.url("/postResponse"))
            .json(&envelope)
            .send()
            .await
            .map_err(transport)?;
        decode(resp, |status| {
            (status == StatusCode::NOT_FOUND).then(|| QueueError::UnknownTask(task_id))
        })
        .await
    }

    async fn metrics(&self) -> Result<MetricsSnapshot, PortError> {
        let resp = self
            .client
            .get(self.url("/metrics"))
            .send()
            .await
            .map_err(transport)?;
        decode(resp, |_| None).await
    }

    async fn health(&self) -> Result<Health, PortError> {
        let resp = self
            .client
            .get(self.url("/healthz"))
            .send()
            .await
            .map_err(transport)?;
        decode(resp, |_| None).await
    }

    async fn task(&self, task_id: &TaskId) -> Result<TaskView, PortError> {
        let resp = self
            .client
            .get(self.resource_url("/tasks", task_id.as_str()))
            .send()
            .await
            .map_err(transport)?;
        decode(resp, |status| {
            (status == StatusCode::NOT_FOUND).then(|| QueueError::UnknownTask(task_id.clone()))
        })
        .await
    }

    async fn response(&self, key: &DedupeKey) -> Result<StoredResponse, PortError> {
        let resp = self
            .client
            .get(self.resource_url("/responses", key.as_str()))
            .send()
            .await
            .map_err(transport)?;
        decode(resp, |status| {
            (status == StatusCode::NOT_FOUND).then(|| QueueError::UnknownResponse(key.clone()))
        })
        .await
    }
}
