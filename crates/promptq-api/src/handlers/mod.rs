//! HTTP API handlers: expose the queue as JSON.

pub mod prompts;
pub mod status;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use promptq_core::domain::{ErrorKind, QueueError};
use promptq_core::{PortError, PromptQueue};

#[derive(Clone)]
pub struct ApiState {
    pub queue: Arc<dyn PromptQueue>,
}

impl ApiState {
    pub fn new(queue: Arc<dyn PromptQueue>) -> Self {
        Self { queue }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Maps queue errors and malformed requests onto status codes; body is `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Port(PortError),
    /// Body or query string that did not parse. Keeps axum's status (400 or 422).
    Rejected { status: StatusCode, detail: String },
}

impl From<PortError> for ApiError {
    fn from(e: PortError) -> Self {
        Self::Port(e)
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        Self::Port(e.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Port(PortError::Queue(e)) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
            },
            ApiError::Port(PortError::Transport(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Rejected { status, .. } => *status,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Port(e) => e.to_string(),
            ApiError::Rejected { detail, .. } => detail.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();
        if status.is_server_error() {
            tracing::warn!(error = %detail, "request failed");
        }
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

// Re-export handler functions for use in router setup.
pub use prompts::{handle_get_prompt, handle_post_response, handle_put_prompt};
pub use status::{handle_healthz, handle_metrics, handle_response, handle_task};
