//! Producer and worker endpoints: /putPrompt, /getPrompt, /postResponse.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use promptq_core::domain::{CompletionAck, NewPrompt, ResponseEnvelope, Submitted};

use super::{ApiError, ApiState};

// ── /putPrompt (POST) ─────────────────────────────────────────────────────────

pub async fn handle_put_prompt(
    State(state): State<ApiState>,
    payload: Result<Json<NewPrompt>, JsonRejection>,
) -> Result<Json<Submitted>, ApiError> {
    let Json(req) = payload?;
    let submitted = state.queue.submit(req).await?;
    Ok(Json(submitted))
}

// ── /getPrompt (GET) ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPromptQuery {
    pub lease_seconds: Option<u64>,
}

/// 200 with the envelope, or 204 when nothing is ready.
pub async fn handle_get_prompt(
    State(state): State<ApiState>,
    query: Result<Query<GetPromptQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    match state.queue.lease_next(query.lease_seconds).await? {
        Some(envelope) => Ok(Json(envelope).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

// ── /postResponse (POST) ──────────────────────────────────────────────────────

pub async fn handle_post_response(
    State(state): State<ApiState>,
    payload: Result<Json<ResponseEnvelope>, JsonRejection>,
) -> Result<Json<CompletionAck>, ApiError> {
    let Json(req) = payload?;
    let ack = state.queue.complete(req).await?;
    Ok(Json(ack))
}
