//! Read-only endpoints: liveness, counters, inspection.

use axum::extract::{Path, State};
use axum::Json;

use promptq_core::domain::{DedupeKey, StoredResponse, TaskId, TaskView};
use promptq_core::queue::MetricsSnapshot;
use promptq_core::Health;

use super::{ApiError, ApiState};

pub async fn handle_healthz(State(state): State<ApiState>) -> Result<Json<Health>, ApiError> {
    Ok(Json(state.queue.health().await?))
}

pub async fn handle_metrics(
    State(state): State<ApiState>,
) -> Result<Json<MetricsSnapshot>, ApiError> {
    Ok(Json(state.queue.metrics().await?))
}

// ── /tasks/{task_id} (GET) ────────────────────────────────────────────────────

pub async fn handle_task(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskView>, ApiError> {
    let view = state.queue.task(&TaskId::new(task_id)).await?;
    Ok(Json(view))
}

// ── /responses/{dedupe_key} (GET) ─────────────────────────────────────────────

pub async fn handle_response(
    State(state): State<ApiState>,
    Path(dedupe_key): Path<String>,
) -> Result<Json<StoredResponse>, ApiError> {
    let stored = state.queue.response(&DedupeKey::new(dedupe_key)).await?;
    Ok(Json(stored))
}
