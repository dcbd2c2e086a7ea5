//! HTTP boundary for the prompt queue.
//!
//! Thin shell: parse the request, call `PromptQueue`, map the result to a status code.

pub mod handlers;

use std::future::Future;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use handlers::{ApiError, ApiState};

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/putPrompt", post(handlers::handle_put_prompt))
        .route("/getPrompt", get(handlers::handle_get_prompt))
        .route("/postResponse", post(handlers::handle_post_response))
        .route("/healthz", get(handlers::handle_healthz))
        .route("/metrics", get(handlers::handle_metrics))
        .route("/tasks/{task_id}", get(handlers::handle_task))
        .route("/responses/{dedupe_key}", get(handlers::handle_response))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(state: ApiState, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
