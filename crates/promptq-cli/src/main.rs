//! promptq CLI: run the server, talk to it, or run workers against it.

mod http_queue;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use promptq_api::{ApiState, serve};
use promptq_core::domain::{Metadata, NewPrompt, ResponseEnvelope, TaskId};
use promptq_core::worker::{EchoHandler, WorkerGroup, WorkerOptions};
use promptq_core::{PromptQueue, PromptqConfig, QueueService};

use crate::http_queue::HttpQueue;

#[derive(Parser)]
#[command(name = "promptq", about = "In-memory prompt queue with leases and idempotent results")]
struct Cli {
    /// Server base URL (defaults to worker.server_url from config)
    #[arg(long, global = true)]
    server: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen address (defaults to server.bind from config)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Submit a prompt
    Put {
        prompt: String,
        #[arg(long)]
        dedupe_key: Option<String>,
        #[arg(long)]
        task_id: Option<String>,
        /// JSON object attached to the task
        #[arg(long)]
        meta: Option<String>,
    },
    /// Lease the next prompt
    Get {
        #[arg(long)]
        lease_secs: Option<u64>,
    },
    /// Report a result
    Post {
        task_id: String,
        content: String,
        #[arg(long)]
        dedupe_key: Option<String>,
        #[arg(long)]
        trace_id: Option<String>,
    },
    /// Show counters
    Metrics,
    /// Run echo workers against the server
    Work {
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        lease_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = PromptqConfig::load().context("loading config")?;
    let server_url = cli
        .server
        .unwrap_or_else(|| config.worker.server_url.clone());

    match cli.command {
        Command::Serve { bind } => cmd_serve(&config, bind).await,
        Command::Put {
            prompt,
            dedupe_key,
            task_id,
            meta,
        } => cmd_put(&HttpQueue::new(server_url), prompt, dedupe_key, task_id, meta).await,
        Command::Get { lease_secs } => cmd_get(&HttpQueue::new(server_url), lease_secs).await,
        Command::Post {
            task_id,
            content,
            dedupe_key,
            trace_id,
        } => {
            cmd_post(&HttpQueue::new(server_url), task_id, content, dedupe_key, trace_id).await
        }
        Command::Metrics => cmd_metrics(&HttpQueue::new(server_url)).await,
        Command::Work {
            concurrency,
            lease_secs,
        } => cmd_work(&config, server_url, concurrency, lease_secs).await,
    }
}

async fn cmd_serve(config: &PromptqConfig, bind: Option<String>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;

    let queue = Arc::new(QueueService::with_system_clock(config.lease));
    tracing::info!(
        min = config.lease.min_secs,
        max = config.lease.max_secs,
        default = config.lease.default_secs,
        "lease bounds"
    );

    serve(ApiState::new(queue), listener, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn cmd_put(
    queue: &dyn PromptQueue,
    prompt: String,
    dedupe_key: Option<String>,
    task_id: Option<String>,
    meta: Option<String>,
) -> anyhow::Result<()> {
    let mut request = NewPrompt::new(prompt);
    if let Some(meta) = meta {
        let metadata: Metadata =
            serde_json::from_str(&meta).context("--meta must be a JSON object")?;
        request = request.with_metadata(metadata);
    }
    request.dedupe_key = dedupe_key;
    request.task_id = task_id;

    let submitted = queue.submit(request).await?;
    println!("{}", serde_json::to_string_pretty(&submitted)?);
    Ok(())
}

async fn cmd_get(queue: &dyn PromptQueue, lease_secs: Option<u64>) -> anyhow::Result<()> {
    match queue.lease_next(lease_secs).await? {
        Some(envelope) => println!("{}", serde_json::to_string_pretty(&envelope)?),
        None => println!("no prompt ready"),
    }
    Ok(())
}

async fn cmd_post(
    queue: &dyn PromptQueue,
    task_id: String,
    content: String,
    dedupe_key: Option<String>,
    trace_id: Option<String>,
) -> anyhow::Result<()> {
    let mut report = ResponseEnvelope::new(TaskId::new(task_id), content);
    report.dedupe_key = dedupe_key;
    report.trace_id = trace_id;

    let ack = queue.complete(report).await?;
    println!("{}", serde_json::to_string_pretty(&ack)?);
    Ok(())
}

async fn cmd_metrics(queue: &dyn PromptQueue) -> anyhow::Result<()> {
    let snapshot = queue.metrics().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn cmd_work(
    config: &PromptqConfig,
    server_url: String,
    concurrency: Option<usize>,
    lease_secs: Option<u64>,
) -> anyhow::Result<()> {
    let n = concurrency.unwrap_or(config.worker.concurrency).max(1);
    let options = WorkerOptions {
        lease_secs: Some(lease_secs.unwrap_or(config.worker.lease_secs)),
        idle_backoff: config.worker.idle_backoff(),
    };

    tracing::info!(workers = n, server = %server_url, "starting workers");
    let group = WorkerGroup::spawn(
        n,
        Arc::new(HttpQueue::new(server_url)),
        Arc::new(EchoHandler),
        options,
    );

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("draining workers");
    group.shutdown_and_join().await;
    Ok(())
}
