//! promptq-core
//!
//! Core building blocks for the promptq task queue: producers submit prompts, workers
//! lease one at a time and report the result back exactly once.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, response, dedupe, lease, errors）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, PromptQueue）
//! - **queue**: TaskStore / LeaseScheduler / ResponseRegistry / MetricsCounter
//! - **app**: QueueService façade と liveness
//! - **config**: 設定（env → file → defaults）
//! - **worker**: lease → handle → complete を回す worker harness

pub mod app;
pub mod config;
pub mod domain;
pub mod ports;
pub mod queue;
pub mod worker;

pub use app::{Health, QueueService};
pub use config::PromptqConfig;
pub use ports::{PortError, PromptQueue};
