//! App - アプリケーション層
//!
//! queue の部品（TaskStore / LeaseScheduler / ResponseRegistry / MetricsCounter）を
//! 組み合わせて、外部に見せる操作を提供します。
//!
//! # 主要コンポーネント
//! - **QueueService**: submit / lease-next / complete の façade（`PromptQueue` 実装）
//! - **Health**: liveness

pub mod service;
pub mod status;

pub use self::service::QueueService;
pub use self::status::Health;
