//! Queue module: task store, lease scheduling, idempotent completion, counters.

mod metrics;
mod registry;
mod scheduler;
mod state;
mod store;

pub use metrics::{MetricsCounter, MetricsSnapshot};
pub use registry::{Completion, ResponseRegistry};
pub use scheduler::{LeaseDecision, LeaseScheduler};
pub use state::QueueState;
pub use store::TaskStore;
