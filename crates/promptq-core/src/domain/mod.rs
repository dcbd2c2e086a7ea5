//! Domain model (ids, tasks, completion reports, lease bounds, errors).

pub mod dedupe;
pub mod errors;
pub mod ids;
pub mod lease;
pub mod response;
pub mod task;

pub use self::dedupe::DedupeKey;
pub use self::errors::{ErrorKind, QueueError};
pub use self::ids::TaskId;
pub use self::lease::{LeaseBounds, LeaseTtl};
pub use self::response::{
    CompletionAck, CompletionVersion, ResponseEnvelope, StoredResponse, Usage,
};
pub use self::task::{Metadata, NewPrompt, PromptEnvelope, Submitted, Task, TaskView};
