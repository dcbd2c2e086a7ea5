//! Domain identifiers.
//!
//! # TaskId
//! - システムが採番する場合は `task-<ULID>` 形式（`IdGenerator` 経由）
//! - 呼び出し側が指定した ID はそのまま受け入れる（空白のみは「未指定」扱い）
//!
//! ULID は時刻でソート可能なので、採番された ID の並びは投入順とほぼ一致します。
//! ただし順序の正本は TaskStore の挿入順であり、ID の大小ではありません。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Prefix for system-assigned task ids.
pub const TASK_ID_PREFIX: &str = "task-";

/// Identifier of a Task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Build a system-assigned id from a ULID.
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(format!("{TASK_ID_PREFIX}{ulid}"))
    }

    /// Caller-supplied id, `None` when absent or blank.
    pub fn supplied(raw: Option<&str>) -> Option<Self> {
        raw.filter(|s| !s.trim().is_empty()).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
