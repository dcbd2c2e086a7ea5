//! Errors - エラー型と分類
//!
//! 「タスクが無い」「重複した完了報告」はエラーではありません。
//! それぞれ `Ok(None)` と `CompletionVersion::Duplicate` で表現します。

use thiserror::Error;

use super::{DedupeKey, TaskId};

/// ErrorKind は呼び出し側への見せ方の分類
///
/// - Validation: 入力不正（再送しても無意味）
/// - NotFound: 参照先が存在しない
/// - Conflict: 既存の ID と衝突
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("prompt is required")]
    EmptyPrompt,

    #[error("lease ttl {requested}s is outside [{min}, {max}]")]
    LeaseTtlOutOfRange { requested: u64, min: u64, max: u64 },

    #[error("unknown task_id={0}")]
    UnknownTask(TaskId),

    #[error("no response stored for dedupe_key={0}")]
    UnknownResponse(DedupeKey),

    #[error("task_id={0} already exists")]
    DuplicateTaskId(TaskId),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::EmptyPrompt | QueueError::LeaseTtlOutOfRange { .. } => {
                ErrorKind::Validation
            }
            QueueError::UnknownTask(_) | QueueError::UnknownResponse(_) => ErrorKind::NotFound,
            QueueError::DuplicateTaskId(_) => ErrorKind::Conflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty_prompt(QueueError::EmptyPrompt, ErrorKind::Validation)]
    #[case::ttl(
        QueueError::LeaseTtlOutOfRange { requested: 5, min: 10, max: 600 },
        ErrorKind::Validation
    )]
    #[case::unknown_task(QueueError::UnknownTask(TaskId::new("x")), ErrorKind::NotFound)]
    #[case::unknown_response(
        QueueError::UnknownResponse(DedupeKey::new("k")),
        ErrorKind::NotFound
    )]
    #[case::duplicate_id(QueueError::DuplicateTaskId(TaskId::new("x")), ErrorKind::Conflict)]
    fn errors_are_classified(#[case] err: QueueError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn messages_name_the_offending_value() {
        let err = QueueError::LeaseTtlOutOfRange { requested: 5, min: 10, max: 600 };
        assert_eq!(err.to_string(), "lease ttl 5s is outside [10, 600]");
        assert!(QueueError::UnknownTask(TaskId::new("t-9")).to_string().contains("t-9"));
    }
}
