//! TaskStore: the ordered collection of submitted tasks.

use std::collections::HashMap;

use crate::domain::{QueueError, Task, TaskId};

/// Single source of truth for tasks.
///
/// Design:
/// - `tasks` keeps insertion order; lease activity never reorders it.
/// - `index` maps task_id -> position, so lookups don't scan.
/// - Tasks are never removed, so positions stay valid.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new task at the end.
    pub fn append(&mut self, task: Task) -> Result<&Task, QueueError> {
        if task.prompt.trim().is_empty() {
            return Err(QueueError::EmptyPrompt);
        }
        if self.index.contains_key(&task.task_id) {
            return Err(QueueError::DuplicateTaskId(task.task_id));
        }

        let pos = self.tasks.len();
        self.index.insert(task.task_id.clone(), pos);
        self.tasks.push(task);
        Ok(&self.tasks[pos])
    }

    pub fn get(&self, task_id: &TaskId) -> Result<&Task, QueueError> {
        self.index
            .get(task_id)
            .map(|&pos| &self.tasks[pos])
            .ok_or_else(|| QueueError::UnknownTask(task_id.clone()))
    }

    pub fn get_mut(&mut self, task_id: &TaskId) -> Result<&mut Task, QueueError> {
        match self.index.get(task_id) {
            Some(&pos) => Ok(&mut self.tasks[pos]),
            None => Err(QueueError::UnknownTask(task_id.clone())),
        }
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.index.contains_key(task_id)
    }

    /// Tasks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Tasks in insertion order, for in-place lease updates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DedupeKey, Metadata};
    use chrono::{TimeZone, Utc};

    fn task(id: &str, prompt: &str) -> Task {
        let task_id = TaskId::new(id);
        let key = DedupeKey::derive(&task_id);
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Task::new(task_id, prompt, Metadata::new(), key, t0)
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut store = TaskStore::new();
        for id in ["c", "a", "b"] {
            store.append(task(id, "p")).unwrap();
        }
        let ids: Vec<&str> = store.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn append_rejects_blank_prompt() {
        let mut store = TaskStore::new();
        assert_eq!(store.append(task("a", "  \t")).unwrap_err(), QueueError::EmptyPrompt);
        assert!(store.is_empty());
    }

    #[test]
    fn append_rejects_taken_id() {
        let mut store = TaskStore::new();
        store.append(task("a", "first")).unwrap();
        let err = store.append(task("a", "second")).unwrap_err();
        assert_eq!(err, QueueError::DuplicateTaskId(TaskId::new("a")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&TaskId::new("a")).unwrap().prompt, "first");
    }

    #[test]
    fn get_reports_unknown_ids() {
        let store = TaskStore::new();
        let err = store.get(&TaskId::new("nope")).unwrap_err();
        assert_eq!(err, QueueError::UnknownTask(TaskId::new("nope")));
    }

    #[test]
    fn mutations_are_visible_through_iteration() {
        let mut store = TaskStore::new();
        store.append(task("a", "p")).unwrap();
        store.get_mut(&TaskId::new("a")).unwrap().completed = true;
        assert!(store.iter().all(|t| t.completed));
        assert!(store.contains(&TaskId::new("a")));
    }
}
