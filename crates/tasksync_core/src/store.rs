use std::sync::Arc;

use crate::{Task, TaskStatus};

/// Shared, immutable task list. Identity (`Arc::ptr_eq`) tells renderers whether anything changed.
pub type TaskList = Arc<Vec<Task>>;

/// Shallow list-level comparison: length, then positional `id`, `status`, `progress`, `message`.
///
/// Playlist contents are deliberately not compared here.
pub fn snapshot_differs(prev: &[Task], next: &[Task]) -> bool {
    if prev.len() != next.len() {
        return true;
    }
    prev.iter().zip(next).any(|(a, b)| {
        a.id != b.id || a.status != b.status || a.progress != b.progress || a.message != b.message
    })
}

/// Returns `prev` itself when `next` is not different, otherwise the new list.
pub fn reconcile(prev: &TaskList, next: Vec<Task>) -> TaskList {
    if snapshot_differs(prev, &next) {
        Arc::new(next)
    } else {
        Arc::clone(prev)
    }
}

/// The client's mirror of the server task list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskStore {
    tasks: TaskList,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    /// Applies an authoritative snapshot. Returns `true` when the held list was replaced.
    pub fn apply_snapshot(&mut self, next: Vec<Task>) -> bool {
        let merged = reconcile(&self.tasks, next);
        let replaced = !Arc::ptr_eq(&merged, &self.tasks);
        self.tasks = merged;
        replaced
    }

    /// Tentative local mutation. The next snapshot overwrites whatever is written here.
    pub fn mark_cancelling(&mut self, task_id: &str, message: &str) -> bool {
        self.edit(task_id, |task| {
            task.status = TaskStatus::Cancelled;
            task.message = Some(message.to_string());
        })
    }

    /// Compensation only touches the display message; status stays as the optimistic value.
    pub fn set_message(&mut self, task_id: &str, message: &str) -> bool {
        self.edit(task_id, |task| task.message = Some(message.to_string()))
    }

    /// Local edits always publish a new list so identity still signals the change.
    pub fn remove(&mut self, task_id: &str) -> Option<Task> {
        let idx = self.tasks.iter().position(|task| task.id == task_id)?;
        let mut next = Vec::clone(&self.tasks);
        let removed = next.remove(idx);
        self.tasks = Arc::new(next);
        Some(removed)
    }

    fn edit(&mut self, task_id: &str, apply: impl FnOnce(&mut Task)) -> bool {
        let Some(idx) = self.tasks.iter().position(|task| task.id == task_id) else {
            return false;
        };
        let mut next = Vec::clone(&self.tasks);
        apply(&mut next[idx]);
        self.tasks = Arc::new(next);
        true
    }
}
