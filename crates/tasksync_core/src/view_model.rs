use crate::{Playlist, TaskId, TaskStatus, ViewMode};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub tasks: Vec<TaskRowView>,
    pub syncing: bool,
    pub view: ViewMode,
    pub loading: Option<String>,
    pub error: Option<String>,
    pub playlist: Option<Playlist>,
    pub selection: Vec<usize>,
    pub active_task_id: Option<TaskId>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRowView {
    pub task_id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub message: Option<String>,
    /// Non-terminal for longer than the staleness threshold.
    pub stale: bool,
    /// Shows a local optimistic value the server has not confirmed yet.
    pub unconfirmed: bool,
}
