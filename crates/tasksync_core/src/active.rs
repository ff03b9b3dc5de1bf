use std::collections::BTreeSet;

use tasksync_logging::sync_info;

use crate::{Effect, Playlist, Task, TaskId, TaskStatus, ToastKind};

pub const PENDING_PLACEHOLDER: &str = "Waiting in queue…";
pub const PREPARING_PLACEHOLDER: &str = "Fetching playlist info…";
pub const SUBMITTING_PLACEHOLDER: &str = "Submitting…";
pub const TASK_FAILED_FALLBACK: &str = "Task failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// URL entry.
    #[default]
    Input,
    /// Playlist preview; consumes the active task's result.
    Preview,
}

/// Follows the one task the user just prepared and projects it into preview state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivePlaylist {
    task_id: Option<TaskId>,
    view: ViewMode,
    loading: Option<String>,
    error: Option<String>,
    playlist: Option<Playlist>,
    selection: BTreeSet<usize>,
}

impl ActivePlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub fn selection(&self) -> &BTreeSet<usize> {
        &self.selection
    }

    /// A prepare request was submitted; nothing to follow yet.
    pub fn begin_prepare(&mut self) {
        self.task_id = None;
        self.error = None;
        self.loading = Some(SUBMITTING_PLACEHOLDER.to_string());
    }

    /// The server accepted the prepare request; follow its task from now on.
    pub fn follow(&mut self, task_id: TaskId) {
        self.task_id = Some(task_id);
        self.error = None;
        self.loading = Some(PENDING_PLACEHOLDER.to_string());
    }

    /// Surfaces a failure that happened before or outside the followed task.
    pub fn fail(&mut self, message: &str, effects: &mut Vec<Effect>) {
        self.error = Some(message.to_string());
        self.loading = None;
        effects.push(Effect::toast(ToastKind::Error, message));
    }

    /// Stops following `task_id` if it is the active one.
    pub fn forget(&mut self, task_id: &str) -> bool {
        if self.task_id.as_deref() == Some(task_id) {
            self.task_id = None;
            self.loading = None;
            return true;
        }
        false
    }

    pub fn back_to_input(&mut self) {
        *self = Self::default();
    }

    /// Keeps only indices that exist in the projected playlist.
    pub fn set_selection(&mut self, indices: impl IntoIterator<Item = usize>) -> bool {
        let track_count = self.playlist.as_ref().map_or(0, |p| p.tracks.len());
        let next: BTreeSet<usize> = indices.into_iter().filter(|&i| i < track_count).collect();
        if next == self.selection {
            return false;
        }
        self.selection = next;
        true
    }

    /// `None` when every track is selected, so the server downloads the whole playlist.
    pub fn selected_indices(&self) -> Option<Vec<usize>> {
        let track_count = self.playlist.as_ref().map_or(0, |p| p.tracks.len());
        if self.selection.len() == track_count {
            None
        } else {
            Some(self.selection.iter().copied().collect())
        }
    }

    /// Projects the followed task out of an authoritative snapshot. Returns `true` on any change.
    pub fn apply(&mut self, tasks: &[Task], effects: &mut Vec<Effect>) -> bool {
        let Some(task_id) = self.task_id.as_deref() else {
            return false;
        };
        let Some(task) = tasks.iter().find(|task| task.id == task_id) else {
            return false;
        };

        match task.status {
            TaskStatus::Pending | TaskStatus::Preparing => {
                let placeholder = if task.status == TaskStatus::Pending {
                    PENDING_PLACEHOLDER
                } else {
                    PREPARING_PLACEHOLDER
                };
                let message = task
                    .message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(placeholder);
                self.set_loading(Some(message))
            }
            TaskStatus::Ready => {
                let playlist = task.playlist.clone().unwrap_or_default();
                match self.view {
                    ViewMode::Input => {
                        sync_info!(
                            "task {} ready with {} track(s)",
                            task.id,
                            playlist.tracks.len()
                        );
                        self.project(playlist);
                        self.view = ViewMode::Preview;
                        self.loading = None;
                        true
                    }
                    ViewMode::Preview => {
                        let reprojected = self.playlist.as_ref() != Some(&playlist);
                        if reprojected {
                            self.project(playlist);
                        }
                        self.set_loading(None) || reprojected
                    }
                }
            }
            TaskStatus::Error => {
                let message = task
                    .message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| TASK_FAILED_FALLBACK.to_string());
                sync_info!("active task {} failed: {}", task.id, message);
                self.task_id = None;
                self.fail(&message, effects);
                true
            }
            TaskStatus::Queued
            | TaskStatus::Downloading
            | TaskStatus::Zipping
            | TaskStatus::Completed
            | TaskStatus::Cancelled => false,
        }
    }

    fn project(&mut self, playlist: Playlist) {
        self.selection = (0..playlist.tracks.len()).collect();
        self.playlist = Some(playlist);
    }

    fn set_loading(&mut self, message: Option<&str>) -> bool {
        if self.loading.as_deref() == message {
            return false;
        }
        self.loading = message.map(ToOwned::to_owned);
        true
    }
}
