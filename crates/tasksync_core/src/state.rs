use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::view_model::{AppViewModel, TaskRowView};
use crate::{
    ActivePlaylist, CompletionTracker, DeviceClass, NotificationPermission, StalenessThresholds,
    TaskId, TaskStore,
};

pub const CANCELLING_MESSAGE: &str = "Cancelling…";
pub const CANCEL_FAILED_MESSAGE: &str = "Cancel failed";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub(crate) store: TaskStore,
    pub(crate) completions: CompletionTracker,
    pub(crate) active: ActivePlaylist,
    pub(crate) device: DeviceClass,
    pub(crate) permission: NotificationPermission,
    pub(crate) permission_requested: bool,
    pub(crate) attached: bool,
    pub(crate) syncing: bool,
    /// Tasks carrying an optimistic `cancelled` the server has not confirmed.
    pub(crate) unconfirmed: BTreeSet<TaskId>,
    /// Tasks started by the download queue. They survive re-attach.
    pub(crate) queue_owned: BTreeSet<TaskId>,
    staleness: StalenessThresholds,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: DeviceClass) -> Self {
        self.device = device;
        self
    }

    pub fn with_staleness(mut self, staleness: StalenessThresholds) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn active(&self) -> &ActivePlaylist {
        &self.active
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn view_at(&self, now: DateTime<Utc>) -> AppViewModel {
        let tasks = self
            .store
            .tasks()
            .iter()
            .map(|task| TaskRowView {
                task_id: task.id.clone(),
                name: task.display_name().to_string(),
                status: task.status,
                progress: task.progress,
                message: task.message.clone(),
                stale: self.staleness.is_stale(task, now),
                unconfirmed: self.unconfirmed.contains(&task.id),
            })
            .collect();

        AppViewModel {
            tasks,
            syncing: self.syncing,
            view: self.active.view(),
            loading: self.active.loading().map(ToOwned::to_owned),
            error: self.active.error().map(ToOwned::to_owned),
            playlist: self.active.playlist().cloned(),
            selection: self.active.selection().iter().copied().collect(),
            active_task_id: self.active.task_id().cloned(),
            dirty: self.dirty,
        }
    }

    /// Queue-owned tasks are saved by a user tap, never automatically.
    pub(crate) fn delivery_for(&self, task_id: &str) -> DeviceClass {
        if self.queue_owned.contains(task_id) {
            DeviceClass::Mobile
        } else {
            self.device
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether a re-render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
