use tasksync_logging::{sync_debug, sync_info, sync_warn};

use crate::state::{CANCELLING_MESSAGE, CANCEL_FAILED_MESSAGE};
use crate::{
    completion_effects, AppState, Effect, Msg, NotificationPermission, Task, ToastKind,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Attached => {
            state.attached = true;
            state.syncing = false;
            state.completions.reset();
            state.unconfirmed.clear();
            state.mark_dirty();
            Vec::new()
        }
        Msg::Detached => {
            state.attached = false;
            state.syncing = false;
            Vec::new()
        }
        Msg::SnapshotReceived(tasks) => {
            if !state.attached {
                sync_debug!("dropping snapshot received after detach");
                return (state, Vec::new());
            }
            apply_snapshot(&mut state, tasks)
        }
        Msg::SnapshotFailed(reason) => {
            sync_warn!("task poll failed: {}", reason);
            Vec::new()
        }
        Msg::SyncingChanged(syncing) => {
            if state.attached && state.syncing != syncing {
                state.syncing = syncing;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NotificationPermissionResolved { granted } => {
            state.permission = if granted {
                NotificationPermission::Granted
            } else {
                NotificationPermission::Denied
            };
            Vec::new()
        }
        Msg::PrepareSubmitted { url, options } => {
            let url = url.trim();
            let mut effects = Vec::new();
            if url.is_empty() {
                state.active.fail("Please enter a URL", &mut effects);
            } else {
                state.active.begin_prepare();
                effects.push(Effect::PrepareTask {
                    url: url.to_string(),
                    options,
                });
            }
            state.mark_dirty();
            effects
        }
        Msg::PrepareAccepted { task_id } => {
            sync_info!("following prepared task {}", task_id);
            state.active.follow(task_id);
            state.mark_dirty();
            Vec::new()
        }
        Msg::PrepareFailed(reason) => {
            let mut effects = Vec::new();
            state.active.fail(&reason, &mut effects);
            state.mark_dirty();
            effects
        }
        Msg::StartClicked => {
            let Some(task_id) = state.active.task_id().cloned() else {
                return (state, Vec::new());
            };
            if state.active.playlist().is_none() {
                return (state, Vec::new());
            }
            if state.active.selection().is_empty() {
                vec![Effect::toast(ToastKind::Error, "Select at least one track")]
            } else {
                vec![Effect::StartTask {
                    task_id,
                    selected_indices: state.active.selected_indices(),
                }]
            }
        }
        Msg::StartAccepted { task_id } => {
            sync_info!("download started for task {}", task_id);
            state.active.back_to_input();
            state.mark_dirty();
            vec![Effect::toast(ToastKind::Info, "Download started")]
        }
        Msg::StartFailed(reason) => {
            vec![Effect::toast(
                ToastKind::Error,
                format!("Could not start download: {reason}"),
            )]
        }
        Msg::SelectionChanged(indices) => {
            if state.active.set_selection(indices) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::CancelClicked { task_id } => {
            if state.store.mark_cancelling(&task_id, CANCELLING_MESSAGE) {
                state.unconfirmed.insert(task_id.clone());
                state.mark_dirty();
                vec![Effect::CancelTask { task_id }]
            } else {
                Vec::new()
            }
        }
        Msg::CancelFailed { task_id } => {
            if state.store.set_message(&task_id, CANCEL_FAILED_MESSAGE) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::DeleteClicked { task_id } => vec![Effect::DeleteTask { task_id }],
        Msg::TaskDeleted { task_id } => {
            state.store.remove(&task_id);
            state.unconfirmed.remove(&task_id);
            state.active.forget(&task_id);
            state.mark_dirty();
            Vec::new()
        }
        Msg::DeleteFailed { task_id, reason } => {
            sync_warn!("delete of task {} failed: {}", task_id, reason);
            vec![Effect::toast(
                ToastKind::Error,
                format!("Delete failed: {reason}"),
            )]
        }
        Msg::DownloadLinkReady { task_id, url } => vec![Effect::SaveFile { task_id, url }],
        Msg::DownloadLinkFailed { task_id, reason } => {
            let name = state
                .store
                .get(&task_id)
                .map_or(task_id.as_str(), Task::display_name)
                .to_string();
            vec![Effect::toast(
                ToastKind::Error,
                format!("Could not download {name}: {reason}"),
            )]
        }
        Msg::BackToInput => {
            state.active.back_to_input();
            state.mark_dirty();
            Vec::new()
        }
        Msg::QueueTaskClaimed { task_id } => {
            sync_debug!("task {} belongs to the download queue", task_id);
            state.queue_owned.insert(task_id);
            Vec::new()
        }
    };

    (state, effects)
}

fn apply_snapshot(state: &mut AppState, tasks: Vec<Task>) -> Vec<Effect> {
    let mut effects = Vec::new();

    if state.permission == NotificationPermission::Default && !state.permission_requested {
        state.permission_requested = true;
        effects.push(Effect::RequestNotificationPermission);
    }

    // The fresh snapshot, not the reconciled list: playlist changes never reach the list diff.
    for task in state.completions.observe(&tasks) {
        sync_info!("task {} completed", task.id);
        effects.extend(completion_effects(
            task,
            state.delivery_for(&task.id),
            state.permission,
        ));
    }
    if state.active.apply(&tasks, &mut effects) {
        state.mark_dirty();
    }

    state.unconfirmed.clear();
    if state.store.apply_snapshot(tasks) {
        state.mark_dirty();
    }
    effects
}
