use crate::{PrepareOptions, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    PrepareTask {
        url: String,
        options: PrepareOptions,
    },
    StartTask {
        task_id: TaskId,
        selected_indices: Option<Vec<usize>>,
    },
    CancelTask {
        task_id: TaskId,
    },
    DeleteTask {
        task_id: TaskId,
    },
    /// Ask the runtime for notification permission. Emitted at most once, on the first snapshot.
    RequestNotificationPermission,
    ShowToast {
        kind: ToastKind,
        text: String,
    },
    SystemNotification {
        title: String,
        body: String,
    },
    /// Obtain a fresh signed download URL for a completed task.
    FetchDownloadLink {
        task_id: TaskId,
    },
    /// Save the artifact behind an already-signed URL.
    SaveFile {
        task_id: TaskId,
        url: String,
    },
}

impl Effect {
    pub fn toast(kind: ToastKind, text: impl Into<String>) -> Self {
        Effect::ShowToast {
            kind,
            text: text.into(),
        }
    }
}
