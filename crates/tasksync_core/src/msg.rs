use crate::{PrepareOptions, Task, TaskId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The owning view mounted; state from a previous attach is dropped.
    Attached,
    /// The owning view unmounted; late responses are ignored from now on.
    Detached,
    /// Authoritative task list from one poll.
    SnapshotReceived(Vec<Task>),
    /// A poll failed. Logged only; the next tick retries.
    SnapshotFailed(String),
    /// Out-of-band resync after the page became visible started or finished.
    SyncingChanged(bool),
    NotificationPermissionResolved { granted: bool },
    /// User submitted a source URL.
    PrepareSubmitted {
        url: String,
        options: PrepareOptions,
    },
    PrepareAccepted { task_id: TaskId },
    PrepareFailed(String),
    /// User confirmed the track selection on the preview.
    StartClicked,
    StartAccepted { task_id: TaskId },
    StartFailed(String),
    SelectionChanged(Vec<usize>),
    CancelClicked { task_id: TaskId },
    CancelFailed { task_id: TaskId },
    DeleteClicked { task_id: TaskId },
    TaskDeleted { task_id: TaskId },
    DeleteFailed { task_id: TaskId, reason: String },
    DownloadLinkReady { task_id: TaskId, url: String },
    DownloadLinkFailed { task_id: TaskId, reason: String },
    /// User left the preview.
    BackToInput,
    /// The download queue prepared this task; its artifact waits for a save tap.
    QueueTaskClaimed { task_id: TaskId },
}
