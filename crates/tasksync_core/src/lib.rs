//! Tasksync core: pure state machines for mirroring server task state.
mod active;
mod completion;
mod effect;
mod msg;
mod queue;
mod scheduler;
mod staleness;
mod state;
mod store;
mod task;
mod update;
mod view_model;

pub use active::{
    ActivePlaylist, ViewMode, PENDING_PLACEHOLDER, PREPARING_PLACEHOLDER, SUBMITTING_PLACEHOLDER,
    TASK_FAILED_FALLBACK,
};
pub use completion::{completion_effects, CompletionTracker, DeviceClass, NotificationPermission};
pub use effect::{Effect, ToastKind};
pub use msg::Msg;
pub use queue::{
    DownloadQueue, ProgressMapping, QueueItem, QueueItemStatus, QueueRequest, QueueSummary,
    COMPLETED_PROGRESS, PREPARED_PROGRESS, PREPARING_PROGRESS, READY_PROGRESS, STARTED_PROGRESS,
};
pub use scheduler::{PollCommand, PollScheduler, Visibility, DEFAULT_POLL_INTERVAL};
pub use staleness::StalenessThresholds;
pub use state::{AppState, CANCELLING_MESSAGE, CANCEL_FAILED_MESSAGE};
pub use store::{reconcile, snapshot_differs, TaskList, TaskStore};
pub use task::{
    HistoryEntry, Playlist, PrepareOptions, Task, TaskId, TaskStatus, Track, TrackStatus,
};
pub use update::update;
pub use view_model::{AppViewModel, TaskRowView};
