use std::fmt;
use std::path::PathBuf;

use tasksync_core::{HistoryEntry, QueueItem, QueueSummary, Task, TaskId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// Response body did not match the expected JSON shape.
    Decode,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Text fit for a toast: the server's own detail when it sent one.
    pub fn user_message(&self) -> String {
        match self.kind {
            FailureKind::HttpStatus(_) if !self.message.is_empty() => self.message.clone(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// One poll's task list.
    Snapshot(Vec<Task>),
    SnapshotFailed(ApiError),
    /// Resync after the page became visible started (`true`) or resolved (`false`).
    Syncing(bool),
    Prepared(Result<TaskId, ApiError>),
    Started {
        task_id: TaskId,
        result: Result<(), ApiError>,
    },
    CancelRequested {
        task_id: TaskId,
        result: Result<(), ApiError>,
    },
    Deleted {
        task_id: TaskId,
        result: Result<(), ApiError>,
    },
    DownloadLink {
        task_id: TaskId,
        result: Result<String, ApiError>,
    },
    Saved {
        task_id: TaskId,
        result: Result<PathBuf, ApiError>,
    },
    History(Result<Vec<HistoryEntry>, ApiError>),
    QueueItemChanged {
        idx: usize,
        item: QueueItem,
    },
    /// A queue item's save was tapped; the URL should open in a new tab.
    QueueOpenUrl {
        idx: usize,
        url: String,
    },
    QueueSaveFailed {
        idx: usize,
        reason: String,
    },
    QueueFinished(QueueSummary),
}
