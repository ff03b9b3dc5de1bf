use chrono::{DateTime, Duration, Utc};

use crate::{Task, TaskStatus};

/// How long a task may sit without progressing before the UI flags it.
///
/// Presentation heuristics only; the server makes no promise about these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessThresholds {
    /// Measured from `status_updated_at` while the task is `ready`.
    pub ready: Duration,
    /// Measured from `updated_at` while the task is in an active status.
    pub active: Duration,
}

impl Default for StalenessThresholds {
    fn default() -> Self {
        Self {
            ready: Duration::minutes(2),
            active: Duration::minutes(10),
        }
    }
}

impl StalenessThresholds {
    pub fn is_stale(&self, task: &Task, now: DateTime<Utc>) -> bool {
        let (since, threshold) = match task.status {
            TaskStatus::Ready => (task.status_updated_at, self.ready),
            status if status.is_active() => (task.updated_at, self.active),
            _ => return false,
        };
        since.is_some_and(|at| now.signed_duration_since(at) > threshold)
    }
}
