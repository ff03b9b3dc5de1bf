//! Client-side state of the sequential (one-at-a-time) download queue.
//!
//! Only bookkeeping lives here; the network-bound driver that walks items
//! through prepare, start, poll and save is in the engine crate.

use std::fmt;

use crate::{Playlist, PrepareOptions, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueItemStatus {
    Pending,
    Preparing,
    Downloading,
    /// Server artifact exists; waiting for the user to tap save.
    Ready,
    Completed,
    Error,
}

impl fmt::Display for QueueItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QueueItemStatus::Pending => "pending",
            QueueItemStatus::Preparing => "preparing",
            QueueItemStatus::Downloading => "downloading",
            QueueItemStatus::Ready => "ready",
            QueueItemStatus::Completed => "completed",
            QueueItemStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Progress shown while an item moves through the fixed client-side steps.
pub const PREPARING_PROGRESS: f64 = 5.0;
pub const PREPARED_PROGRESS: f64 = 25.0;
pub const STARTED_PROGRESS: f64 = 50.0;
pub const READY_PROGRESS: f64 = 95.0;
pub const COMPLETED_PROGRESS: f64 = 100.0;

/// Maps server progress (0-100) into this item's polling sub-range.
///
/// The defaults reserve 0-50 for prepare/start and 90-100 for the save acknowledgment.
/// They are presentation constants, not a protocol guarantee.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressMapping {
    pub base: f64,
    pub divisor: f64,
}

impl Default for ProgressMapping {
    fn default() -> Self {
        Self {
            base: 50.0,
            divisor: 2.5,
        }
    }
}

impl ProgressMapping {
    pub fn map(&self, server_progress: f64) -> f64 {
        let server = if server_progress.is_finite() {
            server_progress.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let divisor = if self.divisor > 0.0 { self.divisor } else { 1.0 };
        (self.base + server / divisor).clamp(0.0, 100.0)
    }
}

/// What the user asked to download, before it becomes a queue item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRequest {
    pub url: Option<String>,
    pub title: String,
    pub options: PrepareOptions,
}

impl QueueRequest {
    /// One request per selected track, in playlist order. Out-of-range indices are skipped.
    pub fn from_selection(
        playlist: &Playlist,
        selected: impl IntoIterator<Item = usize>,
        options: &PrepareOptions,
    ) -> Vec<QueueRequest> {
        let mut indices: Vec<usize> = selected
            .into_iter()
            .filter(|&idx| idx < playlist.tracks.len())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
            .into_iter()
            .map(|idx| {
                let track = &playlist.tracks[idx];
                QueueRequest {
                    url: track.url.clone(),
                    title: track.display_title(),
                    options: options.clone(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    /// Client-generated until prepared, then the server task id.
    pub id: String,
    pub original_url: Option<String>,
    pub title: String,
    pub options: PrepareOptions,
    pub status: QueueItemStatus,
    pub progress: f64,
    /// Signed, time-limited. May be stale by the time the user taps save.
    pub download_url: Option<String>,
    pub error: Option<String>,
    prepared: bool,
}

impl QueueItem {
    /// The server task id, once the item has been prepared.
    pub fn task_id(&self) -> Option<&str> {
        self.prepared.then_some(self.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DownloadQueue {
    items: Vec<QueueItem>,
    current_idx: Option<usize>,
    is_processing: bool,
    next_local_id: u64,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn item(&self, idx: usize) -> Option<&QueueItem> {
        self.items.get(idx)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current_idx(&self) -> Option<usize> {
        self.current_idx
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Appends items in request order and returns their indices.
    pub fn enqueue(&mut self, requests: Vec<QueueRequest>) -> std::ops::Range<usize> {
        let start = self.items.len();
        for request in requests {
            self.next_local_id += 1;
            self.items.push(QueueItem {
                id: format!("local-{}", self.next_local_id),
                original_url: request.url,
                title: request.title,
                options: request.options,
                status: QueueItemStatus::Pending,
                progress: 0.0,
                download_url: None,
                error: None,
                prepared: false,
            });
        }
        start..self.items.len()
    }

    pub fn next_pending(&self) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.status == QueueItemStatus::Pending)
    }

    /// Claims the next pending item as current. `None` while another item is in flight
    /// or when nothing is pending.
    pub fn begin_next(&mut self) -> Option<usize> {
        if self.is_processing {
            return None;
        }
        let idx = self.next_pending()?;
        self.is_processing = true;
        self.current_idx = Some(idx);
        Some(idx)
    }

    /// Releases the guard so the next pending item may start.
    pub fn release(&mut self) {
        self.is_processing = false;
        self.current_idx = None;
    }

    pub fn summary(&self) -> QueueSummary {
        QueueSummary {
            total: self.items.len(),
            completed: self
                .items
                .iter()
                .filter(|item| item.status == QueueItemStatus::Completed)
                .count(),
            failed: self
                .items
                .iter()
                .filter(|item| item.status == QueueItemStatus::Error)
                .count(),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.release();
    }

    pub fn mark_preparing(&mut self, idx: usize) {
        self.update(idx, |item| {
            item.status = QueueItemStatus::Preparing;
            item.progress = PREPARING_PROGRESS;
            item.error = None;
        });
    }

    pub fn mark_prepared(&mut self, idx: usize, task_id: TaskId) {
        self.update(idx, |item| {
            item.id = task_id;
            item.prepared = true;
            item.progress = PREPARED_PROGRESS;
        });
    }

    pub fn mark_started(&mut self, idx: usize) {
        self.update(idx, |item| {
            item.status = QueueItemStatus::Downloading;
            item.progress = STARTED_PROGRESS;
        });
    }

    pub fn apply_server_progress(&mut self, idx: usize, server_progress: f64, mapping: &ProgressMapping) {
        self.update(idx, |item| item.progress = mapping.map(server_progress));
    }

    pub fn mark_ready(&mut self, idx: usize, download_url: Option<String>) {
        self.update(idx, |item| {
            item.status = QueueItemStatus::Ready;
            item.progress = READY_PROGRESS;
            item.download_url = download_url;
        });
    }

    pub fn set_download_url(&mut self, idx: usize, download_url: String) {
        self.update(idx, |item| item.download_url = Some(download_url));
    }

    pub fn mark_completed(&mut self, idx: usize) {
        self.update(idx, |item| {
            item.status = QueueItemStatus::Completed;
            item.progress = COMPLETED_PROGRESS;
        });
    }

    pub fn mark_error(&mut self, idx: usize, message: impl Into<String>) {
        let message = message.into();
        self.update(idx, |item| {
            item.status = QueueItemStatus::Error;
            item.error = Some(message);
        });
    }

    fn update(&mut self, idx: usize, apply: impl FnOnce(&mut QueueItem)) {
        if let Some(item) = self.items.get_mut(idx) {
            apply(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProgressMapping;

    #[test]
    fn default_mapping_spans_fifty_to_ninety() {
        let mapping = ProgressMapping::default();
        assert_eq!(mapping.map(0.0), 50.0);
        assert_eq!(mapping.map(40.0), 66.0);
        assert_eq!(mapping.map(100.0), 90.0);
    }

    #[test]
    fn out_of_range_server_progress_is_clamped() {
        let mapping = ProgressMapping::default();
        assert_eq!(mapping.map(-10.0), 50.0);
        assert_eq!(mapping.map(250.0), 90.0);
        assert_eq!(mapping.map(f64::NAN), 50.0);
    }
}
