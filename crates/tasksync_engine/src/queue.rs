//! Sequential download queue driver.
//!
//! Walks one [`QueueItem`] at a time through prepare, start, poll and
//! ready, then waits for the user's tap before advancing. Mobile browsers
//! only let a download start from a user gesture, so items never chain
//! automatically past `Ready`.

use std::sync::Arc;
use std::time::Duration;

use tasksync_core::{
    DownloadQueue, ProgressMapping, QueueItem, QueueItemStatus, QueueRequest, QueueSummary,
    TaskStatus,
};
use tasksync_logging::{sync_debug, sync_info, sync_warn};
use thiserror::Error;
use tokio::time::sleep;

use crate::api::TaskApi;
use crate::ApiError;

pub const MISSING_URL_MESSAGE: &str = "Missing track URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTimings {
    /// Pause after an item enters `Preparing`, before `/prepare` is called.
    pub prepare_delay: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// Pause before moving on to the next pending item.
    pub advance_delay: Duration,
    /// Pause before the completion summary once nothing is pending.
    pub finish_delay: Duration,
}

impl Default for QueueTimings {
    fn default() -> Self {
        Self {
            prepare_delay: Duration::from_millis(300),
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 300,
            advance_delay: Duration::from_secs(1),
            finish_delay: Duration::from_millis(500),
        }
    }
}

pub trait QueueObserver: Send + Sync {
    fn item_changed(&self, idx: usize, item: &QueueItem);

    /// The tapped item's artifact should be opened in a new tab/window.
    fn open_url(&self, idx: usize, url: &str);

    fn finished(&self, summary: QueueSummary);
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("queue item {0} is not ready to save")]
    NotReady(usize),
    #[error("could not fetch a download link: {0}")]
    Token(#[source] ApiError),
}

pub struct SequentialDownloader {
    api: Arc<dyn TaskApi>,
    queue: DownloadQueue,
    timings: QueueTimings,
    mapping: ProgressMapping,
    observer: Arc<dyn QueueObserver>,
}

impl SequentialDownloader {
    pub fn new(
        api: Arc<dyn TaskApi>,
        timings: QueueTimings,
        mapping: ProgressMapping,
        observer: Arc<dyn QueueObserver>,
    ) -> Self {
        Self {
            api,
            queue: DownloadQueue::new(),
            timings,
            mapping,
            observer,
        }
    }

    pub fn queue(&self) -> &DownloadQueue {
        &self.queue
    }

    /// Appends items and, if nothing is in flight, runs until an item is ready
    /// for the user or the queue drains.
    pub async fn enqueue(&mut self, requests: Vec<QueueRequest>) {
        let added = self.queue.enqueue(requests);
        sync_info!("queued {} item(s)", added.len());
        for idx in added {
            self.notify(idx);
        }
        self.process_next().await;
    }

    /// Starts the next pending item unless one is already in flight.
    pub async fn process_next(&mut self) {
        loop {
            if self.queue.is_processing() {
                return;
            }
            let Some(idx) = self.queue.begin_next() else {
                self.finish().await;
                return;
            };

            match self.run_item(idx).await {
                Ok(()) => return,
                Err(message) => {
                    sync_warn!("queue item {idx} failed: {message}");
                    self.queue.mark_error(idx, message);
                    self.notify(idx);
                    self.queue.release();
                    sleep(self.timings.advance_delay).await;
                }
            }
        }
    }

    /// The user tapped save on a ready item.
    ///
    /// Always asks for a fresh token: the one fetched at completion may have
    /// expired while the item sat waiting. On failure the item stays `Ready`
    /// so the tap can be retried.
    pub async fn save(&mut self, idx: usize) -> Result<(), SaveError> {
        let task_id = match self.queue.item(idx) {
            Some(item) if item.status == QueueItemStatus::Ready => item
                .task_id()
                .map(str::to_string)
                .ok_or(SaveError::NotReady(idx))?,
            _ => return Err(SaveError::NotReady(idx)),
        };

        let token = self
            .api
            .download_token(&task_id)
            .await
            .map_err(SaveError::Token)?;
        let url = self.api.download_file_url(&task_id, &token);
        self.queue.set_download_url(idx, url.clone());
        self.observer.open_url(idx, &url);
        self.queue.mark_completed(idx);
        self.notify(idx);

        if self.queue.current_idx() == Some(idx) {
            self.queue.release();
            sleep(self.timings.advance_delay).await;
            self.process_next().await;
        }
        Ok(())
    }

    async fn run_item(&mut self, idx: usize) -> Result<(), String> {
        self.queue.mark_preparing(idx);
        self.notify(idx);
        sleep(self.timings.prepare_delay).await;

        let item = self
            .queue
            .item(idx)
            .cloned()
            .ok_or_else(|| format!("queue item {idx} disappeared"))?;
        let url = item
            .original_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| MISSING_URL_MESSAGE.to_string())?;

        let task_id = self
            .api
            .prepare(&url, &item.options)
            .await
            .map_err(|err| err.user_message())?;
        self.queue.mark_prepared(idx, task_id.clone());
        self.notify(idx);

        self.api
            .start(&task_id, None)
            .await
            .map_err(|err| err.user_message())?;
        self.queue.mark_started(idx);
        self.notify(idx);

        self.poll_until_complete(idx, &task_id).await?;

        // A failure here is tolerated; the tap fetches a fresh link anyway.
        let download_url = match self.api.download_token(&task_id).await {
            Ok(token) => Some(self.api.download_file_url(&task_id, &token)),
            Err(err) => {
                sync_warn!("no download link yet for {task_id}: {err}");
                None
            }
        };
        self.queue.mark_ready(idx, download_url);
        self.notify(idx);
        sync_info!("queue item {idx} ({task_id}) is ready");
        Ok(())
    }

    async fn poll_until_complete(&mut self, idx: usize, task_id: &str) -> Result<(), String> {
        for attempt in 1..=self.timings.max_poll_attempts {
            sleep(self.timings.poll_interval).await;
            let tasks = match self.api.list_tasks().await {
                Ok(tasks) => tasks,
                Err(err) => {
                    sync_debug!("poll {attempt} for {task_id} failed: {err}");
                    continue;
                }
            };
            let Some(task) = tasks.iter().find(|task| task.id == task_id) else {
                continue;
            };
            match task.status {
                TaskStatus::Completed => return Ok(()),
                TaskStatus::Error => {
                    return Err(task
                        .message
                        .clone()
                        .unwrap_or_else(|| "Download failed".to_string()))
                }
                TaskStatus::Cancelled => return Err("Cancelled".to_string()),
                _ => {
                    self.queue
                        .apply_server_progress(idx, task.progress, &self.mapping);
                    self.notify(idx);
                }
            }
        }
        Err(format!(
            "Timed out after {} status checks",
            self.timings.max_poll_attempts
        ))
    }

    async fn finish(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        sleep(self.timings.finish_delay).await;
        let summary = self.queue.summary();
        sync_info!(
            "queue finished: {} of {} saved, {} failed",
            summary.completed,
            summary.total,
            summary.failed
        );
        self.observer.finished(summary);
        self.queue.clear();
    }

    fn notify(&self, idx: usize) {
        if let Some(item) = self.queue.item(idx) {
            self.observer.item_changed(idx, item);
        }
    }
}
