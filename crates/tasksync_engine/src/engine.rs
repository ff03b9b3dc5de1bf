use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tasksync_core::{
    PrepareOptions, ProgressMapping, QueueItem, QueueRequest, QueueSummary, TaskId, Visibility,
    DEFAULT_POLL_INTERVAL,
};
use tasksync_logging::{sync_debug, sync_error, sync_info};
use tokio::sync::mpsc as async_mpsc;

use crate::api::{ApiSettings, ChannelEventSink, EventSink, ReqwestTaskApi, TaskApi};
use crate::device::DeviceId;
use crate::poller::{spawn_poller, PollerHandle};
use crate::queue::{QueueObserver, QueueTimings, SequentialDownloader};
use crate::save::ArtifactSaver;
use crate::{EngineError, EngineEvent};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub api: ApiSettings,
    pub poll_interval: Duration,
    pub queue: QueueTimings,
    pub progress_mapping: ProgressMapping,
    pub download_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue: QueueTimings::default(),
            progress_mapping: ProgressMapping::default(),
            download_dir: PathBuf::from("./downloads"),
        }
    }
}

enum EngineCommand {
    Attach(Visibility),
    SetVisibility(Visibility),
    Detach,
    Prepare {
        url: String,
        options: PrepareOptions,
    },
    Start {
        task_id: TaskId,
        selected_indices: Option<Vec<usize>>,
    },
    Cancel(TaskId),
    Delete(TaskId),
    FetchDownloadLink(TaskId),
    SaveFile {
        task_id: TaskId,
        url: String,
    },
    History,
    Queue(QueueCommand),
}

enum QueueCommand {
    Enqueue(Vec<QueueRequest>),
    Save(usize),
}

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Starts the engine thread. Events arrive on the returned receiver.
    pub fn spawn(
        settings: EngineSettings,
        device_id: DeviceId,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let api = ReqwestTaskApi::new(&settings.api, device_id)?;
        let saver = ArtifactSaver::new(&api, settings.download_dir.clone());
        let runtime = tokio::runtime::Runtime::new()?;

        thread::spawn(move || {
            let _guard = runtime.enter();
            let api: Arc<dyn TaskApi> = Arc::new(api);
            let saver = Arc::new(saver);
            let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));
            let queue_tx = spawn_queue_actor(&runtime, api.clone(), &settings, sink.clone());
            let mut poller: Option<PollerHandle> = None;

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Attach(visibility) => {
                        poller = Some(spawn_poller(
                            api.clone(),
                            settings.poll_interval,
                            visibility,
                            sink.clone(),
                        ));
                    }
                    EngineCommand::SetVisibility(visibility) => {
                        if let Some(poller) = poller.as_ref() {
                            poller.set_visibility(visibility);
                        }
                    }
                    EngineCommand::Detach => {
                        if let Some(poller) = poller.take() {
                            poller.detach();
                        }
                    }
                    EngineCommand::Queue(command) => {
                        let _ = queue_tx.send(command);
                    }
                    other => {
                        let api = api.clone();
                        let saver = saver.clone();
                        let sink = sink.clone();
                        runtime.spawn(async move {
                            handle_request(api.as_ref(), saver.as_ref(), other, sink.as_ref()).await;
                        });
                    }
                }
            }
            sync_debug!("engine command channel closed");
            drop(poller);
        });

        Ok((Self { cmd_tx }, event_rx))
    }

    pub fn attach(&self, visibility: Visibility) {
        self.send(EngineCommand::Attach(visibility));
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        self.send(EngineCommand::SetVisibility(visibility));
    }

    pub fn detach(&self) {
        self.send(EngineCommand::Detach);
    }

    pub fn prepare(&self, url: impl Into<String>, options: PrepareOptions) {
        self.send(EngineCommand::Prepare {
            url: url.into(),
            options,
        });
    }

    pub fn start(&self, task_id: impl Into<TaskId>, selected_indices: Option<Vec<usize>>) {
        self.send(EngineCommand::Start {
            task_id: task_id.into(),
            selected_indices,
        });
    }

    pub fn cancel(&self, task_id: impl Into<TaskId>) {
        self.send(EngineCommand::Cancel(task_id.into()));
    }

    pub fn delete(&self, task_id: impl Into<TaskId>) {
        self.send(EngineCommand::Delete(task_id.into()));
    }

    pub fn fetch_download_link(&self, task_id: impl Into<TaskId>) {
        self.send(EngineCommand::FetchDownloadLink(task_id.into()));
    }

    pub fn save_file(&self, task_id: impl Into<TaskId>, url: impl Into<String>) {
        self.send(EngineCommand::SaveFile {
            task_id: task_id.into(),
            url: url.into(),
        });
    }

    pub fn history(&self) {
        self.send(EngineCommand::History);
    }

    pub fn enqueue_downloads(&self, requests: Vec<QueueRequest>) {
        self.send(EngineCommand::Queue(QueueCommand::Enqueue(requests)));
    }

    pub fn save_queue_item(&self, idx: usize) {
        self.send(EngineCommand::Queue(QueueCommand::Save(idx)));
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            sync_error!("engine thread is gone; command dropped");
        }
    }
}

async fn handle_request(
    api: &dyn TaskApi,
    saver: &ArtifactSaver,
    command: EngineCommand,
    sink: &dyn EventSink,
) {
    let event = match command {
        EngineCommand::Prepare { url, options } => {
            EngineEvent::Prepared(api.prepare(&url, &options).await)
        }
        EngineCommand::Start {
            task_id,
            selected_indices,
        } => {
            let result = api.start(&task_id, selected_indices.as_deref()).await;
            EngineEvent::Started { task_id, result }
        }
        EngineCommand::Cancel(task_id) => {
            let result = api.cancel(&task_id).await;
            EngineEvent::CancelRequested { task_id, result }
        }
        EngineCommand::Delete(task_id) => {
            let result = api.delete(&task_id).await;
            EngineEvent::Deleted { task_id, result }
        }
        EngineCommand::FetchDownloadLink(task_id) => {
            let result = api
                .download_token(&task_id)
                .await
                .map(|token| api.download_file_url(&task_id, &token));
            EngineEvent::DownloadLink { task_id, result }
        }
        EngineCommand::SaveFile { task_id, url } => {
            let result = saver.save(&url, &task_id).await;
            EngineEvent::Saved { task_id, result }
        }
        EngineCommand::History => EngineEvent::History(api.history().await),
        EngineCommand::Attach(_)
        | EngineCommand::SetVisibility(_)
        | EngineCommand::Detach
        | EngineCommand::Queue(_) => return,
    };
    sink.emit(event);
}

struct SinkQueueObserver {
    sink: Arc<dyn EventSink>,
}

impl QueueObserver for SinkQueueObserver {
    fn item_changed(&self, idx: usize, item: &QueueItem) {
        self.sink.emit(EngineEvent::QueueItemChanged {
            idx,
            item: item.clone(),
        });
    }

    fn open_url(&self, idx: usize, url: &str) {
        self.sink.emit(EngineEvent::QueueOpenUrl {
            idx,
            url: url.to_string(),
        });
    }

    fn finished(&self, summary: QueueSummary) {
        self.sink.emit(EngineEvent::QueueFinished(summary));
    }
}

/// Queue commands are handled one at a time, so an enqueue arriving while an
/// item is in flight only appends.
fn spawn_queue_actor(
    runtime: &tokio::runtime::Runtime,
    api: Arc<dyn TaskApi>,
    settings: &EngineSettings,
    sink: Arc<dyn EventSink>,
) -> async_mpsc::UnboundedSender<QueueCommand> {
    let (tx, mut rx) = async_mpsc::unbounded_channel();
    let observer = Arc::new(SinkQueueObserver { sink: sink.clone() });
    let mut downloader = SequentialDownloader::new(
        api,
        settings.queue.clone(),
        settings.progress_mapping,
        observer,
    );
    runtime.spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                QueueCommand::Enqueue(requests) => downloader.enqueue(requests).await,
                QueueCommand::Save(idx) => {
                    if let Err(err) = downloader.save(idx).await {
                        sink.emit(EngineEvent::QueueSaveFailed {
                            idx,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
        sync_info!("download queue stopped");
    });
    tx
}
