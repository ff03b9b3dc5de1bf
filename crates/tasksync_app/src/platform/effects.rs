use std::sync::mpsc;

use tasksync_core::{Effect, Msg};
use tasksync_engine::{EngineEvent, EngineHandle};
use tasksync_logging::{sync_info, sync_warn};

use super::app::Inbox;
use super::render;

/// Executes effects returned by `update` against the engine and the terminal.
pub struct EffectRunner {
    engine: EngineHandle,
    inbox: mpsc::Sender<Inbox>,
    notifications: bool,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, inbox: mpsc::Sender<Inbox>, notifications: bool) -> Self {
        Self {
            engine,
            inbox,
            notifications,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::PrepareTask { url, options } => {
                    sync_info!("PrepareTask url_len={} url={}", url.len(), url);
                    self.engine.prepare(url, options);
                }
                Effect::StartTask {
                    task_id,
                    selected_indices,
                } => {
                    sync_info!(
                        "StartTask task_id={} selected={:?}",
                        task_id,
                        selected_indices
                    );
                    self.engine.start(task_id, selected_indices);
                }
                Effect::CancelTask { task_id } => self.engine.cancel(task_id),
                Effect::DeleteTask { task_id } => self.engine.delete(task_id),
                Effect::RequestNotificationPermission => {
                    // A terminal has no permission prompt; the config decides.
                    let _ = self.inbox.send(Inbox::Msg(Msg::NotificationPermissionResolved {
                        granted: self.notifications,
                    }));
                }
                Effect::ShowToast { kind, text } => println!("{}", render::toast(kind, &text)),
                Effect::SystemNotification { title, body } => {
                    println!("{}", render::notification(&title, &body));
                }
                Effect::FetchDownloadLink { task_id } => self.engine.fetch_download_link(task_id),
                Effect::SaveFile { task_id, url } => self.engine.save_file(task_id, url),
            }
        }
    }
}

/// Engine events the core state machine consumes. The rest are shell output only.
pub fn to_msg(event: EngineEvent) -> Result<Msg, EngineEvent> {
    let msg = match event {
        EngineEvent::Snapshot(tasks) => Msg::SnapshotReceived(tasks),
        EngineEvent::SnapshotFailed(err) => Msg::SnapshotFailed(err.to_string()),
        EngineEvent::Syncing(syncing) => Msg::SyncingChanged(syncing),
        EngineEvent::Prepared(Ok(task_id)) => Msg::PrepareAccepted { task_id },
        EngineEvent::Prepared(Err(err)) => Msg::PrepareFailed(err.user_message()),
        EngineEvent::Started {
            task_id,
            result: Ok(()),
        } => Msg::StartAccepted { task_id },
        EngineEvent::Started {
            result: Err(err), ..
        } => Msg::StartFailed(err.user_message()),
        EngineEvent::CancelRequested {
            task_id,
            result: Err(err),
        } => {
            sync_warn!("Cancel of {} failed: {}", task_id, err);
            Msg::CancelFailed { task_id }
        }
        EngineEvent::Deleted {
            task_id,
            result: Ok(()),
        } => Msg::TaskDeleted { task_id },
        EngineEvent::Deleted {
            task_id,
            result: Err(err),
        } => Msg::DeleteFailed {
            task_id,
            reason: err.user_message(),
        },
        EngineEvent::DownloadLink {
            task_id,
            result: Ok(url),
        } => Msg::DownloadLinkReady { task_id, url },
        EngineEvent::DownloadLink {
            task_id,
            result: Err(err),
        } => Msg::DownloadLinkFailed {
            task_id,
            reason: err.user_message(),
        },
        other => return Err(other),
    };
    Ok(msg)
}
