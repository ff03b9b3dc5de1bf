use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use chrono::Utc;
use tasksync_core::{
    update, AppState, AppViewModel, Msg, PrepareOptions, QueueItem, QueueRequest, ToastKind,
    Visibility,
};
use tasksync_engine::{DeviceId, EngineEvent, EngineHandle};
use tasksync_logging::{sync_debug, sync_info, sync_warn};

use super::config::{ClientConfig, DEFAULT_CONFIG_FILE};
use super::effects::{to_msg, EffectRunner};
use super::shell::{self, Command};
use super::{logging, render};

/// Everything the session loop reacts to, merged onto one channel.
pub enum Inbox {
    Line(String),
    Closed,
    Engine(EngineEvent),
    Msg(Msg),
}

pub fn run_app() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = ClientConfig::load(&config_path)?;
    logging::initialize(config.log_destination, config.verbose);
    sync_info!("Starting tasksync against {}", config.base_url);

    let device_id = DeviceId::load_or_create(&config.device_id_file)
        .with_context(|| format!("device id at {:?}", config.device_id_file))?;
    let (engine, events) = EngineHandle::spawn(config.engine_settings(), device_id)
        .context("failed to start the sync engine")?;

    let (inbox_tx, inbox_rx) = mpsc::channel::<Inbox>();
    spawn_event_forwarder(events, inbox_tx.clone());
    spawn_stdin_reader(inbox_tx.clone());

    let state = AppState::new()
        .with_device(config.device_class())
        .with_staleness(config.staleness());
    let runner = EffectRunner::new(engine, inbox_tx, config.notifications);
    let mut session = Session::new(state, runner);

    println!("tasksync ready; type `help` for commands");
    session.dispatch(Msg::Attached);
    session.runner.engine().attach(Visibility::Visible);

    for item in inbox_rx {
        match item {
            Inbox::Line(line) => {
                if !session.handle_line(&line) {
                    break;
                }
            }
            Inbox::Closed => break,
            Inbox::Engine(event) => session.handle_event(event),
            Inbox::Msg(msg) => session.dispatch(msg),
        }
    }

    session.shutdown();
    Ok(())
}

fn spawn_event_forwarder(events: mpsc::Receiver<EngineEvent>, inbox: mpsc::Sender<Inbox>) {
    thread::spawn(move || {
        for event in events {
            if inbox.send(Inbox::Engine(event)).is_err() {
                break;
            }
        }
        sync_debug!("engine event channel closed");
    });
}

fn spawn_stdin_reader(inbox: mpsc::Sender<Inbox>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if inbox.send(Inbox::Line(line)).is_err() {
                return;
            }
        }
        let _ = inbox.send(Inbox::Closed);
    });
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    last_view: AppViewModel,
    /// Options of the most recent `prepare`, reused for queued tracks.
    last_options: PrepareOptions,
    queue: BTreeMap<usize, QueueItem>,
}

impl Session {
    fn new(state: AppState, runner: EffectRunner) -> Self {
        Self {
            state,
            runner,
            last_view: AppViewModel::default(),
            last_options: PrepareOptions::default(),
            queue: BTreeMap::new(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            let view = state.view_at(Utc::now());
            for line in render::render_changes(&self.last_view, &view) {
                println!("{line}");
            }
            self.last_view = view;
        }
        self.state = state;
        self.runner.enqueue(effects);
    }

    /// Returns `false` when the user asked to quit.
    fn handle_line(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return true;
        }
        let command = match shell::parse(line) {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                return true;
            }
        };

        match command {
            Command::Prepare { url, options } => {
                self.last_options = options.clone();
                self.dispatch(Msg::PrepareSubmitted { url, options });
            }
            Command::Select(indices) => self.dispatch(Msg::SelectionChanged(indices)),
            Command::Start => self.dispatch(Msg::StartClicked),
            Command::Back => self.dispatch(Msg::BackToInput),
            Command::Cancel(task_id) => self.dispatch(Msg::CancelClicked { task_id }),
            Command::Delete(task_id) => self.dispatch(Msg::DeleteClicked { task_id }),
            Command::Link(task_id) => self.runner.engine().fetch_download_link(task_id),
            Command::Queue(picks) => self.enqueue_tracks(picks),
            Command::Save(idx) => self.runner.engine().save_queue_item(idx),
            Command::Hide => self.runner.engine().set_visibility(Visibility::Hidden),
            Command::Show => self.runner.engine().set_visibility(Visibility::Visible),
            Command::Tasks => {
                for line in render::task_table(&self.state.view_at(Utc::now())) {
                    println!("{line}");
                }
            }
            Command::History => self.runner.engine().history(),
            Command::Help => println!("{}", shell::HELP),
            Command::Quit => return false,
        }
        true
    }

    fn enqueue_tracks(&mut self, picks: Vec<usize>) {
        let Some(playlist) = self.state.active().playlist() else {
            println!("{}", render::toast(ToastKind::Error, "No playlist on preview"));
            return;
        };
        let requests = QueueRequest::from_selection(playlist, picks, &self.last_options);
        if requests.is_empty() {
            println!("{}", render::toast(ToastKind::Error, "No such tracks"));
            return;
        }
        sync_info!("Queueing {} tracks", requests.len());
        self.runner.engine().enqueue_downloads(requests);
    }

    fn handle_event(&mut self, event: EngineEvent) {
        let event = match to_msg(event) {
            Ok(msg) => {
                self.dispatch(msg);
                return;
            }
            Err(event) => event,
        };

        match event {
            EngineEvent::CancelRequested { task_id, .. } => {
                sync_info!("Cancel of {} accepted", task_id);
            }
            EngineEvent::Saved {
                task_id,
                result: Ok(path),
            } => println!("{}", render::saved(&task_id, &path)),
            EngineEvent::Saved {
                task_id,
                result: Err(err),
            } => {
                sync_warn!("Save of {} failed: {}", task_id, err);
                let text = format!("Could not save {task_id}: {}", err.user_message());
                println!("{}", render::toast(ToastKind::Error, &text));
            }
            EngineEvent::History(Ok(entries)) => {
                for line in render::history(&entries) {
                    println!("{line}");
                }
            }
            EngineEvent::History(Err(err)) => {
                let text = format!("Could not load history: {}", err.user_message());
                println!("{}", render::toast(ToastKind::Error, &text));
            }
            EngineEvent::QueueItemChanged { idx, item } => {
                println!("{}", render::queue_item(idx, &item));
                let claimed = item.task_id().map(str::to_string);
                let known = self.queue.get(&idx).and_then(QueueItem::task_id).map(str::to_string);
                self.queue.insert(idx, item);
                if let Some(task_id) = claimed.filter(|id| known.as_ref() != Some(id)) {
                    self.dispatch(Msg::QueueTaskClaimed { task_id });
                }
            }
            EngineEvent::QueueOpenUrl { idx, url } => {
                let task_id = self
                    .queue
                    .get(&idx)
                    .and_then(QueueItem::task_id)
                    .map_or_else(|| format!("queue-{idx}"), str::to_string);
                self.runner.engine().save_file(task_id, url);
            }
            EngineEvent::QueueSaveFailed { idx, reason } => {
                let text = format!("Queue item {idx}: {reason}");
                println!("{}", render::toast(ToastKind::Error, &text));
            }
            EngineEvent::QueueFinished(summary) => {
                println!("{}", render::queue_summary(&summary));
                self.queue.clear();
            }
            // Consumed by `to_msg`.
            EngineEvent::Snapshot(_)
            | EngineEvent::SnapshotFailed(_)
            | EngineEvent::Syncing(_)
            | EngineEvent::Prepared(_)
            | EngineEvent::Started { .. }
            | EngineEvent::Deleted { .. }
            | EngineEvent::DownloadLink { .. } => {}
        }
    }

    fn shutdown(&mut self) {
        self.runner.engine().detach();
        self.dispatch(Msg::Detached);
        sync_info!("tasksync session closed");
    }
}
