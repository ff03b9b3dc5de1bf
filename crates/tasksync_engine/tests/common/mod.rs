#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tasksync_core::{HistoryEntry, PrepareOptions, QueueItem, QueueSummary, Task, TaskId, TaskStatus};
use tasksync_engine::{ApiError, EngineEvent, EventSink, FailureKind, QueueObserver, TaskApi};

/// Status the fake server reports on successive polls after `/start`. The last step sticks.
pub type Script = Vec<(TaskStatus, f64, Option<&'static str>)>;

pub fn default_script() -> Script {
    vec![
        (TaskStatus::Downloading, 40.0, None),
        (TaskStatus::Completed, 100.0, None),
    ]
}

struct ServerTask {
    task: Task,
    started: bool,
    script: VecDeque<(TaskStatus, f64, Option<&'static str>)>,
}

#[derive(Default)]
struct FakeState {
    static_tasks: Vec<Task>,
    tasks: Vec<ServerTask>,
    scripts: HashMap<String, Script>,
    prepare_failures: HashSet<String>,
    token_failures: usize,
    list_failures: usize,
    next_id: u32,
    list_calls: usize,
    calls: Vec<String>,
}

/// In-memory task server. No sockets, so it is safe under a paused clock.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    list_delay: Duration,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list_delay(delay: Duration) -> Self {
        Self {
            list_delay: delay,
            ..Self::default()
        }
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.state.lock().unwrap().static_tasks = tasks;
    }

    pub fn script(&self, url: &str, script: Script) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(url.to_string(), script);
    }

    pub fn fail_prepare(&self, url: &str) {
        self.state
            .lock()
            .unwrap()
            .prepare_failures
            .insert(url.to_string());
    }

    pub fn fail_next_tokens(&self, count: usize) {
        self.state.lock().unwrap().token_failures = count;
    }

    /// The next `count` task-list requests fail without advancing any script.
    pub fn fail_next_lists(&self, count: usize) {
        self.state.lock().unwrap().list_failures = count;
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

fn not_found() -> ApiError {
    ApiError {
        kind: FailureKind::HttpStatus(404),
        message: "Task not found".to_string(),
    }
}

#[async_trait::async_trait]
impl TaskApi for FakeApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.list_failures > 0 {
            state.list_failures -= 1;
            return Err(ApiError {
                kind: FailureKind::Timeout,
                message: "operation timed out".to_string(),
            });
        }
        for entry in state.tasks.iter_mut().filter(|t| t.started) {
            let step = if entry.script.len() > 1 {
                entry.script.pop_front()
            } else {
                entry.script.front().cloned()
            };
            if let Some((status, progress, message)) = step {
                entry.task.status = status;
                entry.task.progress = progress;
                entry.task.message = message.map(str::to_string);
            }
        }
        let mut snapshot = state.static_tasks.clone();
        snapshot.extend(state.tasks.iter().map(|t| t.task.clone()));
        Ok(snapshot)
    }

    async fn prepare(&self, url: &str, _options: &PrepareOptions) -> Result<TaskId, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("prepare {url}"));
        if state.prepare_failures.contains(url) {
            return Err(ApiError {
                kind: FailureKind::HttpStatus(429),
                message: "Too many queued downloads for this device".to_string(),
            });
        }
        state.next_id += 1;
        let id = format!("t{}", state.next_id);
        let script = state.scripts.get(url).cloned().unwrap_or_else(default_script);
        state.tasks.push(ServerTask {
            task: Task::new(id.clone(), TaskStatus::Ready),
            started: false,
            script: script.into(),
        });
        Ok(id)
    }

    async fn start(
        &self,
        task_id: &str,
        _selected_indices: Option<&[usize]>,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("start {task_id}"));
        let entry = state
            .tasks
            .iter_mut()
            .find(|t| t.task.id == task_id)
            .ok_or_else(not_found)?;
        entry.started = true;
        entry.task.status = TaskStatus::Queued;
        Ok(())
    }

    async fn cancel(&self, task_id: &str) -> Result<(), ApiError> {
        self.state.lock().unwrap().calls.push(format!("cancel {task_id}"));
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<(), ApiError> {
        self.state.lock().unwrap().calls.push(format!("delete {task_id}"));
        Ok(())
    }

    async fn download_token(&self, task_id: &str) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("token {task_id}"));
        if state.token_failures > 0 {
            state.token_failures -= 1;
            return Err(ApiError {
                kind: FailureKind::Network,
                message: "connection reset".to_string(),
            });
        }
        Ok(format!("tok-{task_id}"))
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        Ok(Vec::new())
    }

    fn download_file_url(&self, task_id: &str, token: &str) -> String {
        format!("/api/download_file/{task_id}?token={token}")
    }
}

#[derive(Default)]
pub struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    changes: Mutex<Vec<(usize, QueueItem)>>,
    opened: Mutex<Vec<(usize, String)>>,
    finished: Mutex<Vec<QueueSummary>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress values reported for one item, in order.
    pub fn progress_of(&self, idx: usize) -> Vec<f64> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .filter(|(i, _)| *i == idx)
            .map(|(_, item)| item.progress)
            .collect()
    }

    pub fn last_state(&self, idx: usize) -> Option<QueueItem> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(i, _)| *i == idx)
            .map(|(_, item)| item.clone())
    }

    pub fn opened(&self) -> Vec<(usize, String)> {
        self.opened.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<QueueSummary> {
        self.finished.lock().unwrap().clone()
    }
}

impl QueueObserver for RecordingObserver {
    fn item_changed(&self, idx: usize, item: &QueueItem) {
        self.changes.lock().unwrap().push((idx, item.clone()));
    }

    fn open_url(&self, idx: usize, url: &str) {
        self.opened.lock().unwrap().push((idx, url.to_string()));
    }

    fn finished(&self, summary: QueueSummary) {
        self.finished.lock().unwrap().push(summary);
    }
}
