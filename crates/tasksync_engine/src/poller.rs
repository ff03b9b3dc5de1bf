use std::sync::Arc;
use std::time::Duration;

use tasksync_core::{PollCommand, PollScheduler, Visibility};
use tasksync_logging::sync_debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::{EventSink, TaskApi};
use crate::EngineEvent;

/// Owner side of a running poll loop. Dropping it stops the loop.
pub struct PollerHandle {
    visibility_tx: mpsc::UnboundedSender<Visibility>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn set_visibility(&self, visibility: Visibility) {
        let _ = self.visibility_tx.send(visibility);
    }

    /// Stops polling. Responses still in flight are discarded, not emitted.
    pub fn detach(&self) {
        self.shutdown.cancel();
    }

    pub fn is_detached(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Detaches and waits for the loop to exit.
    pub async fn stop(mut self) {
        self.detach();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Starts the poll loop on the current tokio runtime.
pub fn spawn_poller(
    api: Arc<dyn TaskApi>,
    period: Duration,
    visibility: Visibility,
    sink: Arc<dyn EventSink>,
) -> PollerHandle {
    let (visibility_tx, visibility_rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let poller = Poller {
        api,
        sink,
        period,
        scheduler: PollScheduler::new(),
        ticker: None,
        shutdown: shutdown.clone(),
    };
    let task = tokio::spawn(poller.run(visibility, visibility_rx));
    PollerHandle {
        visibility_tx,
        shutdown,
        task: Some(task),
    }
}

struct Poller {
    api: Arc<dyn TaskApi>,
    sink: Arc<dyn EventSink>,
    period: Duration,
    scheduler: PollScheduler,
    ticker: Option<Interval>,
    shutdown: CancellationToken,
}

impl Poller {
    async fn run(mut self, initial: Visibility, mut visibility_rx: mpsc::UnboundedReceiver<Visibility>) {
        let commands = self.scheduler.attach(initial);
        self.execute(commands).await;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(visibility) = visibility_rx.recv() => {
                    sync_debug!("visibility changed to {visibility:?}");
                    let commands = self.scheduler.visibility_changed(visibility);
                    self.execute(commands).await;
                }
                _ = next_tick(&mut self.ticker) => self.fetch().await,
            }
        }

        self.scheduler.detach();
        self.ticker = None;
        sync_debug!("poller stopped");
    }

    async fn execute(&mut self, commands: Vec<PollCommand>) {
        for command in commands {
            match command {
                PollCommand::FetchNow { syncing } => {
                    if syncing {
                        self.emit(EngineEvent::Syncing(true));
                    }
                    self.fetch().await;
                    if syncing && self.scheduler.sync_resolved() {
                        self.emit(EngineEvent::Syncing(false));
                    }
                }
                PollCommand::StartInterval => {
                    // First tick one period out; the immediate fetch already happened.
                    let mut ticker = interval_at(Instant::now() + self.period, self.period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.ticker = Some(ticker);
                }
                PollCommand::StopInterval => self.ticker = None,
            }
        }
    }

    async fn fetch(&mut self) {
        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return,
            result = self.api.list_tasks() => result,
        };
        match result {
            Ok(tasks) => self.emit(EngineEvent::Snapshot(tasks)),
            Err(err) => {
                sync_debug!("poll failed: {err}");
                self.emit(EngineEvent::SnapshotFailed(err));
            }
        }
    }

    fn emit(&self, event: EngineEvent) {
        if self.shutdown.is_cancelled() || !self.scheduler.accepts_results() {
            return;
        }
        self.sink.emit(event);
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
