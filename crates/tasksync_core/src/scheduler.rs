//! Decision logic for the visibility-aware poll loop.
//!
//! The scheduler owns no timer itself: it turns lifecycle and visibility
//! events into [`PollCommand`]s that a runtime executes.

use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCommand {
    /// Fetch now, outside the interval cadence. `syncing` raises the indicator until it resolves.
    FetchNow { syncing: bool },
    StartInterval,
    StopInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollScheduler {
    visibility: Visibility,
    interval_running: bool,
    syncing: bool,
    alive: bool,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    pub fn interval_running(&self) -> bool {
        self.interval_running
    }

    /// Mount. Fetches once immediately and starts the interval if the page is visible.
    pub fn attach(&mut self, visibility: Visibility) -> Vec<PollCommand> {
        self.alive = true;
        self.visibility = visibility;
        self.syncing = false;
        match visibility {
            Visibility::Visible => {
                self.interval_running = true;
                vec![
                    PollCommand::FetchNow { syncing: false },
                    PollCommand::StartInterval,
                ]
            }
            Visibility::Hidden => Vec::new(),
        }
    }

    pub fn visibility_changed(&mut self, visibility: Visibility) -> Vec<PollCommand> {
        if !self.alive || visibility == self.visibility {
            return Vec::new();
        }
        self.visibility = visibility;
        match visibility {
            Visibility::Hidden => {
                if self.interval_running {
                    self.interval_running = false;
                    vec![PollCommand::StopInterval]
                } else {
                    Vec::new()
                }
            }
            Visibility::Visible => {
                self.syncing = true;
                self.interval_running = true;
                vec![
                    PollCommand::FetchNow { syncing: true },
                    PollCommand::StartInterval,
                ]
            }
        }
    }

    /// An out-of-band fetch finished (successfully or not). Returns `true` if the
    /// syncing indicator was lowered.
    pub fn sync_resolved(&mut self) -> bool {
        std::mem::replace(&mut self.syncing, false)
    }

    /// Whether a response arriving now may still be applied.
    pub fn accepts_results(&self) -> bool {
        self.alive
    }

    /// Unmount. Everything in flight is discarded from here on.
    pub fn detach(&mut self) -> Vec<PollCommand> {
        self.alive = false;
        self.syncing = false;
        if std::mem::replace(&mut self.interval_running, false) {
            vec![PollCommand::StopInterval]
        } else {
            Vec::new()
        }
    }
}
