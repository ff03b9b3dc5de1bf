use std::collections::HashSet;

use tasksync_logging::sync_debug;

use crate::{Effect, Task, TaskId, TaskStatus, ToastKind};

/// Device class decides whether completed artifacts are saved automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    #[default]
    Desktop,
    /// Browsers that block downloads not started by a direct user gesture.
    Mobile,
}

impl DeviceClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        const MOBILE_MARKERS: &[&str] = &[
            "android",
            "iphone",
            "ipad",
            "ipod",
            "mobile",
            "blackberry",
            "iemobile",
            "opera mini",
        ];
        let ua = user_agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|marker| ua.contains(marker)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPermission {
    /// Never asked.
    #[default]
    Default,
    Granted,
    Denied,
}

/// Remembers which completed tasks already had their one-time side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionTracker {
    handled: HashSet<TaskId>,
    primed: bool,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the first snapshot after attach has been seen.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn is_handled(&self, task_id: &str) -> bool {
        self.handled.contains(task_id)
    }

    /// Returns the tasks that just completed and have not been handled yet.
    ///
    /// The first snapshot only records what is already completed and returns nothing.
    pub fn observe<'a>(&mut self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let completed = tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed);

        if !self.primed {
            self.primed = true;
            for task in completed {
                self.handled.insert(task.id.clone());
            }
            sync_debug!(
                "completion tracker primed with {} completed task(s)",
                self.handled.len()
            );
            return Vec::new();
        }

        completed
            .filter(|task| self.handled.insert(task.id.clone()))
            .collect()
    }

    /// Forget everything; the next snapshot primes again.
    pub fn reset(&mut self) {
        self.handled.clear();
        self.primed = false;
    }
}

/// Side effects for a task that just completed.
pub fn completion_effects(
    task: &Task,
    device: DeviceClass,
    permission: NotificationPermission,
) -> Vec<Effect> {
    let name = task.display_name();
    let mut effects = Vec::with_capacity(3);

    let toast = match device {
        DeviceClass::Desktop => format!("Download ready: {name}"),
        DeviceClass::Mobile => format!("{name} is ready. Tap Save to download it."),
    };
    effects.push(Effect::toast(ToastKind::Success, toast));

    if permission == NotificationPermission::Granted {
        effects.push(Effect::SystemNotification {
            title: "Download complete".to_string(),
            body: name.to_string(),
        });
    }

    match device {
        DeviceClass::Desktop => effects.push(Effect::FetchDownloadLink {
            task_id: task.id.clone(),
        }),
        DeviceClass::Mobile => {}
    }

    effects
}
