use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tasksync_core::{DeviceClass, ProgressMapping, StalenessThresholds};
use tasksync_engine::{ApiSettings, EngineSettings, QueueTimings};
use tasksync_logging::{sync_info, sync_warn};
use thiserror::Error;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "tasksync.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Desktop,
    Mobile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub prepare_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_status_checks: u32,
    pub advance_delay_ms: u64,
    pub finish_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        let timings = QueueTimings::default();
        Self {
            prepare_delay_ms: millis(timings.prepare_delay),
            poll_interval_ms: millis(timings.poll_interval),
            max_status_checks: timings.max_poll_attempts,
            advance_delay_ms: millis(timings.advance_delay),
            finish_delay_ms: millis(timings.finish_delay),
        }
    }
}

/// Everything the shell reads from `tasksync.ron`. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub queue: QueueConfig,
    pub progress_base: f64,
    pub progress_divisor: f64,
    pub stale_ready_secs: i64,
    pub stale_active_secs: i64,
    pub device_class: DeviceKind,
    /// When set, the device class is detected from it instead.
    pub user_agent: Option<String>,
    /// Answer given when the core asks for notification permission.
    pub notifications: bool,
    pub download_dir: PathBuf,
    pub device_id_file: PathBuf,
    pub log_destination: LogDestination,
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        let staleness = StalenessThresholds::default();
        Self {
            base_url: engine.api.base_url.clone(),
            connect_timeout_ms: millis(engine.api.connect_timeout),
            request_timeout_ms: millis(engine.api.request_timeout),
            poll_interval_ms: millis(engine.poll_interval),
            queue: QueueConfig::default(),
            progress_base: engine.progress_mapping.base,
            progress_divisor: engine.progress_mapping.divisor,
            stale_ready_secs: staleness.ready.num_seconds(),
            stale_active_secs: staleness.active.num_seconds(),
            device_class: DeviceKind::default(),
            user_agent: None,
            notifications: true,
            download_dir: engine.download_dir,
            device_id_file: PathBuf::from(".tasksync_device"),
            log_destination: LogDestination::default(),
            verbose: false,
        }
    }
}

impl ClientConfig {
    /// Reads the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                sync_info!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.sanitized())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            api: ApiSettings {
                base_url: self.base_url.clone(),
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            queue: QueueTimings {
                prepare_delay: Duration::from_millis(self.queue.prepare_delay_ms),
                poll_interval: Duration::from_millis(self.queue.poll_interval_ms),
                max_poll_attempts: self.queue.max_status_checks,
                advance_delay: Duration::from_millis(self.queue.advance_delay_ms),
                finish_delay: Duration::from_millis(self.queue.finish_delay_ms),
            },
            progress_mapping: ProgressMapping {
                base: self.progress_base,
                divisor: self.progress_divisor,
            },
            download_dir: self.download_dir.clone(),
        }
    }

    pub fn staleness(&self) -> StalenessThresholds {
        StalenessThresholds {
            ready: chrono::Duration::seconds(self.stale_ready_secs),
            active: chrono::Duration::seconds(self.stale_active_secs),
        }
    }

    pub fn device_class(&self) -> DeviceClass {
        if let Some(user_agent) = &self.user_agent {
            return DeviceClass::from_user_agent(user_agent);
        }
        match self.device_class {
            DeviceKind::Desktop => DeviceClass::Desktop,
            DeviceKind::Mobile => DeviceClass::Mobile,
        }
    }

    /// Zero intervals would spin the poller; a zero divisor breaks the progress mapping.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.poll_interval_ms == 0 {
            sync_warn!("poll_interval_ms must be positive; using default");
            self.poll_interval_ms = defaults.poll_interval_ms;
        }
        if self.queue.poll_interval_ms == 0 {
            sync_warn!("queue.poll_interval_ms must be positive; using default");
            self.queue.poll_interval_ms = defaults.queue.poll_interval_ms;
        }
        if self.queue.max_status_checks == 0 {
            self.queue.max_status_checks = defaults.queue.max_status_checks;
        }
        if self.progress_divisor <= 0.0 {
            sync_warn!("progress_divisor must be positive; using default");
            self.progress_divisor = defaults.progress_divisor;
        }
        self
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
