use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Server-issued, opaque task identifier.
pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Preparing,
    Ready,
    Queued,
    Downloading,
    Zipping,
    Completed,
    Cancelled,
    Error,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Preparing => "preparing",
            TaskStatus::Ready => "ready",
            TaskStatus::Queued => "queued",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Zipping => "zipping",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Error => "error",
        }
    }

    /// Statuses in which the server is expected to keep making progress.
    pub fn is_active(self) -> bool {
        match self {
            TaskStatus::Pending
            | TaskStatus::Preparing
            | TaskStatus::Queued
            | TaskStatus::Downloading
            | TaskStatus::Zipping => true,
            TaskStatus::Ready
            | TaskStatus::Completed
            | TaskStatus::Cancelled
            | TaskStatus::Error => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    #[default]
    Pending,
    Queued,
    Downloading,
    Completed,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TrackStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: f64,
}

impl Track {
    /// Label used for queue items and file names: `artist - title`, or the bare title.
    pub fn display_title(&self) -> String {
        match self.artist.as_deref().map(str::trim) {
            Some(artist) if !artist.is_empty() => format!("{artist} - {}", self.title),
            _ => self.title.clone(),
        }
    }
}

/// Playlist metadata attached to a task. Partial until the task reaches `ready`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub track_count: Option<usize>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub playlist: Option<Playlist>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub track_count: Option<usize>,
}

impl Task {
    /// Minimal task, mostly useful for building snapshots by hand.
    pub fn new(id: impl Into<TaskId>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            status,
            progress: 0.0,
            message: None,
            created_at: None,
            updated_at: None,
            status_updated_at: None,
            playlist: None,
            title: None,
            provider: None,
            thumbnail: None,
            track_count: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_playlist(mut self, playlist: Playlist) -> Self {
        self.playlist = Some(playlist);
        self
    }

    /// Human-facing name: convenience title, then playlist title, then the id.
    pub fn display_name(&self) -> &str {
        let from_title = self.title.as_deref().filter(|t| !t.is_empty());
        let from_playlist = self
            .playlist
            .as_ref()
            .map(|p| p.title.as_str())
            .filter(|t| !t.is_empty());
        from_title.or(from_playlist).unwrap_or(&self.id)
    }
}

/// Options forwarded verbatim to `/prepare`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrepareOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// One row of `GET /history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub task_id: TaskId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub track_count: usize,
    /// Written without an offset by the server; read as UTC.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The server sends `null` for unknown fields as often as it omits them.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_task_with_nulls_decodes() {
        let raw = r#"{
            "id": "1712345678",
            "status": "preparing",
            "progress": null,
            "message": null,
            "playlist": {"url": "https://example.com/p", "title": null},
            "updated_at": "2024-04-05T10:00:00.250000Z"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.status, TaskStatus::Preparing);
        assert_eq!(task.progress, 0.0);
        let playlist = task.playlist.unwrap();
        assert_eq!(playlist.url.as_deref(), Some("https://example.com/p"));
        assert!(playlist.title.is_empty());
        assert!(task.updated_at.is_some());
    }

    #[test]
    fn history_timestamp_without_offset_is_read_as_utc() {
        let raw = r#"{"task_id": "t1", "title": null, "timestamp": "2024-04-05T10:00:00.123456"}"#;
        let entry: HistoryEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(
            entry.timestamp.map(|t| t.to_rfc3339()),
            Some("2024-04-05T10:00:00.123456+00:00".to_string())
        );

        let garbled: HistoryEntry =
            serde_json::from_str(r#"{"task_id": "t2", "timestamp": "yesterday"}"#).unwrap();
        assert_eq!(garbled.timestamp, None);
    }
}
