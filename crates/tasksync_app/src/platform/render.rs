//! Turns view models and engine events into terminal lines.
//!
//! Rendering is diff-based: only rows that changed since the previous view are printed.

use std::path::Path;

use tasksync_core::{
    AppViewModel, HistoryEntry, Playlist, QueueItem, QueueItemStatus, QueueSummary, TaskRowView,
    ToastKind, ViewMode,
};

pub fn render_changes(prev: &AppViewModel, next: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    if prev.syncing != next.syncing {
        lines.push(if next.syncing {
            "~ syncing…".to_string()
        } else {
            "~ synced".to_string()
        });
    }

    for row in &next.tasks {
        let before = prev.tasks.iter().find(|r| r.task_id == row.task_id);
        match before {
            None => lines.push(format!("+ {}", task_row(row))),
            Some(before) if before != row => lines.push(format!("* {}", task_row(row))),
            Some(_) => {}
        }
    }
    for row in &prev.tasks {
        if !next.tasks.iter().any(|r| r.task_id == row.task_id) {
            lines.push(format!("- [{}] {}", row.task_id, row.name));
        }
    }

    if next.loading != prev.loading {
        if let Some(loading) = &next.loading {
            lines.push(format!("… {loading}"));
        }
    }
    if next.error != prev.error {
        if let Some(error) = &next.error {
            lines.push(format!("! {error}"));
        }
    }

    let preview_changed = next.view != prev.view || next.playlist != prev.playlist;
    match (next.view, &next.playlist) {
        (ViewMode::Preview, Some(playlist)) if preview_changed => {
            lines.extend(playlist_preview(playlist, &next.selection));
        }
        (ViewMode::Preview, _) => {
            if next.selection != prev.selection {
                lines.push(format!("selected: {}", selection_label(&next.selection)));
            }
        }
        (ViewMode::Input, _) if prev.view == ViewMode::Preview => {
            lines.push("back to URL input".to_string());
        }
        (ViewMode::Input, _) => {}
    }

    lines
}

/// Full task table, for the `tasks` command.
pub fn task_table(view: &AppViewModel) -> Vec<String> {
    if view.tasks.is_empty() {
        return vec!["(no tasks)".to_string()];
    }
    view.tasks.iter().map(task_row).collect()
}

pub fn task_row(row: &TaskRowView) -> String {
    let mut line = format!(
        "[{}] {}  {} {:.0}%",
        row.task_id, row.name, row.status, row.progress
    );
    if let Some(message) = row.message.as_deref().filter(|m| !m.is_empty()) {
        line.push_str(&format!("  ({message})"));
    }
    if row.unconfirmed {
        line.push_str("  [unconfirmed]");
    }
    if row.stale {
        line.push_str("  [stalled?]");
    }
    line
}

pub fn playlist_preview(playlist: &Playlist, selection: &[usize]) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, {} tracks)",
        if playlist.title.is_empty() {
            "Untitled playlist"
        } else {
            playlist.title.as_str()
        },
        if playlist.provider.is_empty() {
            "unknown source"
        } else {
            playlist.provider.as_str()
        },
        playlist.tracks.len()
    )];
    for (idx, track) in playlist.tracks.iter().enumerate() {
        let mark = if selection.contains(&idx) { 'x' } else { ' ' };
        lines.push(format!("  [{mark}] {idx:>3}  {}", track.display_title()));
    }
    lines
}

pub fn toast(kind: ToastKind, text: &str) -> String {
    let tag = match kind {
        ToastKind::Info => "info",
        ToastKind::Success => "ok",
        ToastKind::Error => "error",
    };
    format!("[{tag}] {text}")
}

pub fn notification(title: &str, body: &str) -> String {
    format!("(notify) {title}: {body}")
}

pub fn queue_item(idx: usize, item: &QueueItem) -> String {
    let mut line = format!(
        "queue #{idx} {}  {} {:.0}%",
        item.title, item.status, item.progress
    );
    match item.status {
        QueueItemStatus::Ready => line.push_str(&format!("  -> `save {idx}`")),
        QueueItemStatus::Error => {
            if let Some(error) = &item.error {
                line.push_str(&format!("  ({error})"));
            }
        }
        _ => {}
    }
    line
}

pub fn queue_summary(summary: &QueueSummary) -> String {
    format!(
        "queue finished: {} of {} saved, {} failed",
        summary.completed, summary.total, summary.failed
    )
}

pub fn saved(task_id: &str, path: &Path) -> String {
    format!("saved {task_id} to {}", path.display())
}

pub fn history(entries: &[HistoryEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["(no history)".to_string()];
    }
    entries
        .iter()
        .map(|entry| {
            let when = entry
                .timestamp
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown time".to_string());
            format!(
                "{when}  {}  ({}, {} tracks)",
                entry.title, entry.provider, entry.track_count
            )
        })
        .collect()
}

fn selection_label(selection: &[usize]) -> String {
    if selection.is_empty() {
        return "none".to_string();
    }
    selection
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
