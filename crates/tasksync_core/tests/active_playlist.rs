use std::sync::Once;

use pretty_assertions::assert_eq;
use tasksync_core::{
    update, AppState, Effect, Msg, Playlist, PrepareOptions, Task, TaskStatus, ToastKind, Track,
    TrackStatus, ViewMode, PENDING_PLACEHOLDER, PREPARING_PLACEHOLDER,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(tasksync_logging::initialize_for_tests);
}

fn track(id: &str, title: &str) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        artist: Some("Artist".to_string()),
        url: Some(format!("https://example.com/track/{id}")),
        status: TrackStatus::Pending,
        progress: 0.0,
    }
}

fn playlist(titles: &[&str]) -> Playlist {
    Playlist {
        title: "Mix".to_string(),
        provider: "youtube".to_string(),
        tracks: titles
            .iter()
            .enumerate()
            .map(|(i, title)| track(&i.to_string(), title))
            .collect(),
        ..Playlist::default()
    }
}

/// Attached state that has already seen one snapshot and follows `t1`.
fn following_t1() -> AppState {
    let (state, _) = update(AppState::new(), Msg::Attached);
    let (state, _) = update(state, Msg::SnapshotReceived(Vec::new()));
    let (state, effects) = update(
        state,
        Msg::PrepareSubmitted {
            url: " https://example.com/playlist/1 ".to_string(),
            options: PrepareOptions::default(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::PrepareTask {
            url: "https://example.com/playlist/1".to_string(),
            options: PrepareOptions::default(),
        }]
    );
    let (state, _) = update(
        state,
        Msg::PrepareAccepted {
            task_id: "t1".to_string(),
        },
    );
    state
}

fn snapshot(state: AppState, task: Task) -> (AppState, Vec<Effect>) {
    update(state, Msg::SnapshotReceived(vec![task]))
}

#[test]
fn pending_and_preparing_show_server_message_or_placeholder() {
    init_logging();
    let state = following_t1();
    let (state, _) = snapshot(state, Task::new("t1", TaskStatus::Pending));
    assert_eq!(state.active().loading(), Some(PENDING_PLACEHOLDER));

    let (state, _) = snapshot(state, Task::new("t1", TaskStatus::Preparing));
    assert_eq!(state.active().loading(), Some(PREPARING_PLACEHOLDER));

    let (state, _) = snapshot(
        state,
        Task::new("t1", TaskStatus::Preparing).with_message("Resolving 12 entries"),
    );
    assert_eq!(state.active().loading(), Some("Resolving 12 entries"));
    assert_eq!(state.active().view(), ViewMode::Input);
}

#[test]
fn first_ready_switches_to_preview_and_selects_everything() {
    init_logging();
    let state = following_t1();
    let (mut state, effects) = snapshot(
        state,
        Task::new("t1", TaskStatus::Ready).with_playlist(playlist(&["One", "Two", "Three"])),
    );
    assert!(effects.is_empty());
    assert!(state.consume_dirty());

    let view = state.view_at(chrono::Utc::now());
    assert_eq!(view.view, ViewMode::Preview);
    assert_eq!(view.loading, None);
    assert_eq!(view.selection, vec![0, 1, 2]);
    assert_eq!(view.playlist.map(|p| p.tracks.len()), Some(3));
}

#[test]
fn identical_ready_playlist_keeps_selection() {
    init_logging();
    let state = following_t1();
    let ready = Task::new("t1", TaskStatus::Ready).with_playlist(playlist(&["One", "Two"]));
    let (state, _) = snapshot(state, ready.clone());
    let (mut state, _) = update(state, Msg::SelectionChanged(vec![1]));
    assert!(state.consume_dirty());

    let (mut state, _) = snapshot(state, ready);
    assert_eq!(state.active().selection().iter().copied().collect::<Vec<_>>(), vec![1]);
    assert!(!state.consume_dirty());
}

#[test]
fn structurally_different_playlist_is_reprojected() {
    init_logging();
    let state = following_t1();
    let (state, _) = snapshot(
        state,
        Task::new("t1", TaskStatus::Ready).with_playlist(playlist(&["One", "Two"])),
    );
    let (state, _) = update(state, Msg::SelectionChanged(vec![0]));

    // A change the shallow list diff cannot see.
    let (mut state, _) = snapshot(
        state,
        Task::new("t1", TaskStatus::Ready).with_playlist(playlist(&["One", "Two (Remix)"])),
    );
    assert!(state.consume_dirty());
    let held = state.active().playlist().unwrap();
    assert_eq!(held.tracks[1].title, "Two (Remix)");
    assert_eq!(state.active().selection().len(), 2);
}

#[test]
fn error_surfaces_inline_and_as_toast_then_stops_following() {
    init_logging();
    let state = following_t1();
    let (state, effects) = snapshot(
        state,
        Task::new("t1", TaskStatus::Error).with_message("Unsupported URL"),
    );
    assert_eq!(
        effects,
        vec![Effect::ShowToast {
            kind: ToastKind::Error,
            text: "Unsupported URL".to_string(),
        }]
    );
    assert_eq!(state.active().error(), Some("Unsupported URL"));
    assert_eq!(state.active().loading(), None);
    assert_eq!(state.active().task_id(), None);

    // No further tracking of that id.
    let (state, effects) = snapshot(
        state,
        Task::new("t1", TaskStatus::Ready).with_playlist(playlist(&["One"])),
    );
    assert!(effects.is_empty());
    assert_eq!(state.active().view(), ViewMode::Input);
}

#[test]
fn completed_and_cancelled_do_not_unsubscribe() {
    init_logging();
    let state = following_t1();
    let (state, _) = snapshot(state, Task::new("t1", TaskStatus::Cancelled));
    assert_eq!(state.active().task_id().map(String::as_str), Some("t1"));
    let (state, _) = snapshot(state, Task::new("t1", TaskStatus::Downloading));
    assert_eq!(state.active().task_id().map(String::as_str), Some("t1"));
}

#[test]
fn empty_url_is_rejected_before_any_request() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::Attached);
    let (state, effects) = update(
        state,
        Msg::PrepareSubmitted {
            url: "   ".to_string(),
            options: PrepareOptions::default(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::ShowToast {
            kind: ToastKind::Error,
            text: "Please enter a URL".to_string(),
        }]
    );
    assert_eq!(state.active().error(), Some("Please enter a URL"));
}

#[test]
fn start_sends_partial_selection_only_when_needed() {
    init_logging();
    let state = following_t1();
    let (state, _) = snapshot(
        state,
        Task::new("t1", TaskStatus::Ready).with_playlist(playlist(&["One", "Two", "Three"])),
    );

    let (state, effects) = update(state, Msg::StartClicked);
    assert_eq!(
        effects,
        vec![Effect::StartTask {
            task_id: "t1".to_string(),
            selected_indices: None,
        }]
    );

    let (state, _) = update(state, Msg::SelectionChanged(vec![2, 0, 7]));
    let (state, effects) = update(state, Msg::StartClicked);
    assert_eq!(
        effects,
        vec![Effect::StartTask {
            task_id: "t1".to_string(),
            selected_indices: Some(vec![0, 2]),
        }]
    );

    let (state, _) = update(state, Msg::SelectionChanged(Vec::new()));
    let (state, effects) = update(state, Msg::StartClicked);
    assert_eq!(
        effects,
        vec![Effect::ShowToast {
            kind: ToastKind::Error,
            text: "Select at least one track".to_string(),
        }]
    );

    let (state, effects) = update(
        state,
        Msg::StartAccepted {
            task_id: "t1".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::ShowToast {
            kind: ToastKind::Info,
            text: "Download started".to_string(),
        }]
    );
    assert_eq!(state.active().view(), ViewMode::Input);
    assert_eq!(state.active().task_id(), None);
}
