use tasksync_core::{PollCommand, PollScheduler, Visibility};

#[test]
fn attach_while_visible_fetches_and_starts_interval() {
    let mut scheduler = PollScheduler::new();
    assert_eq!(
        scheduler.attach(Visibility::Visible),
        vec![
            PollCommand::FetchNow { syncing: false },
            PollCommand::StartInterval
        ]
    );
    assert!(scheduler.interval_running());
    assert!(!scheduler.is_syncing());
}

#[test]
fn attach_while_hidden_stays_idle() {
    let mut scheduler = PollScheduler::new();
    assert!(scheduler.attach(Visibility::Hidden).is_empty());
    assert!(!scheduler.interval_running());
}

#[test]
fn hiding_stops_the_interval_outright() {
    let mut scheduler = PollScheduler::new();
    scheduler.attach(Visibility::Visible);
    assert_eq!(
        scheduler.visibility_changed(Visibility::Hidden),
        vec![PollCommand::StopInterval]
    );
    assert!(!scheduler.interval_running());
    assert!(scheduler.visibility_changed(Visibility::Hidden).is_empty());
}

#[test]
fn resume_fetches_once_with_syncing_and_restarts_interval() {
    let mut scheduler = PollScheduler::new();
    scheduler.attach(Visibility::Visible);
    scheduler.visibility_changed(Visibility::Hidden);

    assert_eq!(
        scheduler.visibility_changed(Visibility::Visible),
        vec![
            PollCommand::FetchNow { syncing: true },
            PollCommand::StartInterval
        ]
    );
    assert!(scheduler.is_syncing());
    assert!(scheduler.sync_resolved());
    assert!(!scheduler.is_syncing());
    assert!(!scheduler.sync_resolved());
}

#[test]
fn detach_stops_everything_and_rejects_late_results() {
    let mut scheduler = PollScheduler::new();
    scheduler.attach(Visibility::Visible);
    assert!(scheduler.accepts_results());

    assert_eq!(scheduler.detach(), vec![PollCommand::StopInterval]);
    assert!(!scheduler.accepts_results());
    assert!(scheduler.visibility_changed(Visibility::Hidden).is_empty());
    assert!(scheduler.visibility_changed(Visibility::Visible).is_empty());
    assert!(scheduler.detach().is_empty());
}
