//! Countdown driven by the real interval tick source, on paused tokio time

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use countdown_timer::{
    state::{AppState, DurationIndex, RunState, TimerEvent},
    tasks::{tick_driver_task, IntervalTickSource, TICK_PERIOD},
    HistoryStore,
};

fn spawn_state(index: usize) -> Arc<AppState> {
    spawn_state_with(index, HistoryStore::in_memory())
}

fn spawn_state_with(index: usize, history: HistoryStore) -> Arc<AppState> {
    let (tick_source, tick_rx) = IntervalTickSource::new(TICK_PERIOD);
    let state = Arc::new(AppState::new(
        0,
        "127.0.0.1".to_string(),
        DurationIndex::new(index).unwrap(),
        history,
        tick_source,
    ));
    tokio::spawn(tick_driver_task(Arc::clone(&state), tick_rx));
    state
}

fn remaining(state: &AppState) -> u64 {
    state.snapshot().unwrap().remaining_seconds
}

#[tokio::test(start_paused = true)]
async fn test_counts_one_second_per_tick() {
    let state = spawn_state(0);
    state.start_or_resume().unwrap();

    sleep(Duration::from_millis(3500)).await;

    assert_eq!(remaining(&state), 297);
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_while_paused() {
    let state = spawn_state(1);
    state.start_or_resume().unwrap();
    sleep(Duration::from_millis(4500)).await;
    state.pause().unwrap();
    assert_eq!(remaining(&state), 596);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(remaining(&state), 596);

    state.start_or_resume().unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(remaining(&state), 595);
}

#[tokio::test(start_paused = true)]
async fn test_full_run_records_once_and_stops_ticking() {
    let state = spawn_state(0);
    let mut events = state.event_tx.subscribe();
    state.start_or_resume().unwrap();

    sleep(Duration::from_secs(305)).await;

    let snapshot = state.snapshot().unwrap();
    assert_eq!(snapshot.run_state, RunState::Idle);
    assert_eq!(snapshot.remaining_seconds, 300);
    assert!(!snapshot.ticking);

    let entries = state.history.list().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].elapsed_seconds, 300);
    assert_eq!(entries[0].set_seconds, 300);

    let mut finished = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, TimerEvent::Finished { .. }) {
            finished += 1;
        }
    }
    assert_eq!(finished, 1);
}

#[tokio::test(start_paused = true)]
async fn test_finished_run_is_written_to_history_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let state = spawn_state_with(0, HistoryStore::open(Some(path.clone())).unwrap());
    state.start_or_resume().unwrap();

    sleep(Duration::from_secs(302)).await;

    assert_eq!(state.snapshot().unwrap().run_state, RunState::Idle);
    let reopened = HistoryStore::open(Some(path)).unwrap();
    let entries = reopened.list().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].elapsed_seconds, 300);
    assert_eq!(entries[0].set_seconds, 300);
}
