//! Countdown timer session
//!
//! [`TimerSession`] owns the run state, the remaining/total seconds and the
//! decision of when a run gets recorded. It is driven from one logical
//! thread: callers serialize commands and ticks (the application keeps the
//! session behind a mutex).
//!
//! A run is recorded at most once. Natural completion records through the
//! guarded path, an explicit stop records through the forced path, and a
//! duration change while paused flushes unrecorded progress through the
//! guarded path before the new duration is applied.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{DurationIndex, RunState, Tick, TickSource};
use crate::{
    error::{AppError, RecordError},
    utils::format::mmss,
};

/// Label of the primary button while idle or running
pub const START_LABEL: &str = "Start";
/// Label of the primary button while paused
pub const RESUME_LABEL: &str = "Resume";

/// Recorder invoked with `(elapsed_seconds, set_seconds)`
pub type RecordCallback = Box<dyn FnMut(u64, u64) -> Result<(), RecordError> + Send>;

/// Why a run was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordReason {
    /// Countdown reached zero
    Finished,
    /// User stopped the run
    Stopped,
    /// Duration was changed while the run was paused
    DurationChanged,
}

/// A run that was handed to the recorder successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub elapsed_seconds: u64,
    pub set_seconds: u64,
    pub reason: RecordReason,
}

/// Result of delivering a tick to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, or the tick came from a released subscription
    Ignored,
    /// One second counted down, run continues
    Counted { remaining_seconds: u64 },
    /// Countdown reached zero and the session is idle again
    Finished { record: Option<RunRecord> },
}

/// Read-only view of the session for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub run_state: RunState,
    pub duration_index: usize,
    pub duration_minutes: u64,
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    pub progress: f64,
    pub time_text: String,
    pub start_label: String,
    pub ticking: bool,
}

/// The single stateful timer entity
pub struct TimerSession<S: TickSource> {
    run_state: RunState,
    total_seconds: u64,
    remaining_seconds: u64,
    duration_index: DurationIndex,
    has_recorded_this_run: bool,
    on_record: Option<RecordCallback>,
    tick_source: S,
    subscription: Option<S::Subscription>,
    epoch: u64,
}

impl<S: TickSource> TimerSession<S> {
    /// Create an idle session with `duration_index` applied
    pub fn new(tick_source: S, duration_index: DurationIndex) -> Self {
        let seconds = duration_index.seconds();
        Self {
            run_state: RunState::Idle,
            total_seconds: seconds,
            remaining_seconds: seconds,
            duration_index,
            has_recorded_this_run: false,
            on_record: None,
            tick_source,
            subscription: None,
            epoch: 0,
        }
    }

    /// Install the recorder callback, replacing any previous one
    pub fn set_on_record<F>(&mut self, callback: F)
    where
        F: FnMut(u64, u64) -> Result<(), RecordError> + Send + 'static,
    {
        self.on_record = Some(Box::new(callback));
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn duration_index(&self) -> DurationIndex {
        self.duration_index
    }

    pub fn has_recorded_this_run(&self) -> bool {
        self.has_recorded_this_run
    }

    /// Whether a tick subscription is currently held
    pub fn is_ticking(&self) -> bool {
        self.subscription.is_some()
    }

    /// Epoch of the most recent subscription; ticks tagged otherwise are dropped
    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    /// Re-apply the selected duration; run state is left alone
    pub fn on_appear(&mut self) {
        self.apply_duration();
        debug!(
            "Applied duration {}min on appear (state={})",
            self.duration_index.minutes(),
            self.run_state
        );
    }

    /// Start a fresh run, or resume a paused one
    ///
    /// Returns `false` when already running.
    pub fn start_or_resume(&mut self) -> bool {
        if self.run_state.is_running() {
            debug!("Start ignored, timer already running");
            return false;
        }

        if self.remaining_seconds == 0 {
            self.apply_duration();
            self.has_recorded_this_run = false;
        }

        let resumed = self.run_state == RunState::Paused;
        self.transition(RunState::Running);
        info!(
            "Timer {} with {}s of {}s remaining",
            if resumed { "resumed" } else { "started" },
            self.remaining_seconds,
            self.total_seconds
        );
        true
    }

    /// Pause a running countdown; no-op otherwise
    pub fn pause(&mut self) -> bool {
        if !self.run_state.is_running() {
            debug!("Pause ignored while {}", self.run_state);
            return false;
        }

        self.transition(RunState::Paused);
        info!("Timer paused with {}s remaining", self.remaining_seconds);
        true
    }

    /// End the run, recording any elapsed progress, and return to idle
    pub fn stop(&mut self) -> Option<RunRecord> {
        let elapsed = self.elapsed_seconds();
        let record = self.record_force(elapsed, RecordReason::Stopped);

        self.transition(RunState::Idle);
        self.remaining_seconds = self.total_seconds;
        self.has_recorded_this_run = false;

        info!("Timer stopped after {}s", elapsed);
        record
    }

    /// Throw the current run away without recording it
    pub fn reset(&mut self) {
        self.transition(RunState::Idle);
        self.remaining_seconds = self.total_seconds;
        self.has_recorded_this_run = false;
        info!("Timer reset to {}s", self.total_seconds);
    }

    /// Select a new duration
    ///
    /// Rejected with [`AppError::DurationLocked`] while running, leaving the
    /// session untouched. Otherwise unrecorded progress of a paused run is
    /// recorded first, then the new duration is applied and the session
    /// returns to idle.
    pub fn duration_index_changed(
        &mut self,
        index: DurationIndex,
    ) -> Result<Option<RunRecord>, AppError> {
        if self.run_state.is_running() {
            debug!("Duration change to slot {} ignored while running", index.get());
            return Err(AppError::DurationLocked);
        }

        let record = self.record_if_needed(self.elapsed_seconds(), RecordReason::DurationChanged);
        self.has_recorded_this_run = false;
        self.duration_index = index;
        self.apply_duration();
        self.transition(RunState::Idle);

        info!("Duration changed to {}min", index.minutes());
        Ok(record)
    }

    /// Count down one second
    pub fn tick(&mut self, tick: Tick) -> TickOutcome {
        if !self.run_state.is_running() {
            debug!("Tick ignored while {}", self.run_state);
            return TickOutcome::Ignored;
        }
        if tick.epoch != self.epoch {
            debug!("Stale tick from epoch {} ignored (current {})", tick.epoch, self.epoch);
            return TickOutcome::Ignored;
        }

        if self.remaining_seconds == 0 {
            return TickOutcome::Finished {
                record: self.finish(),
            };
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            return TickOutcome::Finished {
                record: self.finish(),
            };
        }

        debug!("Tick: {}s remaining", self.remaining_seconds);
        TickOutcome::Counted {
            remaining_seconds: self.remaining_seconds,
        }
    }

    /// Fraction of the run elapsed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        let elapsed = self.elapsed_seconds() as f64;
        (elapsed / self.total_seconds as f64).clamp(0.0, 1.0)
    }

    pub fn time_text(&self) -> String {
        mmss(self.remaining_seconds as i64)
    }

    pub fn start_button_label(&self) -> &'static str {
        if self.run_state == RunState::Paused {
            RESUME_LABEL
        } else {
            START_LABEL
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            run_state: self.run_state,
            duration_index: self.duration_index.get(),
            duration_minutes: self.duration_index.minutes(),
            total_seconds: self.total_seconds,
            remaining_seconds: self.remaining_seconds,
            progress: self.progress(),
            time_text: self.time_text(),
            start_label: self.start_button_label().to_string(),
            ticking: self.is_ticking(),
        }
    }

    fn finish(&mut self) -> Option<RunRecord> {
        let total = self.total_seconds;
        let record = self.record_if_needed(total, RecordReason::Finished);

        self.transition(RunState::Idle);
        self.remaining_seconds = total;
        self.has_recorded_this_run = false;

        info!("Timer finished after {}s", total);
        record
    }

    fn elapsed_seconds(&self) -> u64 {
        self.total_seconds.saturating_sub(self.remaining_seconds)
    }

    fn apply_duration(&mut self) {
        self.total_seconds = self.duration_index.seconds();
        self.remaining_seconds = self.total_seconds;
    }

    fn transition(&mut self, to: RunState) {
        match to {
            RunState::Running => self.attach(),
            RunState::Idle | RunState::Paused => self.detach(),
        }
        self.run_state = to;
    }

    fn attach(&mut self) {
        self.detach();
        self.epoch = self.epoch.wrapping_add(1);
        self.subscription = Some(self.tick_source.attach(self.epoch));
        debug!("Tick subscription attached (epoch {})", self.epoch);
    }

    fn detach(&mut self) {
        if self.subscription.take().is_some() {
            debug!("Tick subscription released (epoch {})", self.epoch);
        }
    }

    /// Guarded: skipped when this run was already recorded
    fn record_if_needed(&mut self, elapsed: u64, reason: RecordReason) -> Option<RunRecord> {
        if elapsed == 0 {
            return None;
        }
        if self.has_recorded_this_run {
            debug!("Run already recorded, skipping {:?} record", reason);
            return None;
        }

        self.has_recorded_this_run = true;
        self.deliver(elapsed, reason)
    }

    /// Unguarded: a user stop always records its progress
    fn record_force(&mut self, elapsed: u64, reason: RecordReason) -> Option<RunRecord> {
        if elapsed == 0 {
            return None;
        }

        self.has_recorded_this_run = true;
        self.deliver(elapsed, reason)
    }

    fn deliver(&mut self, elapsed: u64, reason: RecordReason) -> Option<RunRecord> {
        let set = self.total_seconds;
        let Some(callback) = self.on_record.as_mut() else {
            debug!("No recorder installed, dropping {}s/{}s record", elapsed, set);
            return None;
        };

        match callback(elapsed, set) {
            Ok(()) => {
                info!("Recorded run: {}s of {}s ({:?})", elapsed, set, reason);
                Some(RunRecord {
                    elapsed_seconds: elapsed,
                    set_seconds: set,
                    reason,
                })
            }
            Err(e) => {
                warn!("Recorder failed, run not recorded: {}", e);
                None
            }
        }
    }
}

impl<S: TickSource> std::fmt::Debug for TimerSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerSession")
            .field("run_state", &self.run_state)
            .field("total_seconds", &self.total_seconds)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("duration_index", &self.duration_index)
            .field("has_recorded_this_run", &self.has_recorded_this_run)
            .field("ticking", &self.is_ticking())
            .field("epoch", &self.epoch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::state::ManualTickSource;

    type Records = Arc<Mutex<Vec<(u64, u64)>>>;

    fn index(i: usize) -> DurationIndex {
        DurationIndex::new(i).unwrap()
    }

    fn session_with_recorder(i: usize) -> (TimerSession<ManualTickSource>, ManualTickSource, Records) {
        let source = ManualTickSource::new();
        let mut session = TimerSession::new(source.clone(), index(i));
        let records: Records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        session.set_on_record(move |elapsed, set| {
            sink.lock().unwrap().push((elapsed, set));
            Ok(())
        });
        session.on_appear();
        (session, source, records)
    }

    fn tick_n(session: &mut TimerSession<ManualTickSource>, n: usize) -> TickOutcome {
        let mut last = TickOutcome::Ignored;
        for _ in 0..n {
            let epoch = session.current_epoch();
            last = session.tick(Tick { epoch });
        }
        last
    }

    fn assert_bounds(session: &TimerSession<ManualTickSource>) {
        assert!(session.remaining_seconds() <= session.total_seconds());
        assert_eq!(session.is_ticking(), session.run_state() == RunState::Running);
    }

    #[test]
    fn test_on_appear_applies_every_duration() {
        for i in 0..=11 {
            let (mut session, _, _) = session_with_recorder(0);
            session.duration_index_changed(index(i)).unwrap();
            session.on_appear();
            let expected = (i as u64 + 1) * 300;
            assert_eq!(session.total_seconds(), expected);
            assert_eq!(session.remaining_seconds(), expected);
        }
    }

    #[test]
    fn test_new_session_is_idle_and_not_ticking() {
        let (session, source, records) = session_with_recorder(0);
        assert_eq!(session.run_state(), RunState::Idle);
        assert!(!session.is_ticking());
        assert_eq!(source.active_subscriptions(), 0);
        assert!(records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bounds_hold_across_command_sequence() {
        let (mut session, _, _) = session_with_recorder(0);
        assert_bounds(&session);
        session.start_or_resume();
        assert_bounds(&session);
        tick_n(&mut session, 7);
        assert_bounds(&session);
        session.pause();
        assert_bounds(&session);
        tick_n(&mut session, 3);
        assert_bounds(&session);
        session.start_or_resume();
        tick_n(&mut session, 400);
        assert_bounds(&session);
        session.start_or_resume();
        session.stop();
        assert_bounds(&session);
        session.reset();
        assert_bounds(&session);
    }

    #[test]
    fn test_pause_twice_is_noop() {
        let (mut session, source, _) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 2);
        assert!(session.pause());
        let before = session.snapshot();
        assert!(!session.pause());
        assert_eq!(session.snapshot(), before);
        assert_eq!(source.active_subscriptions(), 0);
    }

    #[test]
    fn test_pause_while_idle_is_noop() {
        let (mut session, _, _) = session_with_recorder(0);
        assert!(!session.pause());
        assert_eq!(session.run_state(), RunState::Idle);
    }

    #[test]
    fn test_stop_one_second_before_end_records_once() {
        let (mut session, _, records) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 299);
        assert_eq!(session.remaining_seconds(), 1);

        let record = session.stop();

        assert_eq!(*records.lock().unwrap(), vec![(299, 300)]);
        assert_eq!(
            record,
            Some(RunRecord {
                elapsed_seconds: 299,
                set_seconds: 300,
                reason: RecordReason::Stopped,
            })
        );
        assert_eq!(session.run_state(), RunState::Idle);
        assert_eq!(session.remaining_seconds(), 300);
        assert!(!session.has_recorded_this_run());
    }

    #[test]
    fn test_full_completion_records_full_duration() {
        let (mut session, source, records) = session_with_recorder(0);
        session.start_or_resume();

        let outcome = tick_n(&mut session, 300);

        assert!(matches!(
            outcome,
            TickOutcome::Finished {
                record: Some(RunRecord {
                    elapsed_seconds: 300,
                    set_seconds: 300,
                    reason: RecordReason::Finished,
                })
            }
        ));
        assert_eq!(*records.lock().unwrap(), vec![(300, 300)]);
        assert_eq!(session.run_state(), RunState::Idle);
        assert_eq!(session.remaining_seconds(), 300);
        assert_eq!(session.total_seconds(), 300);
        assert_eq!(source.active_subscriptions(), 0);
    }

    #[test]
    fn test_ticks_after_completion_are_ignored() {
        let (mut session, _, records) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 300);
        assert_eq!(tick_n(&mut session, 5), TickOutcome::Ignored);
        assert_eq!(records.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_after_completion_does_not_record_again() {
        let (mut session, _, records) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 300);
        assert_eq!(session.stop(), None);
        assert_eq!(records.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_while_paused_records_progress() {
        let (mut session, source, records) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 10);
        session.pause();

        let record = session.stop();

        assert_eq!(*records.lock().unwrap(), vec![(10, 300)]);
        assert_eq!(record.map(|r| r.reason), Some(RecordReason::Stopped));
        assert_eq!(session.run_state(), RunState::Idle);
        assert_eq!(session.remaining_seconds(), 300);
        assert_eq!(source.active_subscriptions(), 0);
        assert!(!session.has_recorded_this_run());
    }

    #[test]
    fn test_stop_without_ticks_records_nothing() {
        let (mut session, _, records) = session_with_recorder(0);
        session.start_or_resume();
        assert_eq!(session.stop(), None);
        assert!(records.lock().unwrap().is_empty());
        assert_eq!(session.run_state(), RunState::Idle);
    }

    #[test]
    fn test_resume_preserves_progress() {
        let (mut session, _, _) = session_with_recorder(1);
        assert_eq!(session.total_seconds(), 600);
        session.start_or_resume();
        tick_n(&mut session, 4);
        session.pause();
        assert_eq!(session.remaining_seconds(), 596);
        assert_eq!(session.start_button_label(), RESUME_LABEL);

        assert!(session.start_or_resume());

        assert_eq!(session.remaining_seconds(), 596);
        assert_eq!(session.total_seconds(), 600);
        assert_eq!(session.run_state(), RunState::Running);
        assert_eq!(session.start_button_label(), START_LABEL);
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let (mut session, source, _) = session_with_recorder(0);
        session.start_or_resume();
        let epoch = session.current_epoch();
        assert!(!session.start_or_resume());
        assert_eq!(session.current_epoch(), epoch);
        assert_eq!(source.total_attaches(), 1);
    }

    #[test]
    fn test_duration_change_while_paused_flushes_progress() {
        let (mut session, _, records) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 10);
        session.pause();

        let record = session.duration_index_changed(index(2)).unwrap();

        assert_eq!(*records.lock().unwrap(), vec![(10, 300)]);
        assert_eq!(record.map(|r| r.reason), Some(RecordReason::DurationChanged));
        assert_eq!(session.total_seconds(), 900);
        assert_eq!(session.remaining_seconds(), 900);
        assert_eq!(session.run_state(), RunState::Idle);
        assert!(!session.has_recorded_this_run());
    }

    #[test]
    fn test_duration_change_while_idle_records_nothing() {
        let (mut session, _, records) = session_with_recorder(0);
        assert_eq!(session.duration_index_changed(index(5)).unwrap(), None);
        assert!(records.lock().unwrap().is_empty());
        assert_eq!(session.total_seconds(), 1800);
    }

    #[test]
    fn test_duration_change_while_running_is_rejected() {
        let (mut session, _, records) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 3);
        let before = session.snapshot();

        let result = session.duration_index_changed(index(4));

        assert!(matches!(result, Err(AppError::DurationLocked)));
        assert_eq!(session.snapshot(), before);
        assert!(records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reset_discards_progress_without_recording() {
        let (mut session, source, records) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 42);
        session.reset();
        assert!(records.lock().unwrap().is_empty());
        assert_eq!(session.remaining_seconds(), 300);
        assert_eq!(session.run_state(), RunState::Idle);
        assert_eq!(source.active_subscriptions(), 0);
    }

    #[test]
    fn test_subscription_follows_running_state() {
        let (mut session, source, _) = session_with_recorder(0);
        session.start_or_resume();
        assert_eq!(source.active_subscriptions(), 1);
        session.pause();
        assert_eq!(source.active_subscriptions(), 0);
        session.start_or_resume();
        assert_eq!(source.active_subscriptions(), 1);
        session.stop();
        assert_eq!(source.active_subscriptions(), 0);
        assert_eq!(source.total_attaches(), 2);
    }

    #[test]
    fn test_dropping_session_releases_subscription() {
        let (mut session, source, _) = session_with_recorder(0);
        session.start_or_resume();
        assert_eq!(source.active_subscriptions(), 1);
        drop(session);
        assert_eq!(source.active_subscriptions(), 0);
    }

    #[test]
    fn test_tick_from_released_subscription_is_ignored() {
        let (mut session, _, _) = session_with_recorder(0);
        session.start_or_resume();
        let stale = session.current_epoch();
        session.pause();
        session.start_or_resume();

        assert_eq!(session.tick(Tick { epoch: stale }), TickOutcome::Ignored);
        assert_eq!(session.remaining_seconds(), 300);

        let fresh = session.current_epoch();
        assert_eq!(
            session.tick(Tick { epoch: fresh }),
            TickOutcome::Counted {
                remaining_seconds: 299
            }
        );
    }

    #[test]
    fn test_tick_while_paused_is_ignored() {
        let (mut session, _, _) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 1);
        session.pause();
        assert_eq!(tick_n(&mut session, 1), TickOutcome::Ignored);
        assert_eq!(session.remaining_seconds(), 299);
    }

    #[test]
    fn test_failing_recorder_still_returns_to_idle() {
        let source = ManualTickSource::new();
        let mut session = TimerSession::new(source.clone(), index(0));
        session.set_on_record(|_, _| Err(RecordError("disk full".to_string())));
        session.start_or_resume();
        tick_n(&mut session, 300);

        assert_eq!(session.run_state(), RunState::Idle);
        assert_eq!(session.remaining_seconds(), 300);
        assert_eq!(source.active_subscriptions(), 0);
    }

    #[test]
    fn test_missing_recorder_still_stops() {
        let mut session = TimerSession::new(ManualTickSource::new(), index(0));
        session.start_or_resume();
        let epoch = session.current_epoch();
        session.tick(Tick { epoch });
        assert_eq!(session.stop(), None);
        assert_eq!(session.run_state(), RunState::Idle);
        assert_eq!(session.remaining_seconds(), 300);
    }

    #[test]
    fn test_next_run_records_independently() {
        let (mut session, _, records) = session_with_recorder(0);
        session.start_or_resume();
        tick_n(&mut session, 300);
        session.start_or_resume();
        tick_n(&mut session, 20);
        session.stop();
        assert_eq!(*records.lock().unwrap(), vec![(300, 300), (20, 300)]);
    }

    #[test]
    fn test_derived_values() {
        let (mut session, _, _) = session_with_recorder(0);
        assert_eq!(session.progress(), 0.0);
        assert_eq!(session.time_text(), "05:00");
        assert_eq!(session.start_button_label(), START_LABEL);

        session.start_or_resume();
        tick_n(&mut session, 75);

        assert!((session.progress() - 0.25).abs() < f64::EPSILON);
        assert_eq!(session.time_text(), "03:45");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.run_state, RunState::Running);
        assert_eq!(snapshot.duration_minutes, 5);
        assert!(snapshot.ticking);
    }

    #[test]
    fn test_progress_never_decreases_while_running() {
        let (mut session, _, _) = session_with_recorder(0);
        session.start_or_resume();
        let mut last = session.progress();
        for _ in 0..299 {
            tick_n(&mut session, 1);
            let now = session.progress();
            assert!(now >= last);
            assert!(now <= 1.0);
            last = now;
        }
    }
}
