//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::{
    DurationIndex, RunRecord, RunState, SessionSnapshot, Tick, TickOutcome, TimerSession,
};
use crate::{
    error::AppError,
    history::HistoryStore,
    tasks::IntervalTickSource,
    utils::format::uptime,
};

/// Session type served by the application
pub type AppSession = TimerSession<IntervalTickSource>;

/// Notifications published after session changes
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    Started {
        resumed: bool,
        remaining_seconds: u64,
        total_seconds: u64,
    },
    Paused {
        remaining_seconds: u64,
    },
    Stopped,
    Reset,
    DurationChanged {
        minutes: u64,
    },
    Finished {
        set_seconds: u64,
    },
    Recorded(RunRecord),
}

/// Main application state that owns the timer session and its history
pub struct AppState {
    /// The single timer session
    pub session: Arc<Mutex<AppSession>>,
    /// Recorded runs
    pub history: Arc<HistoryStore>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel for session events
    pub event_tx: broadcast::Sender<TimerEvent>,
    /// Channel for snapshot updates
    pub snapshot_tx: watch::Sender<SessionSnapshot>,
    /// Keep the receiver alive to prevent channel closure
    pub _snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl AppState {
    /// Create the state, wiring the history store in as the session's recorder
    pub fn new(
        port: u16,
        host: String,
        duration_index: DurationIndex,
        history: HistoryStore,
        tick_source: IntervalTickSource,
    ) -> Self {
        let history = Arc::new(history);

        let mut session = TimerSession::new(tick_source, duration_index);
        let recorder = Arc::clone(&history);
        session.set_on_record(move |elapsed, set| {
            recorder.insert(elapsed, set)?;
            Ok(())
        });
        session.on_appear();

        let (event_tx, _) = broadcast::channel(100);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        Self {
            session: Arc::new(Mutex::new(session)),
            history,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            event_tx,
            snapshot_tx,
            _snapshot_rx: snapshot_rx,
        }
    }

    /// Apply `f` to the locked session and publish the resulting snapshot
    pub fn with_session<T, F>(&self, f: F) -> Result<(T, SessionSnapshot), AppError>
    where
        F: FnOnce(&mut AppSession) -> T,
    {
        let mut session = self
            .session
            .lock()
            .map_err(|e| AppError::poisoned("timer session", e))?;

        let output = f(&mut *session);
        let snapshot = session.snapshot();
        drop(session); // Release the lock early

        if let Err(e) = self.snapshot_tx.send(snapshot.clone()) {
            warn!("Failed to send snapshot update: {}", e);
        }

        Ok((output, snapshot))
    }

    /// Re-apply the selected duration
    pub fn appear(&self) -> Result<SessionSnapshot, AppError> {
        let ((), snapshot) = self.with_session(|s| s.on_appear())?;
        self.note_action("appear");
        Ok(snapshot)
    }

    /// Start or resume the countdown
    pub fn start_or_resume(&self) -> Result<SessionSnapshot, AppError> {
        let ((started, resumed), snapshot) = self.with_session(|s| {
            let resumed = s.run_state() == RunState::Paused;
            (s.start_or_resume(), resumed)
        })?;

        if started {
            self.note_action(if resumed { "resume" } else { "start" });
            self.publish(TimerEvent::Started {
                resumed,
                remaining_seconds: snapshot.remaining_seconds,
                total_seconds: snapshot.total_seconds,
            });
        }
        Ok(snapshot)
    }

    /// Pause the countdown
    pub fn pause(&self) -> Result<SessionSnapshot, AppError> {
        let (paused, snapshot) = self.with_session(|s| s.pause())?;

        if paused {
            self.note_action("pause");
            self.publish(TimerEvent::Paused {
                remaining_seconds: snapshot.remaining_seconds,
            });
        }
        Ok(snapshot)
    }

    /// Stop the run, recording elapsed progress
    pub fn stop(&self) -> Result<(Option<RunRecord>, SessionSnapshot), AppError> {
        let (record, snapshot) = self.with_session(|s| s.stop())?;

        self.note_action("stop");
        if let Some(record) = record {
            self.publish(TimerEvent::Recorded(record));
        }
        self.publish(TimerEvent::Stopped);
        Ok((record, snapshot))
    }

    /// Discard the run without recording it
    pub fn reset(&self) -> Result<SessionSnapshot, AppError> {
        let ((), snapshot) = self.with_session(|s| s.reset())?;

        self.note_action("reset");
        self.publish(TimerEvent::Reset);
        Ok(snapshot)
    }

    /// Select a new duration; rejected while running
    pub fn change_duration(
        &self,
        index: DurationIndex,
    ) -> Result<(Option<RunRecord>, SessionSnapshot), AppError> {
        let (result, snapshot) = self.with_session(|s| s.duration_index_changed(index))?;
        let record = result?;

        self.note_action("duration");
        if let Some(record) = record {
            self.publish(TimerEvent::Recorded(record));
        }
        self.publish(TimerEvent::DurationChanged {
            minutes: index.minutes(),
        });
        Ok((record, snapshot))
    }

    /// Deliver one tick to the session
    pub fn tick(&self, tick: Tick) -> Result<TickOutcome, AppError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| AppError::poisoned("timer session", e))?;

        let outcome = session.tick(tick);
        if outcome == TickOutcome::Ignored {
            return Ok(outcome);
        }
        let snapshot = session.snapshot();
        drop(session);

        if let Err(e) = self.snapshot_tx.send(snapshot.clone()) {
            warn!("Failed to send snapshot update: {}", e);
        }

        if let TickOutcome::Finished { record } = outcome {
            if let Some(record) = record {
                self.publish(TimerEvent::Recorded(record));
            }
            self.publish(TimerEvent::Finished {
                set_seconds: snapshot.total_seconds,
            });
        }
        Ok(outcome)
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> Result<SessionSnapshot, AppError> {
        self.session
            .lock()
            .map(|session| session.snapshot())
            .map_err(|e| AppError::poisoned("timer session", e))
    }

    /// Release the tick subscription before the server goes away
    ///
    /// A running countdown is paused; its progress is not recorded.
    pub fn shutdown(&self) -> Result<(), AppError> {
        let (paused, _) = self.with_session(|s| s.pause())?;
        if paused {
            info!("Paused running timer for shutdown");
        }
        Ok(())
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        uptime(self.start_time.elapsed())
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    fn note_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    fn publish(&self, event: TimerEvent) {
        // No subscribers is not an error
        let _ = self.event_tx.send(event);
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session", &self.session)
            .field("history", &self.history)
            .field("port", &self.port)
            .field("host", &self.host)
            .finish()
    }
}
