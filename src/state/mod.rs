//! State management module
//!
//! This module contains the timer session state machine and the shared
//! application state built around it.

pub mod app_state;
pub mod duration;
pub mod run_state;
pub mod tick_source;
pub mod timer_session;

// Re-export main types
pub use app_state::{AppSession, AppState, TimerEvent};
pub use duration::{DurationIndex, MAX_DURATION_INDEX};
pub use run_state::RunState;
pub use tick_source::{ManualSubscription, ManualTickSource, Tick, TickSource};
pub use timer_session::{
    RecordCallback, RecordReason, RunRecord, SessionSnapshot, TickOutcome, TimerSession,
    RESUME_LABEL, START_LABEL,
};
