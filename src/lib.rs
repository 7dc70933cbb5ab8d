//! Countdown Timer - A single-session countdown timer served over HTTP
//!
//! This library provides the timer session state machine (start, pause,
//! resume, stop, reset, duration selection), the tick sources that drive it,
//! and a history store that records each completed or stopped run.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{AppError, HistoryError, RecordError};
pub use history::{HistoryEntry, HistoryStore};
pub use state::{AppState, DurationIndex, RunState, TimerSession};
pub use utils::signals::shutdown_signal;
