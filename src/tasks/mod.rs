//! Background tasks module
//!
//! This module contains the tick source and the tasks that run alongside the HTTP server.

pub mod completion_notifier;
pub mod interval_ticker;
pub mod tick_driver;

// Re-export main types and functions
pub use completion_notifier::completion_notifier_task;
pub use interval_ticker::{IntervalSubscription, IntervalTickSource, TICK_PERIOD};
pub use tick_driver::tick_driver_task;
