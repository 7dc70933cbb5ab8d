//! Run history
//!
//! Recorded runs live here. The timer session knows nothing about this
//! module; the application wires the store in as the session's recorder.

pub mod entry;
pub mod store;

pub use entry::HistoryEntry;
pub use store::HistoryStore;
