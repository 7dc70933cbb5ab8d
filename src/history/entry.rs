//! History entry structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format::mmss;

/// One recorded run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    /// Seconds that actually counted down
    pub elapsed_seconds: u64,
    /// Configured length of the run
    pub set_seconds: u64,
}

impl HistoryEntry {
    pub fn set_text(&self) -> String {
        mmss(self.set_seconds as i64)
    }

    pub fn elapsed_text(&self) -> String {
        mmss(self.elapsed_seconds as i64)
    }

    /// Whether the run was counted down to zero
    pub fn completed(&self) -> bool {
        self.elapsed_seconds >= self.set_seconds
    }
}
