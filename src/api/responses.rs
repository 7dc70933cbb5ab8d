//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    history::HistoryEntry,
    state::{RunRecord, SessionSnapshot},
};

/// API response structure for timer command endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: SessionSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded: Option<RunRecord>,
}

impl ApiResponse {
    /// Create a new API response, with the run state as status
    pub fn new(message: String, timer: SessionSnapshot) -> Self {
        Self {
            status: timer.run_state.to_string(),
            message,
            timestamp: Utc::now(),
            timer,
            recorded: None,
        }
    }

    /// Attach the run recorded by this command, if any
    pub fn with_record(mut self, recorded: Option<RunRecord>) -> Self {
        self.recorded = recorded;
        self
    }
}

/// Body of `PUT /timer/duration`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationRequest {
    pub index: usize,
}

/// Body of `POST /history/delete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteIndicesRequest {
    pub indices: Vec<usize>,
}

/// History entry as presented to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub set_seconds: u64,
    pub elapsed_text: String,
    pub set_text: String,
    pub completed: bool,
}

impl From<HistoryEntry> for HistoryItem {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            elapsed_text: entry.elapsed_text(),
            set_text: entry.set_text(),
            completed: entry.completed(),
            id: entry.id,
            created_at: entry.created_at,
            elapsed_seconds: entry.elapsed_seconds,
            set_seconds: entry.set_seconds,
        }
    }
}

/// History listing, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub entries: Vec<HistoryItem>,
}

impl HistoryResponse {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self {
            count: entries.len(),
            entries: entries.into_iter().map(HistoryItem::from).collect(),
        }
    }
}

/// Result of a history deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: usize,
    pub remaining: usize,
}

/// Status response with timer and server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: SessionSnapshot,
    pub history_count: usize,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
