//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tokio::task;
use tracing::{error, info, warn};

use crate::{
    error::{AppError, HistoryError},
    state::{AppState, DurationIndex},
};
use super::responses::{
    ApiResponse, DeleteIndicesRequest, DeleteResponse, DurationRequest, HealthResponse,
    HistoryResponse, StatusResponse,
};

/// Map an application error onto an HTTP status
pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::InvalidDurationIndex(_) => StatusCode::BAD_REQUEST,
        AppError::DurationLocked => StatusCode::CONFLICT,
        AppError::History(e) => history_status(e),
        AppError::LockPoisoned { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn history_status(err: &HistoryError) -> StatusCode {
    match err {
        HistoryError::NotFound(_) => StatusCode::NOT_FOUND,
        HistoryError::IndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
        HistoryError::Io { .. } | HistoryError::Serde { .. } | HistoryError::LockPoisoned(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn reject(context: &str, err: AppError) -> StatusCode {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("{}: {}", context, err);
    } else {
        warn!("{}: {}", context, err);
    }
    status
}

/// Run a session command that may write the history file off the async workers
async fn blocking<T, F>(context: &'static str, f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| reject(context, e)),
        Err(e) => {
            error!("{}: {}", context, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /timer - Current timer snapshot
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let snapshot = state
        .snapshot()
        .map_err(|e| reject("Failed to read timer", e))?;
    Ok(Json(ApiResponse::new(snapshot.time_text.clone(), snapshot)))
}

/// Handle POST /timer/start - Start or resume the countdown
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let snapshot = state
        .start_or_resume()
        .map_err(|e| reject("Failed to start timer", e))?;
    info!("Start endpoint called - {}s remaining", snapshot.remaining_seconds);
    Ok(Json(ApiResponse::new("Timer running".to_string(), snapshot)))
}

/// Handle POST /timer/pause - Pause the countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let snapshot = state
        .pause()
        .map_err(|e| reject("Failed to pause timer", e))?;
    info!("Pause endpoint called - state {}", snapshot.run_state);
    Ok(Json(ApiResponse::new("Timer paused".to_string(), snapshot)))
}

/// Handle POST /timer/stop - Stop and record progress
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let (record, snapshot) = blocking("Failed to stop timer", move || state.stop()).await?;
    info!("Stop endpoint called - recorded: {}", record.is_some());
    let message = match record {
        Some(r) => format!("Timer stopped, recorded {}s", r.elapsed_seconds),
        None => "Timer stopped, nothing to record".to_string(),
    };
    Ok(Json(ApiResponse::new(message, snapshot).with_record(record)))
}

/// Handle POST /timer/reset - Discard progress
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let snapshot = state
        .reset()
        .map_err(|e| reject("Failed to reset timer", e))?;
    info!("Reset endpoint called");
    Ok(Json(ApiResponse::new("Timer reset".to_string(), snapshot)))
}

/// Handle POST /timer/appear - Re-apply the selected duration
pub async fn appear_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let snapshot = state
        .appear()
        .map_err(|e| reject("Failed to apply duration", e))?;
    Ok(Json(ApiResponse::new("Duration applied".to_string(), snapshot)))
}

/// Handle PUT /timer/duration - Select a new duration slot
pub async fn duration_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let index = DurationIndex::new(request.index)
        .map_err(|e| reject("Rejected duration change", e))?;
    let (record, snapshot) =
        blocking("Rejected duration change", move || state.change_duration(index)).await?;
    info!("Duration endpoint called - {}min", snapshot.duration_minutes);
    Ok(Json(
        ApiResponse::new(format!("Duration set to {} minutes", snapshot.duration_minutes), snapshot)
            .with_record(record),
    ))
}

/// Handle GET /history - Recorded runs, newest first
pub async fn history_handler(State(state): State<Arc<AppState>>) -> Result<Json<HistoryResponse>, StatusCode> {
    let entries = state
        .history
        .list()
        .map_err(|e| reject("Failed to list history", e.into()))?;
    Ok(Json(HistoryResponse::new(entries)))
}

/// Handle DELETE /history/:id - Delete one entry
pub async fn delete_history_entry_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<DeleteResponse>, StatusCode> {
    state
        .history
        .delete(id)
        .map_err(|e| reject("Failed to delete history entry", e.into()))?;
    remaining(&state, 1)
}

/// Handle POST /history/delete - Delete entries by list position
pub async fn delete_history_indices_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeleteIndicesRequest>,
) -> Result<Json<DeleteResponse>, StatusCode> {
    let removed = state
        .history
        .delete_indices(&request.indices)
        .map_err(|e| reject("Failed to delete history entries", e.into()))?;
    remaining(&state, removed.len())
}

/// Handle DELETE /history - Delete everything
pub async fn clear_history_handler(State(state): State<Arc<AppState>>) -> Result<Json<DeleteResponse>, StatusCode> {
    let deleted = state
        .history
        .clear()
        .map_err(|e| reject("Failed to clear history", e.into()))?;
    info!("History cleared - {} entries removed", deleted);
    remaining(&state, deleted)
}

fn remaining(state: &AppState, deleted: usize) -> Result<Json<DeleteResponse>, StatusCode> {
    let remaining = state
        .history
        .len()
        .map_err(|e| reject("Failed to count history", e.into()))?;
    Ok(Json(DeleteResponse { deleted, remaining }))
}

/// Handle GET /status - Return current timer and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let timer = state
        .snapshot()
        .map_err(|e| reject("Failed to get timer state", e))?;
    let history_count = state
        .history
        .len()
        .map_err(|e| reject("Failed to count history", e.into()))?;

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer,
        history_count,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
