//! Completion notifier background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::{
    state::{AppState, TimerEvent},
    utils::format::mmss,
};

/// Title used for finished-run notifications
pub const FINISHED_TITLE: &str = "Timer finished";

/// Build the notification body for a finished run
pub fn finished_message(set_seconds: u64) -> String {
    format!("Your {} timer is up", mmss(set_seconds as i64))
}

/// Background task that announces every finished run
pub async fn completion_notifier_task(state: Arc<AppState>) {
    info!("Starting completion notifier task");

    let mut event_rx = state.event_tx.subscribe();

    loop {
        match event_rx.recv().await {
            Ok(TimerEvent::Finished { set_seconds }) => {
                info!("{}: {}", FINISHED_TITLE, finished_message(set_seconds));
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Completion notifier lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => {
                info!("Event channel closed, completion notifier exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_message_uses_mmss() {
        assert_eq!(finished_message(1500), "Your 25:00 timer is up");
    }
}
