//! Tick driver background task

use std::sync::Arc;
use tokio::{sync::mpsc, task};
use tracing::{debug, error, info};

use crate::state::{AppState, Tick, TickOutcome};

/// Feed ticks from the interval source into the timer session
///
/// Ticks are applied in arrival order; ticks from released subscriptions are
/// discarded by the session itself. A tick that finishes the run writes the
/// history file, so each tick is applied on the blocking pool and awaited
/// before the next one is taken. Exits when the tick channel closes.
pub async fn tick_driver_task(state: Arc<AppState>, mut tick_rx: mpsc::UnboundedReceiver<Tick>) {
    info!("Starting tick driver task");

    while let Some(tick) = tick_rx.recv().await {
        let state = Arc::clone(&state);
        match task::spawn_blocking(move || state.tick(tick)).await {
            Ok(Ok(TickOutcome::Finished { record })) => {
                debug!("Run finished on tick (recorded: {})", record.is_some());
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                error!("Failed to deliver tick: {}", e);
            }
            Err(e) => {
                error!("Tick task failed: {}", e);
            }
        }
    }

    info!("Tick channel closed, tick driver exiting");
}
