//! Countdown Timer - A single-session countdown timer served over HTTP
//!
//! This is the main entry point for the countdown-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use countdown_timer::{
    api::create_router,
    config::Config,
    history::HistoryStore,
    state::AppState,
    tasks::{completion_notifier_task, tick_driver_task, IntervalTickSource, TICK_PERIOD},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("countdown_timer={},tower_http=info", config.log_level()))
        .init();

    let duration = config.duration()?;

    info!("Starting countdown-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, duration={}min, history={}",
        config.host,
        config.port,
        duration.minutes(),
        config
            .history_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "in-memory".to_string())
    );

    let history = HistoryStore::open(config.history_file.clone())?;

    // Create application state; the session owns the tick source
    let (tick_source, tick_rx) = IntervalTickSource::new(TICK_PERIOD);
    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        duration,
        history,
        tick_source,
    ));

    // Start background tasks
    let driver_state = Arc::clone(&state);
    tokio::spawn(async move {
        tick_driver_task(driver_state, tick_rx).await;
    });

    let notifier_state = Arc::clone(&state);
    tokio::spawn(async move {
        completion_notifier_task(notifier_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timer           - Current timer state");
    info!("  POST   /timer/start     - Start or resume");
    info!("  POST   /timer/pause     - Pause");
    info!("  POST   /timer/stop      - Stop and record progress");
    info!("  POST   /timer/reset     - Reset without recording");
    info!("  PUT    /timer/duration  - Select duration slot");
    info!("  GET    /history         - Recorded runs");
    info!("  DELETE /history         - Clear history");
    info!("  GET    /status          - Server status");
    info!("  GET    /health          - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        result = shutdown_signal() => {
            if let Err(e) = result {
                tracing::error!("Signal handler error: {}", e);
            }
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = state.shutdown() {
        tracing::error!("Failed to release timer session: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
