//! Scorebook API server entry point.

use std::sync::Arc;

use scorebook_api::broadcaster::MatchBroadcaster;
use scorebook_api::config::AppConfig;
use scorebook_api::error::AppError;
use scorebook_api::state::AppState;
use scorebook_api::telemetry;
use scorebook_core::clock::SystemClock;
use scorebook_event_store::storage::Storage;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!(storage = ?config.storage, "Starting Scorebook API server");

    let storage = Storage::open(&config.storage).await?;
    let broadcaster = Arc::new(MatchBroadcaster::new(config.broadcast_capacity));
    let app_state = AppState::new(
        &storage,
        Arc::clone(&broadcaster),
        Arc::new(SystemClock),
        config.scoring,
    );

    // TODO: Replace CorsLayer::permissive() with the scoreboard UI origin once it is deployed.
    let app = scorebook_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Live streams never end on their own.
            broadcaster.close_all();
        })
        .await?;

    tracing::info!("Shutting down");
    storage.close().await;
    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
