//! Kodi notify API server binary entrypoint.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use kodi_common::config::AppConfig;
use kodi_notifier::Dispatcher;

use kodi_api::routes::create_router;
use kodi_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("kodi_api=info,kodi_notifier=info,tower_http=info")
        }))
        .init();

    tracing::info!("Starting Kodi notify API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Build the dispatcher and start its flush loop
    let dispatcher = Arc::new(Dispatcher::new(config.kodi.clone())?);
    let shutdown = CancellationToken::new();
    let flush_loop = dispatcher.spawn(shutdown.clone());

    // Cancel everything on Ctrl+C
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
        signal_token.cancel();
    });

    // Build router
    let app = create_router(AppState::new(Arc::clone(&dispatcher)))
        .layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!("API server listening on {}", config.api_addr);
    let listener = tokio::net::TcpListener::bind(config.api_addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;

    shutdown.cancel();
    if let Err(e) = flush_loop.await {
        tracing::error!(error = %e, "Flush loop task failed");
    }

    // One last attempt so queued tasks aren't silently lost on a clean stop
    let report = dispatcher.flush_now().await;
    let pending = dispatcher.queue_size();
    if pending > 0 {
        tracing::warn!(
            pending,
            outcome = ?report.outcome,
            "Kodi tasks still pending at shutdown, discarding"
        );
    }

    served?;
    tracing::info!("Kodi notify API server stopped.");
    Ok(())
}
