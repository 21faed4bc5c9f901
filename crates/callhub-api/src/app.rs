//! Application builder: wires router, middleware and state into an Axum app
//! and runs it.

use std::time::Duration;

use axum::Router;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use callhub_core::error::AppError;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serves the application on the configured address until `shutdown`
/// resolves, then tears down every connection and waits up to
/// `server.shutdown_grace_seconds` for in-flight requests.
pub async fn run_server(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let config = state.config.clone();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(
        "CallHub listening on {} (WebSocket path {})",
        addr,
        config.server.ws_path
    );

    state.realtime.spawn_background();

    // Open sockets keep graceful shutdown waiting, so the engine closes them
    // as soon as the signal fires.
    let realtime = state.realtime.clone();
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let app = build_app(state);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown.await;
        tracing::info!("Shutdown signal received, closing connections...");
        let _ = signalled_tx.send(());
        if let Err(e) = realtime.shutdown().await {
            tracing::error!("Realtime shutdown failed: {}", e);
        }
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => return server_result(joined),
        _ = signalled_rx => {}
    }

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => server_result(joined)?,
        Err(_) => {
            tracing::warn!("Graceful shutdown exceeded {}s, aborting", grace.as_secs());
            server.abort();
        }
    }

    tracing::info!("CallHub server shut down gracefully");
    Ok(())
}

fn server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(result) => result.map_err(|e| AppError::internal(format!("Server error: {}", e))),
        Err(e) => Err(AppError::internal(format!("Server task failed: {}", e))),
    }
}
