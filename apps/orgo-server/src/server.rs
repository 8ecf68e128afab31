//! HTTP server: middleware stack, listener and graceful shutdown

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use axum::http::HeaderName;
use axum::Router;
use school_service::SchoolServiceModule;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Router with every module route plus tracing, request ids and timeouts
pub fn build_router(module: &SchoolServiceModule, cfg: &ServerConfig) -> Result<Router> {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let router = module.register_rest(Router::new())?;

    Ok(router
        .layer(TimeoutLayer::new(cfg.request_timeout))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid)))
}

/// Serve until ctrl-c or SIGTERM, then stop the background job
pub async fn run(module: Arc<SchoolServiceModule>, cfg: &ServerConfig) -> Result<()> {
    let app = build_router(&module, cfg)?;
    let cancel = CancellationToken::new();

    let background = tokio::spawn({
        let module = module.clone();
        let cancel = cancel.child_token();
        async move {
            if let Err(e) = module.serve(cancel).await {
                tracing::error!(error = %e, "school service background task failed");
            }
        }
    });

    let listener = TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind))?;
    tracing::info!(address = %cfg.bind, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cancel.cancel();
    if let Err(e) = background.await {
        tracing::warn!(error = %e, "background task did not finish cleanly");
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
