// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Router construction and server lifecycle

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::health::health_handler;
use super::ocr::ocr_handler;
use crate::config::ServiceConfig;
use crate::vision::{ModelRegistry, OcrInvoker};

/// Room left for multipart framing on top of the file size limit
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub invoker: OcrInvoker,
}

impl AppState {
    pub fn new(config: ServiceConfig, registry: Arc<ModelRegistry>) -> Self {
        let invoker = OcrInvoker::new(registry, config.text_score_threshold);
        Self {
            config: Arc::new(config),
            invoker,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        self.invoker.registry()
    }
}

/// Build the HTTP router
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_file_size_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_handler))
        .route("/ocr", post(ocr_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    info!("🛑 Shutdown signal received, draining connections...");
}
