// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use spanish_ocr::{
    api::{create_app, shutdown_signal, AppState},
    cli::Cli,
    ModelRegistry,
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so its values feed both RUST_LOG and the CLI env fallbacks
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Spanish OCR service...");
    println!("📦 BUILD VERSION: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let config = Cli::parse()
        .into_config()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    println!("⚙️  Configuration:");
    println!("   Default model:        {}", config.default_model_type);
    println!("   Text score threshold: {}", config.text_score_threshold);
    println!("   Max file size:        {}MB", config.max_file_size_mb);
    println!("   PDF render DPI:       {}", config.pdf_render_dpi);
    println!("   Model cache:          {}", config.model_cache_dir.display());
    println!();

    let registry = Arc::new(
        ModelRegistry::from_config(&config).context("Failed to create model downloader")?,
    );

    if config.preload_model {
        println!("🧠 Preloading {} OCR model...", config.default_model_type);
        match registry.get(config.default_model_type).await {
            Ok(_) => println!("✅ {} OCR model ready", config.default_model_type),
            Err(e) => {
                tracing::warn!("⚠️ Model preload failed, will retry on first request: {}", e)
            }
        }
    } else {
        println!("💤 Models load on first request");
    }

    let addr = config.socket_addr().map_err(anyhow::Error::msg)?;
    let app = create_app(AppState::new(config, registry));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    println!("\n✅ Spanish OCR API listening on http://{}", addr);
    println!("   POST /ocr     - extract text from an image or PDF");
    println!("   GET  /health  - liveness check");
    println!("\nPress Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    println!("👋 Spanish OCR service stopped");
    Ok(())
}
