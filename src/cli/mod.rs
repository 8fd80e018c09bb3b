// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Command-line arguments for the OCR server
//!
//! Every flag falls back to the environment variable of the same name, so the
//! service can be configured purely through the environment (or a `.env` file).

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ServiceConfig, DEFAULT_MODEL_BASE_URL};
use crate::models::ModelType;

/// Spanish OCR API
#[derive(Parser, Debug, Clone)]
#[command(name = "spanish-ocr")]
#[command(version)]
#[command(about = "OCR service for Spanish text using PP-OCRv5 models", long_about = None)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Default model when a request omits `model_type` (mobile/server)
    #[arg(long, env = "MODEL_TYPE", default_value = "mobile")]
    pub model_type: ModelType,

    /// Minimum confidence for a recognized fragment to be kept
    #[arg(long, env = "TEXT_SCORE_THRESHOLD", default_value_t = 0.5)]
    pub text_score_threshold: f32,

    /// Maximum upload size in megabytes
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value_t = 10)]
    pub max_file_size_mb: usize,

    /// Directory where downloaded models are cached
    #[arg(long, env = "MODEL_CACHE_DIR", default_value = "./models")]
    pub model_cache_dir: PathBuf,

    /// Root URL model artifacts are downloaded from
    #[arg(long, env = "MODEL_BASE_URL", default_value = DEFAULT_MODEL_BASE_URL)]
    pub model_base_url: String,

    /// Resolution used when rasterizing PDF pages
    #[arg(long, env = "PDF_RENDER_DPI", default_value_t = 200)]
    pub pdf_render_dpi: u32,

    /// Load the default model during startup
    #[arg(long, env = "PRELOAD_MODEL", default_value_t = false)]
    pub preload_model: bool,
}

impl Cli {
    /// Convert parsed arguments into a validated service configuration
    pub fn into_config(self) -> Result<ServiceConfig, String> {
        let config = ServiceConfig {
            host: self.host,
            port: self.port,
            default_model_type: self.model_type,
            text_score_threshold: self.text_score_threshold,
            max_file_size_mb: self.max_file_size_mb,
            model_cache_dir: self.model_cache_dir,
            model_base_url: self.model_base_url,
            pdf_render_dpi: self.pdf_render_dpi,
            preload_model: self.preload_model,
        };
        config.validate()?;
        Ok(config)
    }
}
