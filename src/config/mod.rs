// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::models::ModelType;

/// Default mirror for PP-OCR ONNX artifacts
pub const DEFAULT_MODEL_BASE_URL: &str =
    "https://www.modelscope.cn/models/RapidAI/RapidOCR/resolve/v3.4.0";

/// Runtime configuration for the OCR service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bind address
    pub host: String,
    /// Listening port
    pub port: u16,
    /// Model used when a request omits `model_type`
    pub default_model_type: ModelType,
    /// Fragments below this confidence are discarded (0.0-1.0)
    pub text_score_threshold: f32,
    /// Upload size ceiling in megabytes
    pub max_file_size_mb: usize,
    /// Directory holding downloaded model artifacts
    pub model_cache_dir: PathBuf,
    /// Root URL model artifacts are downloaded from
    pub model_base_url: String,
    /// Rasterization resolution for PDF pages
    pub pdf_render_dpi: u32,
    /// Load the default model at startup instead of on first request
    pub preload_model: bool,
}

impl ServiceConfig {
    /// Upload size ceiling in bytes
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.text_score_threshold) {
            return Err(format!(
                "TEXT_SCORE_THRESHOLD must be between 0.0 and 1.0, got {}",
                self.text_score_threshold
            ));
        }
        if self.max_file_size_mb == 0 {
            return Err("MAX_FILE_SIZE_MB must be greater than 0".to_string());
        }
        if self.pdf_render_dpi == 0 {
            return Err("PDF_RENDER_DPI must be greater than 0".to_string());
        }
        if self.model_base_url.trim().is_empty() {
            return Err("MODEL_BASE_URL must not be empty".to_string());
        }
        self.socket_addr()?;
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            default_model_type: ModelType::Mobile,
            text_score_threshold: 0.5,
            max_file_size_mb: 10,
            model_cache_dir: PathBuf::from("./models"),
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            pdf_render_dpi: 200,
            preload_model: false,
        }
    }
}
