// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runs OCR on page images with the selected model and applies the score cutoff

use image::DynamicImage;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::model_manager::ModelRegistry;
use super::ocr::RecognizedFragment;
use crate::models::ModelType;

#[derive(Debug, Clone, Error)]
pub enum OcrError {
    #[error("Failed to load {model_type} OCR model: {message}")]
    ModelLoad {
        model_type: ModelType,
        message: String,
    },

    #[error("{0}")]
    Inference(String),
}

/// Keep the text of fragments scoring at least `threshold`, in engine order
pub fn filter_fragments(fragments: Vec<RecognizedFragment>, threshold: f32) -> Vec<String> {
    fragments
        .into_iter()
        .filter(|f| f.confidence >= threshold && !f.text.trim().is_empty())
        .map(|f| f.text)
        .collect()
}

/// Page-level OCR entry point shared by all requests
#[derive(Clone)]
pub struct OcrInvoker {
    registry: Arc<ModelRegistry>,
    text_score_threshold: f32,
}

impl OcrInvoker {
    pub fn new(registry: Arc<ModelRegistry>, text_score_threshold: f32) -> Self {
        Self {
            registry,
            text_score_threshold,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn text_score_threshold(&self) -> f32 {
        self.text_score_threshold
    }

    /// Recognize one page, returning fragment texts that pass the threshold
    pub async fn recognize_page(
        &self,
        page: DynamicImage,
        model_type: ModelType,
    ) -> Result<Vec<String>, OcrError> {
        let engine = self.registry.get(model_type).await?;

        let fragments = tokio::task::spawn_blocking(move || engine.recognize(&page))
            .await
            .map_err(|e| OcrError::Inference(format!("OCR task failed: {}", e)))?
            .map_err(|e| OcrError::Inference(format!("{:#}", e)))?;

        let total = fragments.len();
        let kept = filter_fragments(fragments, self.text_score_threshold);
        debug!(
            "Kept {}/{} fragments at threshold {}",
            kept.len(),
            total,
            self.text_score_threshold
        );

        Ok(kept)
    }
}
