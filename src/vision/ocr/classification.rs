// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text-line orientation classifier
//!
//! Decides whether a cropped line is upside down. Lines classified as
//! rotated by 180° with enough confidence are flipped before recognition.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::detection::build_session;
use super::preprocessing::preprocess_for_classification;

/// Minimum "180" probability before a crop is flipped
pub const ROTATION_THRESHOLD: f32 = 0.9;

/// Orientation of a text line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Upright,
    UpsideDown,
}

/// Pick orientation from the classifier's `[p(0°), p(180°)]` output
pub fn orientation_from_scores(scores: &[f32]) -> (Orientation, f32) {
    let (best, score) = scores
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |acc, (i, s)| if s > acc.1 { (i, s) } else { acc });

    if best == 1 && score >= ROTATION_THRESHOLD {
        (Orientation::UpsideDown, score)
    } else {
        (Orientation::Upright, score.max(0.0))
    }
}

#[derive(Clone)]
pub struct OcrClassificationModel {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for OcrClassificationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrClassificationModel")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrClassificationModel {
    /// Load the classifier from an ONNX file (blocking)
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!(
                "OCR classification model not found: {}",
                model_path.display()
            );
        }

        info!("Loading OCR classification model from {}", model_path.display());

        let session = build_session(model_path).context(format!(
            "Failed to load OCR classification model from {}",
            model_path.display()
        ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    pub fn classify(&self, crop: &DynamicImage) -> Result<(Orientation, f32)> {
        let input = preprocess_for_classification(crop);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Classification session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Classification inference failed")?;

        let scores = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract classification output")?;
        let scores: Vec<f32> = scores.iter().copied().collect();

        Ok(orientation_from_scores(&scores))
    }

    /// Return the crop the right way up
    pub fn orient(&self, crop: DynamicImage) -> Result<DynamicImage> {
        match self.classify(&crop)? {
            (Orientation::UpsideDown, score) => {
                debug!("Flipping upside-down text line (score {:.3})", score);
                Ok(crop.rotate180())
            }
            (Orientation::Upright, _) => Ok(crop),
        }
    }
}
