// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PP-OCRv5 pipeline: detection, orientation and recognition

use anyhow::Result;
use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, info};

use super::classification::OcrClassificationModel;
use super::detection::{OcrDetectionModel, TextBox};
use super::preprocessing::crop_text_region;
use super::recognition::OcrRecognitionModel;
use crate::models::ModelPaths;
use crate::vision::model_manager::PageRecognizer;

/// Bounding box for detected text, in page pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<&TextBox> for BoundingBox {
    fn from(b: &TextBox) -> Self {
        Self {
            x: b.x.max(0.0).floor() as u32,
            y: b.y.max(0.0).floor() as u32,
            width: b.width.max(1.0).ceil() as u32,
            height: b.height.max(1.0).ceil() as u32,
        }
    }
}

/// One recognized span of text on a page
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedFragment {
    pub text: String,
    /// Recognition confidence (0.0-1.0)
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// PaddleOCR model for text extraction
///
/// Combines detection, the optional orientation classifier and recognition
/// into a single page-level pipeline. Runs on CPU only.
#[derive(Debug, Clone)]
pub struct PaddleOcrModel {
    detection: OcrDetectionModel,
    classification: Option<OcrClassificationModel>,
    recognition: OcrRecognitionModel,
}

impl PaddleOcrModel {
    /// Load every session of a cached model set
    ///
    /// Blocking: call from `spawn_blocking`.
    pub fn load(paths: &ModelPaths) -> Result<Self> {
        let started = Instant::now();

        let detection = OcrDetectionModel::new(&paths.detection)?;
        let classification = paths
            .classification
            .as_ref()
            .map(OcrClassificationModel::new)
            .transpose()?;
        let recognition = OcrRecognitionModel::new(&paths.recognition, &paths.dictionary)?;

        info!(
            "✅ OCR pipeline ready in {}ms (classifier: {})",
            started.elapsed().as_millis(),
            if classification.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            detection,
            classification,
            recognition,
        })
    }

    /// Run OCR on one page image
    ///
    /// Fragments come back in reading order. Lines that decode to nothing
    /// are dropped; no confidence filtering happens here.
    pub fn process(&self, image: &DynamicImage) -> Result<Vec<RecognizedFragment>> {
        let started = Instant::now();
        let boxes = self.detection.detect(image)?;

        let mut fragments = Vec::with_capacity(boxes.len());
        for text_box in &boxes {
            let bounding_box = BoundingBox::from(text_box);
            let mut crop = crop_text_region(
                image,
                bounding_box.x,
                bounding_box.y,
                bounding_box.width,
                bounding_box.height,
            );

            if let Some(ref classifier) = self.classification {
                crop = classifier.orient(crop)?;
            }

            let recognized = self.recognition.recognize(&crop)?;
            if recognized.is_empty() {
                continue;
            }

            fragments.push(RecognizedFragment {
                text: recognized.text,
                confidence: recognized.confidence,
                bounding_box,
            });
        }

        debug!(
            "OCR page {}x{}: {} boxes, {} fragments in {}ms",
            image.width(),
            image.height(),
            boxes.len(),
            fragments.len(),
            started.elapsed().as_millis()
        );

        Ok(fragments)
    }
}

impl PageRecognizer for PaddleOcrModel {
    fn recognize(&self, page: &DynamicImage) -> Result<Vec<RecognizedFragment>> {
        self.process(page)
    }
}
