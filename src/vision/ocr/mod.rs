// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR integration for text extraction from page images
//!
//! CPU-only OCR using PP-OCRv5 ONNX models.
//!
//! Components:
//! - `detection` - Text region detection (DB)
//! - `classification` - Text line orientation (0° / 180°)
//! - `recognition` - CTC text recognition from detected regions
//! - `preprocessing` - Image preprocessing for the models
//! - `model` - Combined OCR pipeline

pub mod classification;
pub mod detection;
pub mod model;
pub mod preprocessing;
pub mod recognition;

pub use classification::{OcrClassificationModel, Orientation};
pub use detection::{OcrDetectionModel, TextBox};
pub use model::{BoundingBox, PaddleOcrModel, RecognizedFragment};
pub use recognition::{CharacterDictionary, OcrRecognitionModel, RecognizedText};
