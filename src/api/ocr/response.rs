// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR response types

use serde::{Deserialize, Serialize};

use crate::models::ModelType;

/// Response from OCR processing
///
/// The same three fields are returned for every model type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrResponse {
    /// Extracted text: one line per fragment, pages separated by a blank line
    pub text: String,
    /// Model configuration that produced the text
    pub model_type: ModelType,
    /// Declared filename of the upload, `null` when none was sent
    pub file_name: Option<String>,
}

impl OcrResponse {
    pub fn new(text: String, model_type: ModelType, file_name: Option<String>) -> Self {
        Self {
            text,
            model_type,
            file_name,
        }
    }
}
