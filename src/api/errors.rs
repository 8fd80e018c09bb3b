// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

use crate::vision::{OcrError, PageError};

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    PayloadTooLarge { max_mb: usize },
    UnsupportedMediaType(String),
    UnreadableDocument(String),
    InferenceError(String),
    ModelLoadError(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) | ApiError::UnreadableDocument(_) => 400,
            ApiError::PayloadTooLarge { .. } => 413,
            ApiError::UnsupportedMediaType(_) => 415,
            ApiError::InferenceError(_) | ApiError::InternalError(_) => 500,
            ApiError::ModelLoadError(_) => 503,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::PayloadTooLarge { max_mb } => {
                write!(f, "File too large. Maximum size is {}MB", max_mb)
            }
            ApiError::UnsupportedMediaType(msg) => write!(f, "Unsupported file type: {}", msg),
            ApiError::UnreadableDocument(msg) => write!(f, "Could not read document: {}", msg),
            ApiError::InferenceError(msg) => write!(f, "Error processing file: {}", msg),
            ApiError::ModelLoadError(msg) => write!(f, "OCR model not available: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("❌ {} {}", status.as_u16(), self);
        } else {
            warn!("⚠️ {} {}", status.as_u16(), self);
        }

        (status, Json(self.to_response())).into_response()
    }
}

impl From<PageError> for ApiError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::TaskFailed(msg) => ApiError::InternalError(msg),
            other => ApiError::UnreadableDocument(other.to_string()),
        }
    }
}

impl From<OcrError> for ApiError {
    fn from(e: OcrError) -> Self {
        match e {
            OcrError::ModelLoad { .. } => ApiError::ModelLoadError(e.to_string()),
            OcrError::Inference(msg) => ApiError::InferenceError(msg),
        }
    }
}
