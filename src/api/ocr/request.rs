// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR request types and upload validation

use axum::http::StatusCode;
use axum_extra::extract::{multipart::MultipartError, Multipart};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::errors::ApiError;
use crate::models::ModelType;
use crate::vision::image_utils::SUPPORTED_IMAGE_EXTENSIONS;
use crate::vision::DocumentKind;

/// Multipart field carrying the document
pub const FILE_FIELD: &str = "file";

/// Query string of `POST /ocr`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrQuery {
    /// `mobile` or `server`; the configured default when absent
    #[serde(default)]
    pub model_type: Option<String>,
}

impl OcrQuery {
    pub fn resolve_model_type(&self, default: ModelType) -> Result<ModelType, ApiError> {
        match self.model_type.as_deref() {
            None | Some("") => Ok(default),
            Some(value) => value.parse().map_err(ApiError::InvalidRequest),
        }
    }
}

/// A document received over multipart
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl UploadedFile {
    /// Classify the upload as image or PDF
    pub fn document_kind(&self) -> Result<DocumentKind, ApiError> {
        if self.data.is_empty() {
            return Err(ApiError::UnreadableDocument("file is empty".to_string()));
        }

        DocumentKind::detect(
            &self.data,
            self.file_name.as_deref(),
            self.content_type.as_deref(),
        )
        .ok_or_else(|| {
            ApiError::UnsupportedMediaType(format!(
                "{}. Upload a PDF or an image ({})",
                self.file_name.as_deref().unwrap_or("unnamed upload"),
                SUPPORTED_IMAGE_EXTENSIONS.join(", ")
            ))
        })
    }
}

/// Read the `file` field, refusing anything above `max_bytes`
///
/// The field is consumed chunk by chunk and rejected as soon as the running
/// total passes the limit, so oversized uploads are never buffered whole.
/// A body that trips the router's length limit first is reported the same
/// way. Other fields are skipped.
pub async fn read_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
    max_mb: usize,
) -> Result<UploadedFile, ApiError> {
    let multipart_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { max_mb }
        } else {
            ApiError::InvalidRequest(e.body_text())
        }
    };

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if data.len() + chunk.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge { max_mb });
            }
            data.extend_from_slice(&chunk);
        }

        debug!(
            "Received upload {:?} ({:?}, {} bytes)",
            file_name,
            content_type,
            data.len()
        );

        return Ok(UploadedFile {
            data: data.freeze(),
            file_name,
            content_type,
        });
    }

    Err(ApiError::InvalidRequest(format!(
        "missing multipart field '{}'",
        FILE_FIELD
    )))
}
