// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoint handler

use axum::extract::{rejection::QueryRejection, Query, State};
use axum::Json;
use axum_extra::extract::{multipart::MultipartRejection, Multipart};
use std::time::Instant;
use tracing::{debug, info};

use super::request::{read_upload, OcrQuery};
use super::response::OcrResponse;
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::vision::{assemble_text, stream_pages};

/// POST /ocr - Extract text from an image or PDF
///
/// # Request
/// - multipart field `file`: the document (required)
/// - query `model_type`: `mobile` or `server` (defaults to the configured model)
///
/// # Response
/// - `text`: recognized text, one line per fragment, pages separated by `\n\n`
/// - `model_type`: model configuration used
/// - `file_name`: declared filename, or `null`
///
/// # Errors
/// - 400 Bad Request: missing file, bad `model_type`, unreadable document
/// - 413 Payload Too Large: upload above `MAX_FILE_SIZE_MB`
/// - 415 Unsupported Media Type: neither a PDF nor a supported image
/// - 500 Internal Server Error: OCR processing failed
/// - 503 Service Unavailable: OCR model could not be loaded
pub async fn ocr_handler(
    State(state): State<AppState>,
    query: Result<Query<OcrQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let started = Instant::now();

    // 1. Resolve model selection
    let Query(query) = query.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let model_type = query.resolve_model_type(state.config.default_model_type)?;

    // 2. Read and validate the upload
    let mut multipart = multipart.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let upload = read_upload(
        &mut multipart,
        state.config.max_file_size_bytes(),
        state.config.max_file_size_mb,
    )
    .await?;
    let kind = upload.document_kind()?;

    debug!(
        "OCR request: {} {:?} ({} bytes), model {}",
        kind.as_str(),
        upload.file_name,
        upload.data.len(),
        model_type
    );

    // 3. Render and OCR pages one at a time, in document order
    let mut pages = stream_pages(upload.data, kind, state.config.pdf_render_dpi);
    let mut page_texts = Vec::new();
    while let Some(page) = pages.next_page().await {
        let page = page?;
        debug!("Running {} OCR on page {}", model_type, page_texts.len() + 1);
        page_texts.push(state.invoker.recognize_page(page, model_type).await?);
    }
    let page_count = page_texts.len();

    // 4. Assemble
    let text = assemble_text(&page_texts);

    info!(
        "OCR complete: {} page(s), {} chars, model {}, {}ms",
        page_count,
        text.chars().count(),
        model_type,
        started.elapsed().as_millis()
    );

    Ok(Json(OcrResponse::new(text, model_type, upload.file_name)))
}
