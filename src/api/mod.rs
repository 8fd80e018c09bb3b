// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod health;
pub mod ocr;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use health::{health_handler, HealthResponse};
pub use ocr::{ocr_handler, OcrQuery, OcrResponse, UploadedFile};
pub use server::{create_app, shutdown_signal, AppState};
