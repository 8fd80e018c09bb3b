// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Liveness endpoint

use axum::Json;
use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "spanish-ocr";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// GET /health - always healthy while the process serves requests
///
/// Model state is not inspected: models load lazily on first use.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}
