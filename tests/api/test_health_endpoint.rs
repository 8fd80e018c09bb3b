// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health endpoint tests for GET /health

use super::common::*;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use tower::util::ServiceExt;

fn health_request() -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app(test_config());

    let response = app.oneshot(health_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(
        json,
        serde_json::json!({"status": "healthy", "service": "spanish-ocr"})
    );
}

#[tokio::test]
async fn test_health_ignores_model_state() {
    // Every model load fails, health still reports healthy
    let (app, counters) = test_app_with_failures(test_config(), usize::MAX);

    let response = post_file(&app, "/ocr", Some("a.png"), "image/png", &png(10, 10)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.clone().oneshot(health_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
    assert_eq!(counters.loads(), 1);
}
