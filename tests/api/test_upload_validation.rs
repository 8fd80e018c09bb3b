// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Upload validation tests: size limit, media types, unreadable documents

use super::common::*;
use axum::http::StatusCode;
use spanish_ocr::ServiceConfig;
use tower::util::ServiceExt;

#[tokio::test]
async fn test_oversized_upload_is_rejected_without_inference() {
    let config = ServiceConfig {
        max_file_size_mb: 1,
        ..test_config()
    };
    let (app, counters) = test_app(config);

    let data = vec![0u8; 1024 * 1024 + 1];
    let response = post_file(&app, "/ocr", Some("big.png"), "image/png", &data).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json = json_body(response).await;
    assert_eq!(json["detail"], "File too large. Maximum size is 1MB");
    assert_eq!(counters.loads(), 0);
    assert_eq!(counters.pages(), 0);
}

#[tokio::test]
async fn test_eleven_megabytes_over_ten_megabyte_limit() {
    let (app, counters) = test_app(test_config());

    let data = vec![b'%'; 11 * 1024 * 1024];
    let response = post_file(&app, "/ocr", Some("scan.pdf"), "application/pdf", &data).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json = json_body(response).await;
    assert_eq!(json["detail"], "File too large. Maximum size is 10MB");
    assert_eq!(counters.pages(), 0);
}

#[tokio::test]
async fn test_upload_at_exact_limit_is_accepted() {
    let config = ServiceConfig {
        max_file_size_mb: 1,
        ..test_config()
    };
    let (app, _) = test_app(config);

    // A valid PNG padded with trailing bytes up to exactly 1MB
    let mut data = png(10, 10);
    data.resize(1024 * 1024, 0);
    let response = post_file(&app, "/ocr", Some("edge.png"), "image/png", &data).await;
    assert_ne!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unsupported_type_is_415() {
    let (app, counters) = test_app(test_config());

    let response = post_file(&app, "/ocr", Some("notas.txt"), "text/plain", b"hola mundo").await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let json = json_body(response).await;
    assert!(json["detail"].as_str().unwrap().contains("notas.txt"));
    assert_eq!(counters.loads(), 0);
}

#[tokio::test]
async fn test_corrupt_pdf_is_unreadable() {
    let (app, counters) = test_app(test_config());

    let response = post_file(
        &app,
        "/ocr",
        Some("roto.pdf"),
        "application/pdf",
        b"this was never a pdf",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert!(json["detail"].as_str().unwrap().starts_with("Could not read document"));
    assert_eq!(counters.pages(), 0);
}

#[tokio::test]
async fn test_corrupt_image_is_unreadable() {
    let (app, _) = test_app(test_config());

    let response = post_file(&app, "/ocr", Some("foto.jpg"), "image/jpeg", b"\xFF\xD8\xFF\xE0garbage").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_file_is_unreadable() {
    let (app, _) = test_app(test_config());

    let response = post_file(&app, "/ocr", Some("vacio.png"), "image/png", b"").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_file_field_is_400() {
    let (app, _) = test_app(test_config());

    let body = multipart_body("document", Some("a.png"), "image/png", &png(10, 10));
    let response = app.oneshot(ocr_request("/ocr", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert!(json["detail"].as_str().unwrap().contains("'file'"));
}

#[tokio::test]
async fn test_non_multipart_body_is_400() {
    let (app, _) = test_app(test_config());

    let request = axum::http::Request::builder()
        .method(axum::http::Method::POST)
        .uri("/ocr")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"file": "nope"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_zero_page_pdf_is_unreadable() {
    let (app, counters) = test_app(test_config());

    let response = post_file(&app, "/ocr", Some("vacio.pdf"), "application/pdf", &blank_pdf(&[])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert!(json["detail"].as_str().unwrap().starts_with("Could not read document"));
    assert_eq!(counters.loads(), 0);
    assert_eq!(counters.pages(), 0);
}

#[tokio::test]
async fn test_declared_pdf_without_filename_is_read_as_pdf() {
    let (app, counters) = test_app(test_config());

    // No filename and no signature: the declared type decides, and the bytes fail to parse
    let response = post_file(&app, "/ocr", None, "application/pdf", b"not a real document").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["detail"]
        .as_str()
        .unwrap()
        .starts_with("Could not read document"));
    assert_eq!(counters.pages(), 0);
}

#[tokio::test]
async fn test_undeclared_unknown_bytes_are_415() {
    let (app, _) = test_app(test_config());

    let response = post_file(&app, "/ocr", None, "text/plain", b"not a real document").await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}
