// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! OCR endpoint tests for POST /ocr
//!
//! The router runs with a fake OCR engine whose output depends only on page
//! width and model type, so page order and filtering are observable.

use super::common::*;
use axum::http::StatusCode;
use spanish_ocr::ServiceConfig;

#[tokio::test]
async fn test_image_upload_returns_text() {
    let (app, counters) = test_app(test_config());

    let response = post_file(&app, "/ocr", Some("carta.png"), "image/png", &png(40, 20)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["text"], "Señal mobile\npágina 40");
    assert_eq!(json["model_type"], "mobile");
    assert_eq!(json["file_name"], "carta.png");
    assert_eq!(counters.pages(), 1);
}

#[tokio::test]
async fn test_image_has_no_page_separator() {
    let (app, _) = test_app(test_config());

    let response = post_file(&app, "/ocr", Some("foto.PNG"), "image/png", &png(64, 64)).await;
    let json = json_body(response).await;
    assert!(!json["text"].as_str().unwrap().contains("\n\n"));
}

#[tokio::test]
async fn test_multi_page_pdf_keeps_page_order() {
    let (app, counters) = test_app(test_config());

    let pdf = blank_pdf(&[100, 200, 300]);
    let response = post_file(&app, "/ocr", Some("informe.pdf"), "application/pdf", &pdf).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let text = json["text"].as_str().unwrap();
    assert_eq!(
        text,
        "Señal mobile\npágina 100\n\nSeñal mobile\npágina 200\n\nSeñal mobile\npágina 300"
    );
    assert_eq!(text.matches("\n\n").count(), 2);
    assert_eq!(counters.pages(), 3);
}

#[tokio::test]
async fn test_pdf_detected_by_magic_bytes() {
    let (app, _) = test_app(test_config());

    let pdf = blank_pdf(&[120]);
    let response = post_file(&app, "/ocr", Some("scan.bin"), "application/octet-stream", &pdf).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["text"], "Señal mobile\npágina 120");
}

#[tokio::test]
async fn test_pdf_render_dpi_is_applied() {
    let config = ServiceConfig {
        pdf_render_dpi: 144,
        ..test_config()
    };
    let (app, _) = test_app(config);

    let response = post_file(&app, "/ocr", Some("a.pdf"), "application/pdf", &blank_pdf(&[72])).await;
    let json = json_body(response).await;
    assert_eq!(json["text"], "Señal mobile\npágina 144");
}

#[tokio::test]
async fn test_low_confidence_fragments_never_appear() {
    let (app, _) = test_app(test_config());

    let response = post_file(&app, "/ocr", Some("a.png"), "image/png", &png(30, 30)).await;
    let json = json_body(response).await;
    assert!(!json["text"].as_str().unwrap().contains("ruido"));
}

#[tokio::test]
async fn test_raising_threshold_only_removes_text() {
    let mut previous: Option<Vec<String>> = None;

    for threshold in [0.0, 0.5, 0.9, 0.99] {
        let config = ServiceConfig {
            text_score_threshold: threshold,
            ..test_config()
        };
        let (app, _) = test_app(config);

        let response = post_file(&app, "/ocr", Some("a.png"), "image/png", &png(30, 30)).await;
        let json = json_body(response).await;
        let lines: Vec<String> = json["text"]
            .as_str()
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();

        if let Some(prev) = previous {
            assert!(lines.len() <= prev.len(), "threshold {}", threshold);
            assert!(lines.iter().all(|l| prev.contains(l)), "threshold {}", threshold);
        }
        previous = Some(lines);
    }

    // 0.99 filters everything the fake produces
    assert_eq!(previous.unwrap(), Vec::<String>::new());
}

#[tokio::test]
async fn test_repeated_calls_are_identical() {
    let (app, counters) = test_app(test_config());
    let pdf = blank_pdf(&[80, 90]);

    let first = json_body(post_file(&app, "/ocr", Some("a.pdf"), "application/pdf", &pdf).await).await;
    let second = json_body(post_file(&app, "/ocr", Some("a.pdf"), "application/pdf", &pdf).await).await;

    assert_eq!(first, second);
    // Model loaded once across requests
    assert_eq!(counters.loads(), 1);
}

#[tokio::test]
async fn test_schema_identical_across_model_types() {
    let (app, counters) = test_app(test_config());

    let mobile = json_body(
        post_file(&app, "/ocr?model_type=mobile", Some("a.png"), "image/png", &png(50, 20)).await,
    )
    .await;
    let server = json_body(
        post_file(&app, "/ocr?model_type=server", Some("a.png"), "image/png", &png(50, 20)).await,
    )
    .await;

    let keys = |v: &serde_json::Value| {
        let mut k: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
        k.sort();
        k
    };
    assert_eq!(keys(&mobile), vec!["file_name", "model_type", "text"]);
    assert_eq!(keys(&mobile), keys(&server));
    assert_eq!(mobile["model_type"], "mobile");
    assert_eq!(server["model_type"], "server");
    assert_eq!(server["text"], "Señal server\npágina 50");
    assert_eq!(counters.loads(), 2);
}

#[tokio::test]
async fn test_default_model_type_comes_from_config() {
    let config = ServiceConfig {
        default_model_type: spanish_ocr::ModelType::Server,
        ..test_config()
    };
    let (app, _) = test_app(config);

    let json = json_body(post_file(&app, "/ocr", Some("a.png"), "image/png", &png(20, 20)).await).await;
    assert_eq!(json["model_type"], "server");
}

#[tokio::test]
async fn test_model_type_is_case_insensitive() {
    let (app, _) = test_app(test_config());

    let response = post_file(&app, "/ocr?model_type=Server", Some("a.png"), "image/png", &png(20, 20)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["model_type"], "server");
}

#[tokio::test]
async fn test_unknown_model_type_is_rejected() {
    let (app, counters) = test_app(test_config());

    let response = post_file(&app, "/ocr?model_type=huge", Some("a.png"), "image/png", &png(20, 20)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert!(json["detail"].as_str().unwrap().contains("huge"));
    assert_eq!(counters.loads(), 0);
}

#[tokio::test]
async fn test_image_without_filename_is_detected_by_signature() {
    let (app, _) = test_app(test_config());

    let response = post_file(&app, "/ocr", None, "application/octet-stream", &png(25, 25)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert!(json["file_name"].is_null());
    assert_eq!(json["text"], "Señal mobile\npágina 25");
}

#[tokio::test]
async fn test_long_pdf_is_recognized_page_by_page() {
    let (app, counters) = test_app(test_config());

    let widths: Vec<u32> = (1..=12).map(|i| i * 10).collect();
    let response = post_file(&app, "/ocr", Some("largo.pdf"), "application/pdf", &blank_pdf(&widths)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let pages: Vec<&str> = json["text"].as_str().unwrap().split("\n\n").collect();
    assert_eq!(pages.len(), 12);
    for (page, width) in pages.iter().zip(&widths) {
        assert_eq!(*page, format!("Señal mobile\npágina {}", width));
    }
    assert_eq!(counters.pages(), 12);
}
