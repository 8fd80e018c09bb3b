// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for API tests: fake OCR engine, multipart bodies, documents

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use image::{DynamicImage, ImageFormat};
use serde_json::Value;
use spanish_ocr::{
    create_app,
    vision::{
        model_manager::{ModelLoader, PageRecognizer},
        ocr::{BoundingBox, RecognizedFragment},
    },
    AppState, ModelRegistry, ModelType, ServiceConfig,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "----spanish-ocr-test-boundary";

/// Call counters shared between the fakes and the test body
#[derive(Default)]
pub struct Counters {
    pub loads: AtomicUsize,
    pub pages: AtomicUsize,
}

impl Counters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }
}

fn fragment(text: String, confidence: f32) -> RecognizedFragment {
    RecognizedFragment {
        text,
        confidence,
        bounding_box: BoundingBox {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        },
    }
}

/// Deterministic engine: output depends only on page width and model type
///
/// Every page yields, in order: a high-confidence header, a mid-confidence
/// line naming the page width, and low-confidence noise.
pub struct FakeRecognizer {
    model_type: ModelType,
    counters: Arc<Counters>,
}

impl PageRecognizer for FakeRecognizer {
    fn recognize(&self, page: &DynamicImage) -> anyhow::Result<Vec<RecognizedFragment>> {
        self.counters.pages.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            fragment(format!("Señal {}", self.model_type), 0.97),
            fragment(format!("página {}", page.width()), 0.8),
            fragment("ruido".to_string(), 0.3),
        ])
    }
}

/// Loader producing `FakeRecognizer`s; fails the first `failures` loads
pub struct FakeLoader {
    counters: Arc<Counters>,
    failures: usize,
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load(&self, model_type: ModelType) -> anyhow::Result<Arc<dyn PageRecognizer>> {
        let attempt = self.counters.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if attempt < self.failures {
            anyhow::bail!("download of det.onnx failed with HTTP status 404");
        }
        Ok(Arc::new(FakeRecognizer {
            model_type,
            counters: self.counters.clone(),
        }) as Arc<dyn PageRecognizer>)
    }
}

/// Config for tests: PDFs render at 72 DPI so page width equals points
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        pdf_render_dpi: 72,
        ..ServiceConfig::default()
    }
}

pub fn test_app(config: ServiceConfig) -> (Router, Arc<Counters>) {
    test_app_with_failures(config, 0)
}

pub fn test_app_with_failures(config: ServiceConfig, failures: usize) -> (Router, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let loader = FakeLoader {
        counters: counters.clone(),
        failures,
    };
    let registry = Arc::new(ModelRegistry::new(Arc::new(loader)));
    (create_app(AppState::new(config, registry)), counters)
}

/// Multipart body with a single part named `field`
pub fn multipart_body(field: &str, file_name: Option<&str>, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    match file_name {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, name
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n", field).as_bytes(),
        ),
    }
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn ocr_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// POST a single file to `uri`
pub async fn post_file(
    app: &Router,
    uri: &str,
    file_name: Option<&str>,
    content_type: &str,
    data: &[u8],
) -> Response<Body> {
    let body = multipart_body("file", file_name, content_type, data);
    app.clone().oneshot(ocr_request(uri, body)).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Encoded white PNG of the given size
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([255, 255, 255]),
    ));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Structurally valid PDF with one empty page per entry in `widths` (points)
pub fn blank_pdf(widths: &[u32]) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    let kids: Vec<String> = (0..widths.len()).map(|i| format!("{} 0 R", i + 3)).collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        widths.len()
    ));
    for width in widths {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} 100] >>",
            width
        ));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }
    let xref_at = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        out.push_str(&format!("{:010} 00000 n \n", offset));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.into_bytes()
}
