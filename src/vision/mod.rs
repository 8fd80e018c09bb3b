// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based text extraction
//!
//! This module provides:
//! - Page extraction from images and PDFs, one page at a time
//! - OCR via PP-OCRv5 ONNX models
//! - Lazy, shared model loading
//! - Assembly of per-page text into a document

pub mod assembler;
pub mod image_utils;
pub mod invoker;
pub mod model_manager;
pub mod ocr;
pub mod pages;
pub mod pdf;

pub use assembler::assemble_text;
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use invoker::{OcrError, OcrInvoker};
pub use model_manager::{ModelLoader, ModelRegistry, OnnxModelLoader, PageRecognizer};
pub use ocr::RecognizedFragment;
pub use pages::{stream_pages, DocumentKind, PageError, PageStream};
