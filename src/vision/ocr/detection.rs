// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PP-OCRv5 text detection model
//!
//! Runs the DB (Differentiable Binarization) detector and turns its
//! probability map into text boxes in source-image coordinates.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use ndarray::{Array2, ArrayView2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_detection, PreprocessInfo};

/// Probability above which a pixel counts as text
pub const BINARY_THRESHOLD: f32 = 0.3;

/// Minimum mean probability for a candidate box to be kept
pub const BOX_THRESHOLD: f32 = 0.5;

/// Box expansion factor (distance = area * ratio / perimeter)
pub const UNCLIP_RATIO: f32 = 1.6;

/// Boxes with a shorter side than this (in detector pixels) are dropped
pub const MIN_BOX_SIDE: f32 = 3.0;

/// Hard cap on connected components considered per page
const MAX_CANDIDATES: usize = 1000;

/// Boxes whose tops differ by less than this are on the same line
const SAME_LINE_TOLERANCE: f32 = 10.0;

/// A detected text box in source-image coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Mean text probability inside the box (0.0-1.0)
    pub confidence: f32,
}

impl TextBox {
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.confidence > 0.0
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// PP-OCRv5 text detection model
///
/// Runs on CPU only.
#[derive(Clone)]
pub struct OcrDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OcrDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrDetectionModel")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl OcrDetectionModel {
    /// Load the detection model from an ONNX file
    ///
    /// Blocking: ONNX Runtime parses and optimizes the graph here.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!(
                "OCR detection model not found: {}",
                model_path.display()
            );
        }

        info!("Loading OCR detection model from {}", model_path.display());

        let session = build_session(model_path).context(format!(
            "Failed to load OCR detection model from {}",
            model_path.display()
        ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .unwrap_or_else(|| "sigmoid_0.tmp_0".to_string());

        debug!(
            "Detection model loaded - input: {}, output: {}",
            input_name, output_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
        })
    }

    /// Detect text boxes on a page, sorted in reading order
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<TextBox>> {
        let (input, info) = preprocess_for_detection(image);

        let probability = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("Detection session lock poisoned"))?;

            let input_value =
                Value::from_array(input).context("Failed to create input tensor")?;

            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("Detection inference failed")?;

            let output_tensor = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?;

            // Output is [1, 1, H, W]; keep the trailing probability map
            let shape = output_tensor.shape();
            if shape.len() < 2 {
                anyhow::bail!("Unexpected detection output shape: {:?}", shape);
            }
            let (h, w) = (shape[shape.len() - 2], shape[shape.len() - 1]);
            let data: Vec<f32> = output_tensor.iter().copied().take(h * w).collect();
            Array2::from_shape_vec((h, w), data)
                .context("Detection output has unexpected size")?
        };

        let boxes = db_postprocess(probability.view(), &info);
        debug!("Detected {} text regions", boxes.len());

        Ok(boxes)
    }
}

pub(super) fn build_session(model_path: &Path) -> Result<Session> {
    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Turn a DB probability map into scored text boxes
///
/// The map is binarized at `BINARY_THRESHOLD`, dilated with a 2x2 kernel and
/// split into connected components. Each component's bounding rectangle is
/// scored by its mean probability, expanded by the unclip distance and mapped
/// back to source-image coordinates via `info`.
pub fn db_postprocess(probability: ArrayView2<f32>, info: &PreprocessInfo) -> Vec<TextBox> {
    let (height, width) = probability.dim();
    let mask = dilate(&binarize(probability, BINARY_THRESHOLD));

    let mut visited = vec![vec![false; width]; height];
    let mut boxes = Vec::new();
    let mut candidates = 0;

    'scan: for y in 0..height {
        for x in 0..width {
            if !mask[y][x] || visited[y][x] {
                continue;
            }
            candidates += 1;
            if candidates > MAX_CANDIDATES {
                break 'scan;
            }

            let (min_x, max_x, min_y, max_y) = flood_fill(&mask, &mut visited, x, y);
            let rect_w = (max_x - min_x + 1) as f32;
            let rect_h = (max_y - min_y + 1) as f32;
            if rect_w.min(rect_h) < MIN_BOX_SIDE {
                continue;
            }

            let score = mean_probability(probability, min_x, max_x, min_y, max_y);
            if score < BOX_THRESHOLD {
                continue;
            }

            let distance = rect_w * rect_h * UNCLIP_RATIO / (2.0 * (rect_w + rect_h));
            let x0 = min_x as f32 - distance;
            let y0 = min_y as f32 - distance;
            let x1 = (max_x + 1) as f32 + distance;
            let y1 = (max_y + 1) as f32 + distance;
            if (x1 - x0).min(y1 - y0) < MIN_BOX_SIDE + 2.0 {
                continue;
            }

            let (ox0, oy0) = info.map_to_original(x0, y0);
            let (ox1, oy1) = info.map_to_original(x1, y1);
            let text_box = TextBox {
                x: ox0,
                y: oy0,
                width: ox1 - ox0,
                height: oy1 - oy0,
                confidence: score,
            };
            if text_box.is_valid() {
                boxes.push(text_box);
            }
        }
    }

    sort_reading_order(&mut boxes);
    boxes
}

/// Order boxes top-to-bottom, then left-to-right within a line
///
/// Boxes whose tops are within `SAME_LINE_TOLERANCE` pixels count as the
/// same line even if one sits slightly higher.
pub fn sort_reading_order(boxes: &mut [TextBox]) {
    boxes.sort_by(|a, b| a.y.total_cmp(&b.y).then_with(|| a.x.total_cmp(&b.x)));

    for i in 0..boxes.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            let same_line = (boxes[j + 1].y - boxes[j].y).abs() < SAME_LINE_TOLERANCE;
            if same_line && boxes[j + 1].x < boxes[j].x {
                boxes.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
}

fn binarize(probability: ArrayView2<f32>, threshold: f32) -> Vec<Vec<bool>> {
    probability
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|&p| p > threshold).collect())
        .collect()
}

/// 2x2 dilation: a pixel is set if it or its left, upper or upper-left
/// neighbour is set
fn dilate(mask: &[Vec<bool>]) -> Vec<Vec<bool>> {
    let height = mask.len();
    let width = mask.first().map_or(0, |row| row.len());
    let mut out = vec![vec![false; width]; height];

    for y in 0..height {
        for x in 0..width {
            out[y][x] = mask[y][x]
                || (x > 0 && mask[y][x - 1])
                || (y > 0 && mask[y - 1][x])
                || (x > 0 && y > 0 && mask[y - 1][x - 1]);
        }
    }
    out
}

/// Flood fill a connected region, returning its bounds (inclusive)
fn flood_fill(
    mask: &[Vec<bool>],
    visited: &mut [Vec<bool>],
    start_x: usize,
    start_y: usize,
) -> (usize, usize, usize, usize) {
    let height = mask.len();
    let width = mask.first().map_or(0, |row| row.len());

    let mut stack = vec![(start_x, start_y)];
    let mut min_x = start_x;
    let mut max_x = start_x;
    let mut min_y = start_y;
    let mut max_y = start_y;

    while let Some((x, y)) = stack.pop() {
        if x >= width || y >= height || visited[y][x] || !mask[y][x] {
            continue;
        }

        visited[y][x] = true;
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);

        // 4-connected
        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    (min_x, max_x, min_y, max_y)
}

fn mean_probability(
    probability: ArrayView2<f32>,
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
) -> f32 {
    let region = probability.slice(ndarray::s![min_y..=max_y, min_x..=max_x]);
    region.mean().unwrap_or(0.0)
}
