// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for PP-OCRv5 models
//!
//! All tensors are NCHW in BGR channel order, normalized as
//! `(pixel / 255 - 0.5) / 0.5`, which is what the PaddleOCR exports expect.

use image::{imageops::FilterType, DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

/// Shorter image side is scaled up to at least this many pixels for detection
pub const DET_LIMIT_SIDE_LEN: u32 = 736;

/// Longer image side is never scaled beyond this for detection
pub const DET_MAX_SIDE_LEN: u32 = 2000;

/// Detection input sides must be multiples of this
pub const DET_SIZE_MULTIPLE: u32 = 32;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Recognition inputs are padded to at least this width
pub const REC_MIN_WIDTH: u32 = 320;

/// Upper bound on recognition input width
pub const REC_MAX_WIDTH: u32 = 3200;

/// Orientation classifier input size
pub const CLS_INPUT_HEIGHT: u32 = 48;
pub const CLS_INPUT_WIDTH: u32 = 192;

/// Crops at least this much taller than wide are treated as vertical text
const VERTICAL_TEXT_RATIO: f32 = 1.5;

const MEAN: f32 = 0.5;
const STD: f32 = 0.5;

/// Scaling applied to an image before detection
///
/// Used to map detected boxes back to source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessInfo {
    /// Resized width / original width
    pub ratio_w: f32,
    /// Resized height / original height
    pub ratio_h: f32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
    /// Width of the tensor fed to the detector
    pub resized_width: u32,
    /// Height of the tensor fed to the detector
    pub resized_height: u32,
}

impl PreprocessInfo {
    /// Calculate detection resize for an image of the given size
    pub fn for_detection(width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);

        let mut ratio = if w.min(h) < DET_LIMIT_SIDE_LEN as f32 {
            DET_LIMIT_SIDE_LEN as f32 / w.min(h)
        } else {
            1.0
        };
        if w.max(h) * ratio > DET_MAX_SIDE_LEN as f32 {
            ratio = DET_MAX_SIDE_LEN as f32 / w.max(h);
        }

        let resized_width = round_to_multiple(w * ratio);
        let resized_height = round_to_multiple(h * ratio);

        Self {
            ratio_w: resized_width as f32 / w,
            ratio_h: resized_height as f32 / h,
            original_width: width,
            original_height: height,
            resized_width,
            resized_height,
        }
    }

    /// Map a coordinate from detector space back to original image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x / self.ratio_w).clamp(0.0, self.original_width as f32);
        let orig_y = (y / self.ratio_h).clamp(0.0, self.original_height as f32);
        (orig_x, orig_y)
    }
}

fn round_to_multiple(value: f32) -> u32 {
    let m = DET_SIZE_MULTIPLE as f32;
    ((value / m).round() * m).max(m) as u32
}

/// Preprocess an image for text detection
///
/// Steps:
/// 1. Resize so both sides are multiples of 32 (see `PreprocessInfo::for_detection`)
/// 2. Normalize and convert to a `[1, 3, H, W]` BGR tensor
pub fn preprocess_for_detection(image: &DynamicImage) -> (Array4<f32>, PreprocessInfo) {
    let (w, h) = image.dimensions();
    let info = PreprocessInfo::for_detection(w, h);

    let resized = image
        .resize_exact(info.resized_width, info.resized_height, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::zeros((
        1,
        3,
        info.resized_height as usize,
        info.resized_width as usize,
    ));
    write_normalized(&mut tensor, 0, &resized);

    (tensor, info)
}

/// Preprocess a cropped text line for recognition
///
/// The crop is scaled to height 48 keeping its aspect ratio, then
/// right-padded with zeros to at least `REC_MIN_WIDTH`.
pub fn preprocess_for_recognition(image: &DynamicImage) -> Array4<f32> {
    let resized_width = scaled_width(image, REC_INPUT_HEIGHT, REC_MAX_WIDTH);
    let tensor_width = resized_width.max(REC_MIN_WIDTH);
    resize_and_pad(image, REC_INPUT_HEIGHT, resized_width, tensor_width)
}

/// Preprocess a cropped text line for the orientation classifier
pub fn preprocess_for_classification(image: &DynamicImage) -> Array4<f32> {
    let resized_width = scaled_width(image, CLS_INPUT_HEIGHT, CLS_INPUT_WIDTH);
    resize_and_pad(image, CLS_INPUT_HEIGHT, resized_width, CLS_INPUT_WIDTH)
}

fn scaled_width(image: &DynamicImage, target_height: u32, max_width: u32) -> u32 {
    let (w, h) = image.dimensions();
    let ratio = w as f32 / h.max(1) as f32;
    ((target_height as f32 * ratio).ceil() as u32).clamp(1, max_width)
}

fn resize_and_pad(
    image: &DynamicImage,
    height: u32,
    resized_width: u32,
    tensor_width: u32,
) -> Array4<f32> {
    let resized = image
        .resize_exact(resized_width, height, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::zeros((1, 3, height as usize, tensor_width as usize));
    write_normalized(&mut tensor, 0, &resized);
    tensor
}

/// Write `rgb` into batch slot `batch` of `tensor` (BGR, normalized)
fn write_normalized(tensor: &mut Array4<f32>, batch: usize, rgb: &RgbImage) {
    let (w, h) = rgb.dimensions();
    for y in 0..h as usize {
        for x in 0..w as usize {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                // BGR: channel 0 takes the blue sample
                let value = pixel[2 - c] as f32 / 255.0;
                tensor[[batch, c, y, x]] = (value - MEAN) / STD;
            }
        }
    }
}

/// Crop an axis-aligned text region out of a page
///
/// Vertical crops (much taller than wide) are rotated 90° counter-clockwise
/// so the recognizer always sees horizontal text.
pub fn crop_text_region(image: &DynamicImage, x: u32, y: u32, width: u32, height: u32) -> DynamicImage {
    let (img_w, img_h) = image.dimensions();
    let x = x.min(img_w.saturating_sub(1));
    let y = y.min(img_h.saturating_sub(1));
    let width = width.clamp(1, img_w - x);
    let height = height.clamp(1, img_h - y);

    let crop = image.crop_imm(x, y, width, height);
    if height as f32 / width as f32 >= VERTICAL_TEXT_RATIO {
        crop.rotate270()
    } else {
        crop
    }
}
