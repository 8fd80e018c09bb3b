// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDF rasterization via MuPDF

use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix};
use tracing::debug;

use super::pages::PageError;

/// PDF user space is defined at 72 points per inch
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Pages of an opened PDF, rasterized lazily in page order
///
/// Only the page being yielded is held in memory. Blocking: iterate on the
/// blocking pool.
pub struct PdfPages {
    doc: Document,
    matrix: Matrix,
    colorspace: Colorspace,
    page_count: i32,
    next_index: i32,
}

impl PdfPages {
    /// Open a PDF for rendering at `dpi`
    pub fn open(data: &[u8], dpi: u32) -> Result<Self, PageError> {
        let doc = Document::from_bytes(data, "application/pdf")?;
        let page_count = doc.page_count()?;

        if page_count <= 0 {
            return Err(PageError::NoPages);
        }

        let scale = dpi as f32 / PDF_POINTS_PER_INCH;
        Ok(Self {
            doc,
            matrix: Matrix::new_scale(scale, scale),
            colorspace: Colorspace::device_rgb(),
            page_count,
            next_index: 0,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count as usize
    }

    fn render(&self, index: i32) -> Result<DynamicImage, PageError> {
        let page = self.doc.load_page(index)?;
        let pixmap = page.to_pixmap(&self.matrix, &self.colorspace, false, true)?;
        let image = pixmap_to_rgb(&pixmap)?;
        debug!(
            "Rendered PDF page {}/{} at {}x{}",
            index + 1,
            self.page_count,
            image.width(),
            image.height()
        );
        Ok(DynamicImage::ImageRgb8(image))
    }
}

impl Iterator for PdfPages {
    type Item = Result<DynamicImage, PageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.page_count {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(self.render(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.page_count - self.next_index).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PdfPages {}

fn pixmap_to_rgb(pixmap: &mupdf::Pixmap) -> Result<RgbImage, PageError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    if width == 0 || height == 0 || n < 3 {
        return Err(PageError::Pdf(format!(
            "unexpected pixmap layout {}x{} with {} channels",
            width, height, n
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(255);
            let g = samples.get(offset + 1).copied().unwrap_or(255);
            let b = samples.get(offset + 2).copied().unwrap_or(255);
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| PageError::Pdf("failed to create page image buffer".to_string()))
}
