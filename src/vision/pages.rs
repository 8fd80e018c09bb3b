// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page extraction: turns an upload into an ordered stream of page images

use bytes::Bytes;
use image::DynamicImage;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::image_utils::{decode_image_bytes, detect_format, is_supported_extension, ImageError};
use super::pdf::PdfPages;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Document has no pages")]
    NoPages,

    #[error("Unreadable PDF: {0}")]
    Pdf(String),

    #[error("Unreadable image: {0}")]
    Image(#[from] ImageError),

    #[error("Page extraction task failed: {0}")]
    TaskFailed(String),
}

impl From<mupdf::Error> for PageError {
    fn from(e: mupdf::Error) -> Self {
        PageError::Pdf(e.to_string())
    }
}

/// What an upload contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    /// Infer the kind from content, declared filename and content type
    ///
    /// PDF wins when either the magic bytes or the extension say so. Images
    /// are accepted by a known extension, or by signature. The declared
    /// content type only decides when the filename has no extension and the
    /// bytes carry no known signature. Returns `None` for anything else.
    pub fn detect(bytes: &[u8], file_name: Option<&str>, content_type: Option<&str>) -> Option<Self> {
        let extension = file_name.and_then(file_extension);

        if bytes.starts_with(PDF_MAGIC) || extension.as_deref() == Some("pdf") {
            return Some(DocumentKind::Pdf);
        }

        match extension.as_deref() {
            Some(ext) if is_supported_extension(ext) => Some(DocumentKind::Image),
            _ if detect_format(bytes).is_ok() => Some(DocumentKind::Image),
            None => content_type.and_then(Self::from_content_type),
            Some(_) => None,
        }
    }

    /// Kind named by a MIME type such as `application/pdf` or `image/png`
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        match essence.split_once('/') {
            Some(("application", "pdf")) => Some(DocumentKind::Pdf),
            Some(("image", subtype)) if is_supported_extension(subtype) => Some(DocumentKind::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Image => "image",
            DocumentKind::Pdf => "pdf",
        }
    }
}

/// Lowercase extension of a filename, if it has one
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Page images produced one at a time by a blocking task
///
/// The channel holds a single page, so the producer renders the next page
/// only once the consumer has taken the previous one. Dropping the stream
/// stops the producer after its current page.
pub struct PageStream {
    receiver: mpsc::Receiver<Result<DynamicImage, PageError>>,
    producer: Option<JoinHandle<()>>,
}

impl PageStream {
    /// Next page in document order, `None` once every page was yielded
    pub async fn next_page(&mut self) -> Option<Result<DynamicImage, PageError>> {
        if let Some(page) = self.receiver.recv().await {
            return Some(page);
        }

        // Producer hung up; surface a panic instead of a short document
        match self.producer.take()?.await {
            Ok(()) => None,
            Err(e) => Some(Err(PageError::TaskFailed(e.to_string()))),
        }
    }
}

/// Split an upload into page images on the blocking pool
pub fn stream_pages(data: Bytes, kind: DocumentKind, pdf_dpi: u32) -> PageStream {
    let (sender, receiver) = mpsc::channel(1);

    let producer = tokio::task::spawn_blocking(move || {
        produce_pages(&data, kind, pdf_dpi, |page| sender.blocking_send(page).is_ok())
    });

    PageStream {
        receiver,
        producer: Some(producer),
    }
}

/// Hand pages to `sink` in order until it returns `false` or a page fails
///
/// Errors are delivered through `sink` as the last item.
fn produce_pages<F>(data: &[u8], kind: DocumentKind, pdf_dpi: u32, mut sink: F)
where
    F: FnMut(Result<DynamicImage, PageError>) -> bool,
{
    match kind {
        DocumentKind::Image => {
            let page = decode_image_bytes(data).map_err(PageError::from).map(|(image, info)| {
                debug!(
                    "Decoded {:?} image: {}x{}, {} bytes",
                    info.format, info.width, info.height, info.size_bytes
                );
                image
            });
            sink(page);
        }
        DocumentKind::Pdf => {
            let pages = match PdfPages::open(data, pdf_dpi) {
                Ok(pages) => pages,
                Err(e) => {
                    sink(Err(e));
                    return;
                }
            };
            debug!("Streaming {} PDF page(s)", pages.page_count());

            for page in pages {
                let failed = page.is_err();
                if !sink(page) || failed {
                    return;
                }
            }
        }
    }
}
