// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Joins per-page OCR output into the final document text

/// Separator between fragments on one page
pub const LINE_SEPARATOR: &str = "\n";

/// Separator between pages
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Build document text from fragment texts grouped by page
///
/// Each fragment becomes one line. Pages without any text are skipped so
/// they don't leave empty separators behind.
pub fn assemble_text(pages: &[Vec<String>]) -> String {
    pages
        .iter()
        .map(|fragments| fragments.join(LINE_SEPARATOR))
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}
