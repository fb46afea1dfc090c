//! Text of a single PDF page.

use std::path::Path;

use crate::{PdfError, select_page};

/// Extracts the text of a 1-indexed page from PDF bytes.
///
/// # Errors
///
/// Returns [`PdfError::Extraction`] if the PDF cannot be parsed,
/// [`PdfError::EmptyDocument`] if it has no pages, and
/// [`PdfError::PageOutOfRange`] if `page` does not exist.
pub fn extract_page_text(bytes: &[u8], page: usize) -> Result<String, PdfError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| PdfError::Extraction(format!("failed to extract text from PDF: {e}")))?;

    log::debug!("PDF has {} pages, reading page {page}", pages.len());

    let text = select_page(pages, page)?;
    log::debug!("Extracted {} characters from page {page}", text.len());
    Ok(text)
}

/// Reads a PDF file and extracts the text of a 1-indexed page.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the page cannot be
/// extracted.
pub fn read_page_text(path: &Path, page: usize) -> Result<String, PdfError> {
    let bytes = std::fs::read(path)?;
    log::info!("Read {} bytes from {}", bytes.len(), path.display());
    extract_page_text(&bytes, page)
}
