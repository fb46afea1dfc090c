#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Page-level inputs for daily lab report extraction.
//!
//! The report usually sits on one page of a multi-page PDF. This crate
//! hands that page to the extraction pipeline in one of two shapes:
//!
//! - a **grid** of cells produced by a structural table extractor, stored
//!   as JSON or CSV ([`grid`]);
//! - the page's **text**, pulled with pure-Rust text extraction
//!   ([`pdf_extract`]) ([`page_text`]).
//!
//! It also reads and writes the per-section CSV sheets used for human
//! validation ([`sheets`]).

pub mod grid;
pub mod page_text;
pub mod sheets;

pub use grid::GridDocument;
pub use page_text::{extract_page_text, read_page_text};
pub use sheets::{read_section_sheets, write_section_sheets};

/// Page used when none is requested. The lab report is normally the second
/// page of the daily PDF.
pub const DEFAULT_PAGE: usize = 2;

/// Errors specific to reading report pages.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// PDF text extraction failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// The requested page does not exist.
    #[error("Document only has {pages} pages, cannot extract page {page}")]
    PageOutOfRange {
        /// Requested 1-indexed page.
        page: usize,
        /// Pages in the document.
        pages: usize,
    },

    /// The document has no pages at all.
    #[error("Document has no pages")]
    EmptyDocument,

    /// A grid document is not shaped like pages of rows of cells.
    #[error("Invalid grid document: {0}")]
    InvalidGrid(String),

    /// The file extension is not a supported grid format.
    #[error("Unsupported grid format: {0}")]
    UnsupportedFormat(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Picks a 1-indexed page out of `pages`.
///
/// # Errors
///
/// Returns [`PdfError::EmptyDocument`] if there are no pages, and
/// [`PdfError::PageOutOfRange`] if `page` is zero or past the end.
pub fn select_page<T>(mut pages: Vec<T>, page: usize) -> Result<T, PdfError> {
    if pages.is_empty() {
        return Err(PdfError::EmptyDocument);
    }
    if page == 0 || page > pages.len() {
        return Err(PdfError::PageOutOfRange {
            page,
            pages: pages.len(),
        });
    }
    Ok(pages.swap_remove(page - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_one_indexed_page() {
        let pages = vec!["one", "two", "three"];
        assert_eq!(select_page(pages, 2).unwrap(), "two");
    }

    #[test]
    fn page_past_end_is_an_error() {
        let err = select_page(vec!["one"], 2).unwrap_err();
        assert!(matches!(
            err,
            PdfError::PageOutOfRange { page: 2, pages: 1 }
        ));
        assert_eq!(
            err.to_string(),
            "Document only has 1 pages, cannot extract page 2"
        );
    }

    #[test]
    fn page_zero_is_an_error() {
        assert!(matches!(
            select_page(vec!["one"], 0),
            Err(PdfError::PageOutOfRange { page: 0, .. })
        ));
    }

    #[test]
    fn no_pages_is_an_empty_document() {
        assert!(matches!(
            select_page(Vec::<String>::new(), 1),
            Err(PdfError::EmptyDocument)
        ));
    }
}
