//! Structural grids: the cell-by-cell output of a PDF table extractor.
//!
//! Two on-disk shapes are accepted:
//!
//! - **JSON**: an array of pages, each an array of rows, each an array of
//!   cells (`string`, number, or `null`). A bare array of rows is read as a
//!   single page.
//! - **CSV**: one page, one record per row. Empty fields read as `None`.

use std::fs::File;
use std::path::Path;

use serde_json::Value;
use zafra_report_models::RawRow;

use crate::{PdfError, select_page, sheets};

/// Every page grid of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridDocument {
    pages: Vec<Vec<RawRow>>,
}

fn parse_cell(value: Value) -> Result<Option<String>, PdfError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(PdfError::InvalidGrid(format!("unexpected cell {other}"))),
    }
}

fn parse_rows(value: Value) -> Result<Vec<RawRow>, PdfError> {
    let Value::Array(rows) = value else {
        return Err(PdfError::InvalidGrid("page is not an array of rows".to_string()));
    };
    rows.into_iter()
        .map(|row| match row {
            Value::Array(cells) => cells.into_iter().map(parse_cell).collect(),
            other => Err(PdfError::InvalidGrid(format!("row is not an array: {other}"))),
        })
        .collect()
}

impl GridDocument {
    /// Parses a JSON grid document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or not shaped like pages of
    /// rows of scalar cells.
    pub fn from_json_str(text: &str) -> Result<Self, PdfError> {
        let Value::Array(outer) = serde_json::from_str::<Value>(text)? else {
            return Err(PdfError::InvalidGrid("expected a JSON array".to_string()));
        };

        let paged = outer
            .iter()
            .any(|page| page.as_array().is_some_and(|rows| rows.iter().any(Value::is_array)));

        let pages = if paged {
            outer.into_iter().map(parse_rows).collect::<Result<_, _>>()?
        } else {
            vec![parse_rows(Value::Array(outer))?]
        };

        Ok(Self { pages })
    }

    /// Reads a single-page CSV grid.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV cannot be read.
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self, PdfError> {
        Ok(Self {
            pages: vec![sheets::read_grid_csv(reader)?],
        })
    }

    /// Loads a grid document, choosing the format by file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or has an
    /// extension other than `.json` or `.csv`.
    pub fn load(path: &Path) -> Result<Self, PdfError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let document = match extension.as_str() {
            "json" => Self::from_json_str(&std::fs::read_to_string(path)?)?,
            "csv" => Self::from_csv_reader(File::open(path)?)?,
            _ => return Err(PdfError::UnsupportedFormat(path.display().to_string())),
        };

        log::debug!(
            "Loaded grid {} with {} pages",
            path.display(),
            document.page_count()
        );
        Ok(document)
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The page to read when `requested` is `None`: `default` for
    /// multi-page documents, the only page otherwise.
    #[must_use]
    pub fn resolve_page(&self, requested: Option<usize>, default: usize) -> usize {
        match requested {
            Some(page) => page,
            None if self.pages.len() == 1 => 1,
            None => default,
        }
    }

    /// Rows of a 1-indexed page.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PageOutOfRange`] or [`PdfError::EmptyDocument`]
    /// if the page does not exist.
    pub fn page(&self, page: usize) -> Result<&[RawRow], PdfError> {
        select_page(self.pages.iter().collect(), page).map(Vec::as_slice)
    }

    /// Takes the rows of a 1-indexed page.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PageOutOfRange`] or [`PdfError::EmptyDocument`]
    /// if the page does not exist.
    pub fn into_page(self, page: usize) -> Result<Vec<RawRow>, PdfError> {
        select_page(self.pages, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paged_json() {
        let doc = GridDocument::from_json_str(
            r#"[[["cover"]], [["Jugo Mixto", null, 85.2], []]]"#,
        )
        .unwrap();

        assert_eq!(doc.page_count(), 2);
        let page = doc.page(2).unwrap();
        assert_eq!(
            page[0],
            vec![Some("Jugo Mixto".to_string()), None, Some("85.2".to_string())]
        );
        assert!(page[1].is_empty());
    }

    #[test]
    fn bare_grid_is_one_page() {
        let doc = GridDocument::from_json_str(r#"[["a", null], ["b"]]"#).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.resolve_page(None, 2), 1);
        assert_eq!(doc.page(1).unwrap().len(), 2);
    }

    #[test]
    fn rejects_nested_objects() {
        let err = GridDocument::from_json_str(r#"[[[{"a": 1}]]]"#).unwrap_err();
        assert!(matches!(err, PdfError::InvalidGrid(_)), "{err}");
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(
            GridDocument::from_json_str(r#"{"rows": []}"#),
            Err(PdfError::InvalidGrid(_))
        ));
    }

    #[test]
    fn missing_page_is_out_of_range() {
        let doc = GridDocument::from_json_str(r#"[[["a"]], [["b"]]]"#).unwrap();
        assert_eq!(doc.resolve_page(None, 2), 2);
        assert!(matches!(
            doc.into_page(3),
            Err(PdfError::PageOutOfRange { page: 3, pages: 2 })
        ));
    }

    #[test]
    fn loads_csv_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.CSV");
        std::fs::write(&path, "Jugo Mixto,,85.2\nMeladura,60.1\n").unwrap();

        let doc = GridDocument::load(&path).unwrap();

        let rows = doc.into_page(1).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], None);
        assert_eq!(rows[1], vec![Some("Meladura".to_string()), Some("60.1".to_string())]);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = GridDocument::load(Path::new("report.xlsx")).unwrap_err();
        assert!(matches!(err, PdfError::UnsupportedFormat(_)));
    }
}
