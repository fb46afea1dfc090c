//! Per-section CSV sheets for human validation.
//!
//! A segmented grid is written as one CSV per section plus the raw grid, so
//! a person can correct cells before conversion. Reading the directory back
//! yields the sections whose sheet is present.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zafra_report_models::{RawRow, SectionKind};

use crate::PdfError;

/// File name of the unsegmented grid.
pub const RAW_SHEET: &str = "raw_data.csv";

/// File name of a section's sheet.
#[must_use]
pub const fn sheet_file_name(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Analysis => "analisis.csv",
        SectionKind::FinishedProduct => "producto_terminado.csv",
        SectionKind::Continuation => "continuacion.csv",
    }
}

/// Writes rows as CSV. `None` cells are written as empty fields.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_grid_csv<W: Write>(rows: &[RawRow], writer: W) -> Result<(), PdfError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);

    for row in rows {
        csv_writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Reads CSV rows. Blank fields read as `None`.
///
/// # Errors
///
/// Returns an error if the CSV is malformed or reading fails.
pub fn read_grid_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, PdfError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|cell| {
                    if cell.trim().is_empty() {
                        None
                    } else {
                        Some(cell.to_owned())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

/// Writes the raw grid and every non-empty section to `dir`.
///
/// Returns the paths written, raw grid first.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a sheet cannot
/// be written.
pub fn write_section_sheets(
    dir: &Path,
    raw: &[RawRow],
    sections: &[(SectionKind, &[RawRow])],
) -> Result<Vec<PathBuf>, PdfError> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    let raw_path = dir.join(RAW_SHEET);
    write_grid_csv(raw, File::create(&raw_path)?)?;
    written.push(raw_path);

    for (kind, rows) in sections {
        if rows.is_empty() {
            log::warn!("Section {kind} is empty, not writing a sheet");
            continue;
        }
        let path = dir.join(sheet_file_name(*kind));
        write_grid_csv(rows, File::create(&path)?)?;
        log::debug!("Wrote {} rows to {}", rows.len(), path.display());
        written.push(path);
    }

    Ok(written)
}

/// Reads every section sheet present in `dir`, in report order.
///
/// # Errors
///
/// Returns an error if a present sheet cannot be read.
pub fn read_section_sheets(dir: &Path) -> Result<Vec<(SectionKind, Vec<RawRow>)>, PdfError> {
    let mut sheets = Vec::new();

    for &kind in SectionKind::ALL {
        let path = dir.join(sheet_file_name(kind));
        if !path.is_file() {
            log::debug!("No {} sheet in {}", kind, dir.display());
            continue;
        }
        sheets.push((kind, read_grid_csv(File::open(&path)?)?));
    }

    Ok(sheets)
}
