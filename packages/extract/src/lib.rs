#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Section segmentation and field mapping for daily lab reports.
//!
//! Turns the merged report table into typed [`IndicatorGroup`]s. Two input
//! kinds are supported:
//!
//! - **Grid**: rows of cells from a structural table extractor. Sections
//!   are segmented by keyword, then fields are read from calibrated
//!   columns ([`extract_grid`]).
//! - **Text**: recognized lines from PDF text extraction or OCR. Sections
//!   are segmented the same way (or supplied per image region), then fields
//!   are rebuilt from numeric tokens ([`extract_text`],
//!   [`extract_sections`]).
//!
//! Validated section sheets skip segmentation ([`extract_sheets`]).

pub mod normalize;
pub mod segment;
pub mod source;
pub mod structured;
pub mod text;

use zafra_layout::ReportLayout;
use zafra_report_models::{IndicatorGroup, RawRow, SectionKind};

pub use normalize::{normalize, valid_description};
pub use segment::{Boundaries, Sections, SegmentRow, TextLine, segment};
pub use source::{GridSection, SectionSource, TextSection};

/// Maps per-section inputs to groups in report order.
///
/// Inputs may arrive in any order. If a section is supplied twice, the
/// first occurrence wins. Absent sections produce no groups.
#[must_use]
pub fn assemble<S: SectionSource>(
    sections: impl IntoIterator<Item = (SectionKind, S)>,
    layout: &ReportLayout,
) -> Vec<IndicatorGroup> {
    let mut sections: Vec<(SectionKind, S)> = sections.into_iter().collect();
    sections.sort_by_key(|(kind, _)| *kind);
    sections.dedup_by_key(|(kind, _)| *kind);

    let groups: Vec<IndicatorGroup> = sections
        .iter()
        .flat_map(|(kind, source)| source.groups(*kind, layout))
        .collect();

    log::debug!(
        "Assembled {} groups with {} indicators",
        groups.len(),
        groups.iter().map(|g| g.indicators.len()).sum::<usize>(),
    );
    groups
}

/// Extracts groups from a structural grid.
#[must_use]
pub fn extract_grid(rows: &[RawRow], layout: &ReportLayout) -> Vec<IndicatorGroup> {
    let sections = segment(rows, &layout.segmentation);
    assemble(
        sections.present().map(|(kind, rows)| (kind, GridSection(rows))),
        layout,
    )
}

/// Extracts groups from recognized text covering the whole report table.
#[must_use]
pub fn extract_text(text: &str, layout: &ReportLayout) -> Vec<IndicatorGroup> {
    let lines: Vec<TextLine<'_>> = text.lines().map(TextLine::new).collect();
    let sections = segment(&lines, &layout.segmentation);
    assemble(
        sections.present().map(|(kind, lines)| {
            (
                kind,
                TextSection::new(lines.iter().map(TextLine::text).collect()),
            )
        }),
        layout,
    )
}

/// Extracts groups from text already split by section, such as the OCR
/// output of each header region of a scanned report.
#[must_use]
pub fn extract_sections(texts: &[(SectionKind, String)], layout: &ReportLayout) -> Vec<IndicatorGroup> {
    assemble(
        texts
            .iter()
            .map(|(kind, text)| (*kind, TextSection::from_text(text))),
        layout,
    )
}

/// Extracts groups from validated per-section sheets.
#[must_use]
pub fn extract_sheets(sheets: &[(SectionKind, Vec<RawRow>)], layout: &ReportLayout) -> Vec<IndicatorGroup> {
    assemble(
        sheets.iter().map(|(kind, rows)| (*kind, GridSection(rows))),
        layout,
    )
}
