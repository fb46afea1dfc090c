//! Layout registry: loads all report templates from embedded TOML configs.
//!
//! Each `.toml` file in `packages/layout/layouts/` is baked into the binary
//! at compile time via [`include_str!`]. Supporting a new report template
//! means adding a TOML file and listing it below.

use crate::{LayoutError, ReportLayout, parse_layout_toml};

/// Identifier of the layout used when none is requested.
pub const DEFAULT_LAYOUT_ID: &str = "informe_diario_v1";

pub(crate) const DEFAULT_LAYOUT_TOML: &str = include_str!("../layouts/informe_diario_v1.toml");

/// TOML configs embedded at compile time.
const LAYOUT_TOMLS: &[(&str, &str)] = &[("informe_diario_v1", DEFAULT_LAYOUT_TOML)];

/// Total number of configured layouts (used in tests).
#[cfg(test)]
const EXPECTED_LAYOUT_COUNT: usize = 1;

/// Returns all embedded layouts.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_layouts() -> Vec<ReportLayout> {
    LAYOUT_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_layout_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up an embedded layout by id.
///
/// # Errors
///
/// Returns [`LayoutError::Unknown`] if no embedded layout has that id.
pub fn layout_by_id(id: &str) -> Result<ReportLayout, LayoutError> {
    all_layouts()
        .into_iter()
        .find(|layout| layout.id == id)
        .ok_or_else(|| LayoutError::Unknown(id.to_string()))
}

/// Returns the default layout.
///
/// # Panics
///
/// Panics if the embedded default layout is missing or malformed.
#[must_use]
pub fn default_layout() -> ReportLayout {
    layout_by_id(DEFAULT_LAYOUT_ID)
        .unwrap_or_else(|e| panic!("Default layout {DEFAULT_LAYOUT_ID} unavailable: {e}"))
}

#[cfg(test)]
mod tests {
    use zafra_report_models::SectionKind;

    use super::*;

    #[test]
    fn loads_all_layouts() {
        assert_eq!(all_layouts().len(), EXPECTED_LAYOUT_COUNT);
    }

    #[test]
    fn layout_ids_are_unique_and_match_file_names() {
        let layouts = all_layouts();
        let mut ids: Vec<&str> = layouts.iter().map(|l| l.id.as_str()).collect();
        for ((name, _), id) in LAYOUT_TOMLS.iter().zip(&ids) {
            assert_eq!(name, id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), EXPECTED_LAYOUT_COUNT);
    }

    #[test]
    fn unknown_layout_is_an_error() {
        let err = layout_by_id("nope").unwrap_err();
        assert!(matches!(err, LayoutError::Unknown(id) if id == "nope"));
    }

    #[test]
    fn default_layout_columns() {
        let layout = default_layout();

        let today: Vec<(&str, usize)> = layout
            .analysis
            .today
            .iter()
            .map(|f| (f.name.as_str(), f.column))
            .collect();
        assert_eq!(
            today,
            [
                ("BRIX", 3),
                ("SAC", 4),
                ("PZA", 7),
                ("COLOR", 16),
                ("PH", 18),
                ("GR", 20)
            ]
        );

        let to_date: Vec<usize> = layout.analysis.to_date.iter().map(|f| f.column).collect();
        assert_eq!(to_date, [9, 11, 14]);

        let metrics: Vec<Option<usize>> = layout
            .finished_product
            .metrics
            .iter()
            .map(|m| m.column)
            .collect();
        assert_eq!(
            metrics,
            [Some(1), Some(2), Some(5), Some(8), Some(11), Some(14), Some(17)]
        );

        let continuation: Vec<usize> = layout.continuation.fields.iter().map(|f| f.column).collect();
        assert_eq!(continuation, [2, 4, 6, 8, 9, 10, 11, 13, 14, 15, 16]);
    }

    #[test]
    fn default_layout_image_regions() {
        let image = default_layout().image;
        let regions: Vec<(SectionKind, u32, u8)> = image
            .regions
            .iter()
            .map(|r| (r.section, r.expansion, r.psm))
            .collect();
        assert_eq!(
            regions,
            [
                (SectionKind::Analysis, 450, 6),
                (SectionKind::FinishedProduct, 350, 4),
                (SectionKind::Continuation, 450, 6),
            ]
        );
        assert_eq!(image.hsv_lower, [20, 80, 80]);
        assert_eq!(image.min_area, 50_000);
    }
}
