#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report layouts: where each named field lives in a given report template.
//!
//! A [`ReportLayout`] binds every output field to a grid column (structural
//! path) and a numeric-token position (text path), and carries the keyword
//! rules used to segment and filter rows plus the parameters of the
//! scanned-image region locator. Layouts are TOML files embedded in the
//! binary; see [`registry`].

pub mod registry;

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use zafra_report_models::SectionKind;

pub use registry::{DEFAULT_LAYOUT_ID, all_layouts, default_layout, layout_by_id};

/// Errors that can occur while loading a layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Layout file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Layout TOML is malformed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Layout parsed but is internally inconsistent.
    #[error("Invalid layout '{id}': {message}")]
    Invalid {
        /// Layout identifier.
        id: String,
        /// What is wrong with it.
        message: String,
    },

    /// No embedded layout has the requested identifier.
    #[error("Unknown layout: {0}")]
    Unknown(String),
}

// ── Top-level layout ─────────────────────────────────────────────────────

/// A named, versioned report template.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportLayout {
    /// Unique identifier (e.g., `"informe_diario_v1"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Template revision.
    pub version: u32,
    /// Keyword rules that split the merged table into sections.
    pub segmentation: SegmentationRules,
    /// Analysis section bindings.
    pub analysis: AnalysisLayout,
    /// Finished-product section bindings.
    pub finished_product: FinishedProductLayout,
    /// Continuation section bindings.
    pub continuation: ContinuationLayout,
    /// Scanned-image region parameters.
    pub image: ImageLayout,
}

// ── Segmentation ─────────────────────────────────────────────────────────

/// Keywords that mark where the finished-product and continuation sections
/// begin.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationRules {
    /// Every keyword must appear in the normalized leading cell.
    pub finished_product_marker: Vec<String>,
    /// Keyword that must appear in the leading cell of the continuation
    /// header row.
    pub continuation_marker: String,
    /// Keyword that must appear somewhere in the continuation header row.
    pub continuation_row_token: String,
}

// ── Field bindings ───────────────────────────────────────────────────────

/// Where one output field lives.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldBinding {
    /// Output field name.
    pub name: String,
    /// Zero-based grid column.
    pub column: usize,
    /// Zero-based index into a text line's numeric tokens. `None` means the
    /// field is never recovered from text and is always null there.
    #[serde(default)]
    pub position: Option<usize>,
    /// Strip `"` from the token when it does not parse as a number.
    #[serde(default)]
    pub strip_quotes: bool,
}

/// Analysis section: one row per material, read twice (today and to-date).
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisLayout {
    /// Leading grid rows that hold column titles.
    pub header_rows: usize,
    /// Fields of the `ANALISIS - HOY` group.
    pub today: Vec<FieldBinding>,
    /// Fields of the `ANALISIS - HASTA` group.
    pub to_date: Vec<FieldBinding>,
    /// Text-path line rules.
    #[serde(default)]
    pub text: TextRules,
}

/// One finished-product metric (a column of the transposed table).
#[derive(Debug, Clone, Deserialize)]
pub struct MetricBinding {
    /// Metric name, used as `DESCRIPCION`.
    pub name: String,
    /// Zero-based grid column. When absent the column is estimated from the
    /// numeric cells of the standard row.
    #[serde(default)]
    pub column: Option<usize>,
}

/// Finished-product section: three labelled rows, transposed so that each
/// metric becomes one indicator.
#[derive(Debug, Clone, Deserialize)]
pub struct FinishedProductLayout {
    /// Substring identifying the standard-per-day row.
    pub standard_label: String,
    /// Exact leading cell of the today row.
    pub today_label: String,
    /// Exact leading cell of the to-date row.
    pub to_date_label: String,
    /// Output field holding the standard value.
    pub standard_field: String,
    /// Output field holding today's value.
    pub today_field: String,
    /// Output field holding the to-date value.
    pub to_date_field: String,
    /// Metric positions with no value on the recognized standard line. Later
    /// values on that line shift back by the number of gaps before them.
    #[serde(default)]
    pub standard_gaps: Vec<usize>,
    /// Metrics in output order.
    pub metrics: Vec<MetricBinding>,
    /// Text-path line rules.
    #[serde(default)]
    pub text: TextRules,
    /// Identifies the recognized line that carries the metric titles.
    pub header_line: LineFilter,
}

impl FinishedProductLayout {
    /// Maps a metric position onto the standard line's value index.
    ///
    /// Returns `None` for positions listed in [`Self::standard_gaps`].
    #[must_use]
    pub fn standard_index(&self, position: usize) -> Option<usize> {
        if self.standard_gaps.contains(&position) {
            return None;
        }
        let shift = self.standard_gaps.iter().filter(|&&g| g < position).count();
        Some(position - shift)
    }
}

/// Continuation section: one row per sugar type with quality metrics.
#[derive(Debug, Clone, Deserialize)]
pub struct ContinuationLayout {
    /// Leading grid rows that hold column titles.
    pub header_rows: usize,
    /// Fields in output order.
    pub fields: Vec<FieldBinding>,
    /// Text-path line rules.
    #[serde(default)]
    pub text: TextRules,
}

// ── Text rules ───────────────────────────────────────────────────────────

/// How recognized text lines of one section are filtered and tokenized.
#[derive(Debug, Clone, Deserialize)]
pub struct TextRules {
    /// Lines before (and including) the first match are ignored. When no
    /// line matches, the section yields nothing.
    #[serde(default)]
    pub start_after: Option<LineFilter>,
    /// Processing stops at the first matching line.
    #[serde(default)]
    pub stop_at: Option<LineFilter>,
    /// Matching lines are skipped.
    #[serde(default)]
    pub skip: Vec<LineFilter>,
    /// Lines with fewer tokens are skipped.
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
    /// A leading `-` on a numeric token is a misread decimal point.
    #[serde(default)]
    pub dash_decimal: bool,
    /// Numeric tokens may carry `"` characters.
    #[serde(default)]
    pub quoted_values: bool,
    /// Lines without values are skipped until the first line that has some.
    #[serde(default)]
    pub skip_until_values: bool,
}

const fn default_min_tokens() -> usize {
    2
}

impl Default for TextRules {
    fn default() -> Self {
        Self {
            start_after: None,
            stop_at: None,
            skip: Vec::new(),
            min_tokens: default_min_tokens(),
            dash_decimal: false,
            quoted_values: false,
            skip_until_values: false,
        }
    }
}

/// Uppercases `text` and strips the Spanish accents (`Ñ` is kept).
#[must_use]
pub fn fold_upper(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' | 'Ü' => 'U',
            other => other,
        })
        .collect()
}

/// Keyword predicate over one text line.
///
/// Keywords are compared against the line after [`fold_upper`], so
/// `DESCRIPCION` also matches `Descripción`. Every populated condition must
/// hold for the filter to match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineFilter {
    /// Every keyword must appear.
    #[serde(default)]
    pub all: Vec<String>,
    /// Each group must have at least one keyword present.
    #[serde(default)]
    pub any_of: Vec<Vec<String>>,
    /// No keyword may appear.
    #[serde(default)]
    pub none: Vec<String>,
    /// The line must have fewer whitespace-separated tokens than this.
    #[serde(default)]
    pub fewer_tokens_than: Option<usize>,
}

impl LineFilter {
    /// Returns `true` if `line` satisfies every condition.
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        let folded = fold_upper(line);
        let has = |kw: &String| folded.contains(fold_upper(kw).as_str());

        self.all.iter().all(has)
            && self.any_of.iter().all(|group| group.iter().any(has))
            && !self.none.iter().any(has)
            && self
                .fewer_tokens_than
                .is_none_or(|limit| line.split_whitespace().count() < limit)
    }
}

// ── Image regions ────────────────────────────────────────────────────────

/// Parameters of the header-color region locator.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageLayout {
    /// Inclusive lower HSV bound (H on a 0-180 scale).
    pub hsv_lower: [u8; 3],
    /// Inclusive upper HSV bound.
    pub hsv_upper: [u8; 3],
    /// Regions with this many pixels or fewer are ignored.
    pub min_area: u32,
    /// Horizontal margin added on each side of a header.
    pub pad_x: u32,
    /// Margin added above a header.
    pub pad_top: u32,
    /// Added to a region's expansion to get the crop height.
    pub extra_height: u32,
    /// Per-region crop and OCR settings, top to bottom.
    pub regions: Vec<RegionLayout>,
}

/// Crop and OCR settings for the n-th header region.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionLayout {
    /// Section read from this region.
    pub section: SectionKind,
    /// How far below the header the table extends, in pixels.
    pub expansion: u32,
    /// Tesseract page segmentation mode.
    pub psm: u8,
}

// ── Loading ──────────────────────────────────────────────────────────────

impl ReportLayout {
    /// Checks the layout for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Invalid`] if a field name repeats within a
    /// group, a section has no fields, the image regions do not follow
    /// section order, or the HSV bounds are inverted.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let invalid = |message: String| LayoutError::Invalid {
            id: self.id.clone(),
            message,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id".to_string()));
        }
        if self.segmentation.finished_product_marker.is_empty() {
            return Err(invalid("finished_product_marker is empty".to_string()));
        }

        let groups: [(&str, Vec<&str>); 4] = [
            (
                "analysis.today",
                self.analysis.today.iter().map(|f| f.name.as_str()).collect(),
            ),
            (
                "analysis.to_date",
                self.analysis.to_date.iter().map(|f| f.name.as_str()).collect(),
            ),
            (
                "finished_product.metrics",
                self.finished_product
                    .metrics
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect(),
            ),
            (
                "continuation.fields",
                self.continuation
                    .fields
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect(),
            ),
        ];
        for (group, names) in &groups {
            if names.is_empty() {
                return Err(invalid(format!("{group} has no fields")));
            }
            let unique: BTreeSet<&str> = names.iter().copied().collect();
            if unique.len() != names.len() {
                return Err(invalid(format!("{group} repeats a field name")));
            }
        }

        if self
            .image
            .hsv_lower
            .iter()
            .zip(&self.image.hsv_upper)
            .any(|(lo, hi)| lo > hi)
        {
            return Err(invalid("hsv_lower exceeds hsv_upper".to_string()));
        }
        if self
            .image
            .regions
            .windows(2)
            .any(|w| w[0].section >= w[1].section)
        {
            return Err(invalid("image regions are not in section order".to_string()));
        }

        Ok(())
    }
}

/// Parses and validates a layout from TOML text.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or the layout is invalid.
pub fn parse_layout_toml(toml_str: &str) -> Result<ReportLayout, LayoutError> {
    let layout: ReportLayout = toml::de::from_str(toml_str)?;
    layout.validate()?;
    Ok(layout)
}

/// Loads a layout from a TOML file on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or is not a valid layout.
pub fn load_layout_file(path: &Path) -> Result<ReportLayout, LayoutError> {
    log::debug!("Loading layout from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    parse_layout_toml(&text)
}
