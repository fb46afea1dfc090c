#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Typed indicator records and the section taxonomy of the daily lab report.
//!
//! The report is one merged table holding three logical sub-tables. Every
//! extraction path (structured grid, PDF page text, OCR'd image regions)
//! produces the same output shape: an ordered list of [`IndicatorGroup`]s,
//! each holding [`Indicator`] rows whose fields are [`CellValue`]s.

use std::io::Write;

use serde::ser::SerializeMap as _;
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// One row of a structured grid, as produced by a table extractor.
///
/// Cells are addressed by zero-based column index. `None` means the
/// extractor saw no text in that cell.
pub type RawRow = Vec<Option<String>>;

/// Name of the mandatory description field carried by every [`Indicator`].
pub const DESCRIPTION_FIELD: &str = "DESCRIPCION";

/// The three logical sub-tables merged into one report table.
///
/// Sections always appear in declaration order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionKind {
    /// Per-material analysis (juices, syrups, massecuites, molasses)
    Analysis,
    /// Finished product (sugar) production totals
    FinishedProduct,
    /// Finished product quality metrics per sugar type
    Continuation,
}

impl SectionKind {
    /// All sections, in report order.
    pub const ALL: &[Self] = &[Self::Analysis, Self::FinishedProduct, Self::Continuation];

    /// Returns the output groups this section produces, in output order.
    #[must_use]
    pub const fn groups(self) -> &'static [GroupName] {
        match self {
            Self::Analysis => &[GroupName::AnalysisToday, GroupName::AnalysisToDate],
            Self::FinishedProduct => &[GroupName::FinishedProduct],
            Self::Continuation => &[GroupName::FinishedProductContinuation],
        }
    }
}

/// Fixed labels for the output groups.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum GroupName {
    /// Analysis values measured today
    #[serde(rename = "ANALISIS - HOY")]
    #[strum(serialize = "ANALISIS - HOY")]
    AnalysisToday,
    /// Analysis values accumulated to date
    #[serde(rename = "ANALISIS - HASTA")]
    #[strum(serialize = "ANALISIS - HASTA")]
    AnalysisToDate,
    /// Finished product totals (standard, today, to date)
    #[serde(rename = "PRODUCTO TERMINADO (AZUCAR)")]
    #[strum(serialize = "PRODUCTO TERMINADO (AZUCAR)")]
    FinishedProduct,
    /// Finished product quality metrics
    #[serde(rename = "PRODUCTO TERMINADO (AZUCAR) - CONTINUACIÓN")]
    #[strum(serialize = "PRODUCTO TERMINADO (AZUCAR) - CONTINUACIÓN")]
    FinishedProductContinuation,
}

impl GroupName {
    /// All group names, in output order.
    pub const ALL: &[Self] = &[
        Self::AnalysisToday,
        Self::AnalysisToDate,
        Self::FinishedProduct,
        Self::FinishedProductContinuation,
    ];
}

/// A typed cell value.
///
/// Serializes as the bare JSON scalar (`null`, integer, float or string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing, blank, or `nan` cell
    Null,
    /// Whole number (no decimal point in the source text)
    Int(i64),
    /// Number with a decimal point
    Float(f64),
    /// Text that did not parse as a number
    Text(String),
}

/// One named metric row.
///
/// Always carries a non-empty description; the remaining fields follow the
/// section schema in its declared order. Missing values are explicit
/// [`CellValue::Null`] entries, never absent keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    description: String,
    fields: Vec<(String, CellValue)>,
}

impl Indicator {
    /// Creates an indicator from its description and ordered fields.
    #[must_use]
    pub fn new(description: impl Into<String>, fields: Vec<(String, CellValue)>) -> Self {
        Self {
            description: description.into(),
            fields,
        }
    }

    /// The `DESCRIPCION` value.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Looks up a schema field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Field names in schema order, excluding `DESCRIPCION`.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for Indicator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(DESCRIPTION_FIELD, &self.description)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A named collection of indicators, one per output table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorGroup {
    /// Fixed group label.
    #[serde(rename = "Nombre Agrupador")]
    pub name: GroupName,
    /// Indicators in source row order.
    #[serde(rename = "Indicadores")]
    pub indicators: Vec<Indicator>,
}

impl IndicatorGroup {
    /// Creates a group.
    #[must_use]
    pub const fn new(name: GroupName, indicators: Vec<Indicator>) -> Self {
        Self { name, indicators }
    }
}

/// Writes groups as a UTF-8 JSON array indented with four spaces.
///
/// Non-ASCII characters are written as-is, not escaped.
///
/// # Errors
///
/// Returns an error if serialization or the underlying writer fails.
pub fn write_groups_json<W: Write>(groups: &[IndicatorGroup], writer: W) -> serde_json::Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
    groups.serialize(&mut ser)
}

/// Renders groups as the JSON text produced by [`write_groups_json`].
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn groups_to_json(groups: &[IndicatorGroup]) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    write_groups_json(groups, &mut buf)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
