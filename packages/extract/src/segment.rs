//! Splits the merged report table into its three sections.
//!
//! The report prints three logical tables as one. Section starts are found
//! by keyword: the finished-product section begins at the first row whose
//! leading cell mentions `PRODUCTO` and `TERMINADO`; the continuation section
//! begins at the first later row whose leading cell mentions `DESCRIPCION`
//! and whose cells mention `Quintales`. Everything before the first marker is
//! analysis. Boundary rows belong to the section they introduce.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use zafra_layout::{SegmentationRules, fold_upper};
use zafra_report_models::{RawRow, SectionKind};

/// Cell borders in recognized text: `|` rules or runs of two or more spaces.
static CELL_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|+\s*|\s{2,}").expect("valid regex"));

/// A row the segmenter can inspect.
pub trait SegmentRow {
    /// First cell of the row, if it has any text.
    fn leading_cell(&self) -> Option<&str>;

    /// Every non-empty cell of the row, in column order.
    fn cell_texts(&self) -> Vec<&str>;
}

impl SegmentRow for RawRow {
    fn leading_cell(&self) -> Option<&str> {
        self.first().and_then(Option::as_deref)
    }

    fn cell_texts(&self) -> Vec<&str> {
        self.iter().flatten().map(String::as_str).collect()
    }
}

/// One line of recognized text, split into loose cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine<'a> {
    text: &'a str,
    cells: Vec<&'a str>,
}

impl<'a> TextLine<'a> {
    /// Splits `text` into cells at `|` borders and wide gaps.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let cells = CELL_BREAK_RE
            .split(text)
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .collect();
        Self { text, cells }
    }

    /// The full line.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }
}

impl SegmentRow for TextLine<'_> {
    fn leading_cell(&self) -> Option<&str> {
        self.cells.first().copied()
    }

    fn cell_texts(&self) -> Vec<&str> {
        self.cells.clone()
    }
}

/// Uppercases, folds Spanish accents, and drops everything that is not a
/// letter or digit, so `"** PRODUCTO TERMINADO **"` and
/// `"PRODUCTOTERMINADO"` compare equal.
#[must_use]
pub fn normalize_marker(text: &str) -> String {
    fold_upper(text)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Row indices where the later sections begin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boundaries {
    /// First row of the finished-product section.
    pub finished_product: Option<usize>,
    /// First row of the continuation section. Only set when
    /// `finished_product` is.
    pub continuation: Option<usize>,
}

impl Boundaries {
    /// Row range of `kind` in a sequence of `len` rows, or `None` if the
    /// section is absent.
    #[must_use]
    pub fn range(&self, kind: SectionKind, len: usize) -> Option<Range<usize>> {
        match kind {
            SectionKind::Analysis => Some(0..self.finished_product.unwrap_or(len)),
            SectionKind::FinishedProduct => self
                .finished_product
                .map(|start| start..self.continuation.unwrap_or(len)),
            SectionKind::Continuation => self.continuation.map(|start| start..len),
        }
    }
}

/// Locates the section boundaries in `rows`.
#[must_use]
pub fn find_boundaries<R: SegmentRow>(rows: &[R], rules: &SegmentationRules) -> Boundaries {
    let finished_keywords: Vec<String> = rules
        .finished_product_marker
        .iter()
        .map(|kw| normalize_marker(kw))
        .collect();
    let continuation_keyword = normalize_marker(&rules.continuation_marker);
    let row_token = fold_upper(&rules.continuation_row_token);

    let leading = |row: &R| row.leading_cell().map(normalize_marker).unwrap_or_default();

    let finished_product = rows.iter().position(|row| {
        let cell = leading(row);
        finished_keywords.iter().all(|kw| cell.contains(kw.as_str()))
    });

    let continuation = finished_product.and_then(|start| {
        let after = start + 1;
        rows[after..]
            .iter()
            .position(|row| {
                leading(row).contains(continuation_keyword.as_str())
                    && row
                        .cell_texts()
                        .iter()
                        .any(|cell| fold_upper(cell).contains(row_token.as_str()))
            })
            .map(|i| after + i)
    });

    Boundaries {
        finished_product,
        continuation,
    }
}

/// A sequence of rows split into sections.
#[derive(Debug, Clone, Copy)]
pub struct Sections<'a, R> {
    rows: &'a [R],
    boundaries: Boundaries,
}

impl<'a, R> Sections<'a, R> {
    /// Rows of `kind`, or `None` if the section is absent.
    #[must_use]
    pub fn get(&self, kind: SectionKind) -> Option<&'a [R]> {
        self.boundaries
            .range(kind, self.rows.len())
            .map(|range| &self.rows[range])
    }

    /// Present sections in report order.
    pub fn present(&self) -> impl Iterator<Item = (SectionKind, &'a [R])> + '_ {
        SectionKind::ALL
            .iter()
            .filter_map(|&kind| self.get(kind).map(|rows| (kind, rows)))
    }

    /// Where the sections begin.
    #[must_use]
    pub const fn boundaries(&self) -> Boundaries {
        self.boundaries
    }
}

/// Splits `rows` into sections using the layout's keyword rules.
#[must_use]
pub fn segment<'a, R: SegmentRow>(rows: &'a [R], rules: &SegmentationRules) -> Sections<'a, R> {
    let boundaries = find_boundaries(rows, rules);
    log::debug!(
        "Segmented {} rows: finished product at {:?}, continuation at {:?}",
        rows.len(),
        boundaries.finished_product,
        boundaries.continuation,
    );
    Sections { rows, boundaries }
}

#[cfg(test)]
mod tests {
    use zafra_layout::default_layout;

    use super::*;

    fn row(cells: &[&str]) -> RawRow {
        cells
            .iter()
            .map(|c| if c.is_empty() { None } else { Some((*c).to_string()) })
            .collect()
    }

    fn report_rows() -> Vec<RawRow> {
        vec![
            row(&["ANALISIS", "HOY", "", "HASTA"]),
            row(&["", "BRIX", "SAC"]),
            row(&["Jugo Mixto", "", "", "85.2"]),
            row(&["Meladura", "", "", "60.1"]),
            row(&["** PRODUCTO TERMINADO (AZUCAR) **"]),
            row(&["ESTANDAR/DIA", "100"]),
            row(&["HOY", "90"]),
            row(&["HASTA", "900"]),
            row(&["DESCRIPCION", "", "Quintales", "% HUM."]),
            row(&["Crudo", "", "1,200"]),
        ]
    }

    #[test]
    fn splits_into_ordered_contiguous_sections() {
        let rows = report_rows();
        let layout = default_layout();
        let sections = segment(&rows, &layout.segmentation);

        let bounds = sections.boundaries();
        assert_eq!(bounds.finished_product, Some(4));
        assert_eq!(bounds.continuation, Some(8));

        let lens: Vec<(SectionKind, usize)> =
            sections.present().map(|(k, rows)| (k, rows.len())).collect();
        assert_eq!(
            lens,
            [
                (SectionKind::Analysis, 4),
                (SectionKind::FinishedProduct, 4),
                (SectionKind::Continuation, 2),
            ]
        );
        let total: usize = lens.iter().map(|(_, n)| n).sum();
        assert_eq!(total, rows.len());
    }

    #[test]
    fn no_marker_means_everything_is_analysis() {
        let rows: Vec<RawRow> = report_rows().into_iter().take(4).collect();
        let layout = default_layout();
        let sections = segment(&rows, &layout.segmentation);

        let present: Vec<SectionKind> = sections.present().map(|(k, _)| k).collect();
        assert_eq!(present, [SectionKind::Analysis]);
        assert_eq!(sections.get(SectionKind::Analysis).map(<[_]>::len), Some(4));
    }

    #[test]
    fn continuation_marker_before_finished_product_is_ignored() {
        let mut rows = report_rows();
        rows.insert(1, row(&["DESCRIPCION", "Quintales"]));
        rows.truncate(9);
        let layout = default_layout();
        let bounds = find_boundaries(&rows, &layout.segmentation);

        assert_eq!(bounds.finished_product, Some(5));
        assert_eq!(bounds.continuation, None);
        assert_eq!(bounds.range(SectionKind::FinishedProduct, rows.len()), Some(5..9));
    }

    #[test]
    fn continuation_needs_quintales_in_the_row() {
        let mut rows = report_rows();
        rows[8] = row(&["DESCRIPCION", "", "% HUM."]);
        let layout = default_layout();
        let bounds = find_boundaries(&rows, &layout.segmentation);
        assert_eq!(bounds.continuation, None);
    }

    #[test]
    fn text_lines_split_on_borders_and_gaps() {
        let line = TextLine::new("| Jugo Mixto |  85.2   14.1| 97.3");
        assert_eq!(line.cell_texts(), ["Jugo Mixto", "85.2", "14.1", "97.3"]);
        assert_eq!(line.leading_cell(), Some("Jugo Mixto"));
    }

    #[test]
    fn segments_text_lines() {
        let text = "ANALISIS\nJugo Mixto 85.2\nPRODUCTO TERMINADO (AZUCAR)\nHOY 1 2\n\
                    DESCRIPCIÓN   Quintales  % HUM.\nCrudo 1,200";
        let lines: Vec<TextLine> = text.lines().map(TextLine::new).collect();
        let layout = default_layout();
        let bounds = find_boundaries(&lines, &layout.segmentation);
        assert_eq!(bounds.finished_product, Some(2));
        assert_eq!(bounds.continuation, Some(4));
    }

    #[test]
    fn marker_normalization() {
        assert_eq!(normalize_marker("* Producto  Terminado *"), "PRODUCTOTERMINADO");
        assert_eq!(normalize_marker("Descripción"), "DESCRIPCION");
    }
}
