//! One interface over the two kinds of section input.

use zafra_layout::ReportLayout;
use zafra_report_models::{Indicator, IndicatorGroup, RawRow, SectionKind};

use crate::{structured, text};

/// Rows of one report section that can be mapped onto the layout's schema.
///
/// Implemented by [`GridSection`] (column-aligned cells from a structural
/// extractor or a validated sheet) and [`TextSection`] (recognized text).
pub trait SectionSource {
    /// Today and to-date analysis indicators.
    fn analysis(&self, layout: &ReportLayout) -> (Vec<Indicator>, Vec<Indicator>);

    /// Finished-product indicators, one per metric.
    fn finished_product(&self, layout: &ReportLayout) -> Vec<Indicator>;

    /// Continuation indicators, one per sugar type.
    fn continuation(&self, layout: &ReportLayout) -> Vec<Indicator>;

    /// Output groups for this input read as section `kind`.
    fn groups(&self, kind: SectionKind, layout: &ReportLayout) -> Vec<IndicatorGroup> {
        let lists = match kind {
            SectionKind::Analysis => {
                let (today, to_date) = self.analysis(layout);
                vec![today, to_date]
            }
            SectionKind::FinishedProduct => vec![self.finished_product(layout)],
            SectionKind::Continuation => vec![self.continuation(layout)],
        };

        kind.groups()
            .iter()
            .zip(lists)
            .map(|(&name, indicators)| IndicatorGroup::new(name, indicators))
            .collect()
    }
}

/// Column-aligned rows.
#[derive(Debug, Clone, Copy)]
pub struct GridSection<'a>(pub &'a [RawRow]);

impl SectionSource for GridSection<'_> {
    fn analysis(&self, layout: &ReportLayout) -> (Vec<Indicator>, Vec<Indicator>) {
        structured::map_analysis(self.0, &layout.analysis)
    }

    fn finished_product(&self, layout: &ReportLayout) -> Vec<Indicator> {
        structured::map_finished_product(self.0, &layout.finished_product)
    }

    fn continuation(&self, layout: &ReportLayout) -> Vec<Indicator> {
        structured::map_continuation(self.0, &layout.continuation)
    }
}

/// Recognized text lines.
#[derive(Debug, Clone, Default)]
pub struct TextSection<'a> {
    lines: Vec<&'a str>,
}

impl<'a> TextSection<'a> {
    /// Wraps already-split lines.
    #[must_use]
    pub const fn new(lines: Vec<&'a str>) -> Self {
        Self { lines }
    }

    /// Splits a block of text into lines.
    #[must_use]
    pub fn from_text(text: &'a str) -> Self {
        Self::new(text.lines().collect())
    }
}

impl SectionSource for TextSection<'_> {
    fn analysis(&self, layout: &ReportLayout) -> (Vec<Indicator>, Vec<Indicator>) {
        text::map_analysis(&self.lines, layout)
    }

    fn finished_product(&self, layout: &ReportLayout) -> Vec<Indicator> {
        text::map_finished_product(&self.lines, layout)
    }

    fn continuation(&self, layout: &ReportLayout) -> Vec<Indicator> {
        text::map_continuation(&self.lines, layout)
    }
}
