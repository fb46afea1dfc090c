//! Maps grid rows onto named fields using the layout's column bindings.
//!
//! Header rows are skipped rather than interpreted; every field is read
//! from a fixed, calibrated column. Columns past the end of a row read as
//! null.

use zafra_layout::{AnalysisLayout, ContinuationLayout, FieldBinding, FinishedProductLayout};
use zafra_report_models::{CellValue, Indicator, RawRow};

use crate::normalize::{normalize, valid_description};
use crate::segment::SegmentRow as _;

fn cell(row: &RawRow, column: usize) -> Option<&str> {
    row.get(column).and_then(Option::as_deref)
}

fn bind(row: &RawRow, fields: &[FieldBinding]) -> Vec<(String, CellValue)> {
    fields
        .iter()
        .map(|field| (field.name.clone(), normalize(cell(row, field.column))))
        .collect()
}

fn row_description(row: &RawRow) -> Option<&str> {
    row.leading_cell().and_then(valid_description)
}

/// Maps analysis rows to today and to-date indicators.
///
/// Both lists come from the same rows, so they always pair up position by
/// position with equal descriptions.
#[must_use]
pub fn map_analysis(rows: &[RawRow], layout: &AnalysisLayout) -> (Vec<Indicator>, Vec<Indicator>) {
    let (today, to_date): (Vec<_>, Vec<_>) = rows
        .iter()
        .skip(layout.header_rows)
        .filter_map(|row| {
            let description = row_description(row)?;
            Some((
                Indicator::new(description, bind(row, &layout.today)),
                Indicator::new(description, bind(row, &layout.to_date)),
            ))
        })
        .unzip();

    log::debug!("Mapped {} analysis rows", today.len());
    (today, to_date)
}

/// The standard, today, and to-date rows of the finished-product table.
struct LabelledRows<'a> {
    standard: &'a RawRow,
    today: &'a RawRow,
    to_date: &'a RawRow,
}

/// Finds the three labelled rows. The to-date row only counts once the
/// today row has been seen, and scanning stops there.
fn find_labelled_rows<'a>(
    rows: &'a [RawRow],
    layout: &FinishedProductLayout,
) -> Option<LabelledRows<'a>> {
    let standard_label = layout.standard_label.to_uppercase();
    let today_label = layout.today_label.to_uppercase();
    let to_date_label = layout.to_date_label.to_uppercase();

    let mut standard = None;
    let mut today = None;

    for row in rows {
        let first = row
            .leading_cell()
            .map(|c| c.trim().to_uppercase())
            .unwrap_or_default();

        if first.contains(standard_label.as_str()) {
            standard = Some(row);
        } else if first == today_label {
            today = Some(row);
        } else if first == to_date_label && today.is_some() {
            return Some(LabelledRows {
                standard: standard?,
                today: today?,
                to_date: row,
            });
        }
    }

    None
}

fn is_numeric(text: &str) -> bool {
    matches!(
        normalize(Some(text)),
        CellValue::Int(_) | CellValue::Float(_)
    )
}

/// Columns of the labelled rows that hold numbers, standard row first.
fn estimate_columns(rows: &LabelledRows<'_>) -> Vec<usize> {
    let numeric = |row: &RawRow| -> Vec<usize> {
        row.iter()
            .enumerate()
            .skip(1)
            .filter(|(_, c)| c.as_deref().is_some_and(is_numeric))
            .map(|(i, _)| i)
            .collect()
    };

    let mut columns = numeric(rows.standard);
    for extra in [numeric(rows.today), numeric(rows.to_date)] {
        for column in extra {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }
    columns.sort_unstable();
    columns
}

/// Maps the finished-product table, transposing it so each metric becomes
/// one indicator with its standard, today, and to-date values.
///
/// Returns an empty list when any of the three labelled rows is missing.
#[must_use]
pub fn map_finished_product(rows: &[RawRow], layout: &FinishedProductLayout) -> Vec<Indicator> {
    let Some(labelled) = find_labelled_rows(rows, layout) else {
        log::warn!(
            "Finished product rows ({}, {}, {}) not all found in {} rows",
            layout.standard_label,
            layout.today_label,
            layout.to_date_label,
            rows.len(),
        );
        return Vec::new();
    };

    let estimated = if layout.metrics.iter().all(|m| m.column.is_some()) {
        Vec::new()
    } else {
        let columns = estimate_columns(&labelled);
        log::debug!("Estimated finished product columns {columns:?}");
        columns
    };

    layout
        .metrics
        .iter()
        .enumerate()
        .map(|(position, metric)| {
            let column = metric.column.or_else(|| estimated.get(position).copied());
            let value = |row: &RawRow| column.map_or(CellValue::Null, |c| normalize(cell(row, c)));
            Indicator::new(
                metric.name.clone(),
                vec![
                    (layout.standard_field.clone(), value(labelled.standard)),
                    (layout.today_field.clone(), value(labelled.today)),
                    (layout.to_date_field.clone(), value(labelled.to_date)),
                ],
            )
        })
        .collect()
}

/// Maps continuation rows, one indicator per sugar type.
#[must_use]
pub fn map_continuation(rows: &[RawRow], layout: &ContinuationLayout) -> Vec<Indicator> {
    let indicators: Vec<Indicator> = rows
        .iter()
        .skip(layout.header_rows)
        .filter_map(|row| {
            let description = row_description(row)?;
            Some(Indicator::new(description, bind(row, &layout.fields)))
        })
        .collect();

    log::debug!("Mapped {} continuation rows", indicators.len());
    indicators
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use zafra_layout::default_layout;

    use super::*;

    fn row(cells: &[&str]) -> RawRow {
        cells
            .iter()
            .map(|c| if c.is_empty() { None } else { Some((*c).to_string()) })
            .collect()
    }

    /// Builds a 21-column row with the given `(column, text)` cells.
    fn sparse(description: &str, cells: &[(usize, &str)]) -> RawRow {
        let mut out: RawRow = vec![None; 21];
        out[0] = Some(description.to_string());
        for (i, text) in cells {
            out[*i] = Some((*text).to_string());
        }
        out
    }

    #[test]
    fn analysis_row_maps_to_today_and_to_date() {
        let layout = default_layout();
        let rows = vec![
            row(&["ANALISIS"]),
            row(&["", "", "", "BRIX", "SAC"]),
            sparse(
                "Jugo Mixto",
                &[
                    (3, "85.2"),
                    (4, "14.1"),
                    (7, "97.3"),
                    (9, "84.0"),
                    (11, "13.9"),
                    (14, "96.8"),
                    (16, "1,250"),
                    (20, "n/d"),
                ],
            ),
        ];

        let (today, to_date) = map_analysis(&rows, &layout.analysis);

        assert_eq!(
            serde_json::to_value(&today).unwrap(),
            json!([{
                "DESCRIPCION": "Jugo Mixto",
                "BRIX": 85.2,
                "SAC": 14.1,
                "PZA": 97.3,
                "COLOR": 1250,
                "PH": null,
                "GR": "n/d"
            }])
        );
        assert_eq!(
            serde_json::to_value(&to_date).unwrap(),
            json!([{"DESCRIPCION": "Jugo Mixto", "BRIX": 84.0, "SAC": 13.9, "PZA": 96.8}])
        );
    }

    #[test]
    fn analysis_skips_headers_and_separator_rows() {
        let layout = default_layout();
        let rows = vec![
            row(&["Jugo Header"]),
            row(&["Second Header"]),
            row(&["----"]),
            row(&["___"]),
            row(&["x"]),
            row(&[]),
            row(&["Meladura", "", "", "60.1"]),
            row(&["Miel Final", "", "", "85"]),
        ];

        let (today, to_date) = map_analysis(&rows, &layout.analysis);

        let names: Vec<&str> = today.iter().map(Indicator::description).collect();
        assert_eq!(names, ["Meladura", "Miel Final"]);
        assert_eq!(today.len(), to_date.len());
        for (hoy, hasta) in today.iter().zip(&to_date) {
            assert_eq!(hoy.description(), hasta.description());
        }
    }

    #[test]
    fn short_rows_read_missing_columns_as_null() {
        let layout = default_layout();
        let rows = vec![row(&[]), row(&[]), row(&["Jugo Claro", "", "", "15.5"])];

        let (today, _) = map_analysis(&rows, &layout.analysis);

        assert_eq!(today[0].get("BRIX"), Some(&CellValue::Float(15.5)));
        assert_eq!(today[0].get("GR"), Some(&CellValue::Null));
        let names: Vec<&str> = today[0].field_names().collect();
        assert_eq!(names, ["BRIX", "SAC", "PZA", "COLOR", "PH", "GR"]);
    }

    fn finished_rows() -> Vec<RawRow> {
        vec![
            row(&["PRODUCTO TERMINADO (AZUCAR)"]),
            row(&["", "TOTAL QQ CRUDA", "TOTAL QQ ESTAN."]),
            sparse(
                "ESTANDAR/DIA",
                &[(1, "1,000"), (2, "2,000"), (5, "3,000"), (8, "6,000"), (17, "6,500")],
            ),
            sparse(
                "HOY",
                &[
                    (1, "900"),
                    (2, "1,800"),
                    (5, "2,700"),
                    (8, "5,400"),
                    (11, "120.5"),
                    (14, "80"),
                    (17, "5,600.5"),
                ],
            ),
            sparse("HASTA", &[(1, "9,000"), (8, "54,000"), (17, "56,000")]),
        ]
    }

    #[test]
    fn finished_product_transposes_labelled_rows() {
        let layout = default_layout();
        let indicators = map_finished_product(&finished_rows(), &layout.finished_product);

        let names: Vec<&str> = indicators.iter().map(Indicator::description).collect();
        assert_eq!(
            names,
            [
                "TOTAL QQ CRUDA",
                "TOTAL QQ ESTAN.",
                "TOTAL QQ REFIN.",
                "QQ PRODUCIDOS",
                "AZ. EQUIV. (MIEL)",
                "AZ. PMR",
                "TOTAL QUINTALES"
            ]
        );
        assert_eq!(
            serde_json::to_value(&indicators[0]).unwrap(),
            json!({"DESCRIPCION": "TOTAL QQ CRUDA", "ESTANDAR/DIA": 1000, "HOY": 900, "HASTA": 9000})
        );
        assert_eq!(
            serde_json::to_value(&indicators[4]).unwrap(),
            json!({"DESCRIPCION": "AZ. EQUIV. (MIEL)", "ESTANDAR/DIA": null, "HOY": 120.5, "HASTA": null})
        );
        assert_eq!(indicators[6].get("HOY"), Some(&CellValue::Float(5600.5)));
    }

    #[test]
    fn finished_product_needs_to_date_after_today() {
        let layout = default_layout();
        let mut rows = finished_rows();
        rows.pop();
        assert!(map_finished_product(&rows, &layout.finished_product).is_empty());

        // HASTA before HOY does not count
        let mut rows = finished_rows();
        let hasta = rows.remove(4);
        rows.insert(2, hasta);
        assert!(map_finished_product(&rows, &layout.finished_product).is_empty());
    }

    #[test]
    fn finished_product_needs_standard_row() {
        let layout = default_layout();
        let mut rows = finished_rows();
        rows.remove(2);
        assert!(map_finished_product(&rows, &layout.finished_product).is_empty());
    }

    #[test]
    fn finished_product_estimates_uncalibrated_columns() {
        let mut layout = default_layout().finished_product;
        for metric in &mut layout.metrics {
            metric.column = None;
        }

        let indicators = map_finished_product(&finished_rows(), &layout);

        let today: Vec<Option<&CellValue>> = indicators.iter().map(|i| i.get("HOY")).collect();
        assert_eq!(
            today,
            [
                Some(&CellValue::Int(900)),
                Some(&CellValue::Int(1800)),
                Some(&CellValue::Int(2700)),
                Some(&CellValue::Int(5400)),
                Some(&CellValue::Float(120.5)),
                Some(&CellValue::Int(80)),
                Some(&CellValue::Float(5600.5))
            ]
        );
    }

    #[test]
    fn continuation_maps_eleven_fields() {
        let layout = default_layout();
        let rows = vec![
            row(&["DESCRIPCION", "", "Quintales", "", "% HUM."]),
            sparse(
                "Crudo",
                &[
                    (2, "1,200"),
                    (4, "0.05"),
                    (6, "0.10"),
                    (8, "99.1"),
                    (9, "850"),
                    (10, "10.5"),
                    (11, "0.8"),
                    (13, "30"),
                    (14, "A"),
                    (15, "40"),
                    (16, "3"),
                ],
            ),
            row(&["====="]),
        ];

        let indicators = map_continuation(&rows, &layout.continuation);

        assert_eq!(indicators.len(), 1);
        assert_eq!(
            serde_json::to_value(&indicators[0]).unwrap(),
            json!({
                "DESCRIPCION": "Crudo",
                "Quintales": 1200,
                "% HUM.": 0.05,
                "% CEN.": 0.1,
                "% POL.": 99.1,
                "COLOR": 850,
                "Mg/kg Vit.\"A\"": 10.5,
                "T. GRANO": 0.8,
                "% C.V": 30,
                "FS": "A",
                "TEMP. ºC.": 40,
                "SED.": 3
            })
        );
    }
}
