//! Rebuilds the section schemas from recognized text lines.
//!
//! Recognized text has no reliable columns, so each line is split into
//! whitespace tokens: the tokens before the first numeric one form the
//! description, numeric tokens are values in reading order, and anything
//! after the values began is noise. Values are then assigned to fields by
//! their token position.

use std::sync::LazyLock;

use regex::Regex;
use zafra_layout::{FieldBinding, FinishedProductLayout, ReportLayout, TextRules};
use zafra_report_models::{CellValue, Indicator};

use crate::normalize::{normalize, valid_description};

/// Breaks inside a metric-title line that always separate two titles.
static HEADER_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[+\s*").expect("valid regex"));

/// Trimmed non-blank lines, with `|` borders replaced by spaces, that pass
/// the start, stop, and skip rules in that order of precedence.
fn kept_lines(lines: &[&str], rules: &TextRules) -> Vec<String> {
    let mut started = rules.start_after.is_none();
    let mut kept = Vec::new();

    for raw in lines.iter().copied().map(str::trim) {
        if raw.is_empty() {
            continue;
        }
        let clean = raw.replace('|', " ");

        if rules.stop_at.as_ref().is_some_and(|f| f.matches(&clean)) {
            break;
        }
        if !started {
            started = rules.start_after.as_ref().is_some_and(|f| f.matches(&clean));
            continue;
        }
        if rules.skip.iter().any(|f| f.matches(&clean)) {
            continue;
        }

        kept.push(clean);
    }

    kept
}

fn is_value_token(token: &str, rules: &TextRules) -> bool {
    let body = if rules.dash_decimal {
        token.strip_prefix('-').unwrap_or(token)
    } else {
        token
    };
    !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.' || (rules.quoted_values && c == '"'))
}

/// Prepares a value token for [`normalize`].
fn clean_value(token: &str, rules: &TextRules) -> String {
    let value = token.replace(',', "");
    if rules.dash_decimal {
        value.replace('-', ".")
    } else {
        value
    }
}

/// A line split into its description and numeric values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedLine {
    /// Tokens before the first value, joined by single spaces.
    pub description: String,
    /// Cleaned value tokens, in reading order.
    pub values: Vec<String>,
}

/// Splits a line into description and values.
///
/// Returns `None` for lines with fewer than `rules.min_tokens` tokens, and
/// for lines that start with a value.
#[must_use]
pub fn tokenize(line: &str, rules: &TextRules) -> Option<TokenizedLine> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < rules.min_tokens {
        return None;
    }

    let split = tokens
        .iter()
        .position(|t| is_value_token(t, rules))
        .unwrap_or(tokens.len());
    if split == 0 {
        return None;
    }

    let values = tokens[split..]
        .iter()
        .filter(|t| is_value_token(t, rules))
        .map(|t| clean_value(t, rules))
        .collect();

    Some(TokenizedLine {
        description: tokens[..split].join(" "),
        values,
    })
}

/// Normalizes the value at `position`, stripping quotes for fields that
/// ask for it.
fn value_at(values: &[String], position: Option<usize>, strip_quotes: bool) -> CellValue {
    let Some(raw) = position.and_then(|p| values.get(p)) else {
        return CellValue::Null;
    };
    match normalize(Some(raw.as_str())) {
        CellValue::Text(text) if strip_quotes => {
            let stripped = text.trim_matches('"');
            if stripped.is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(stripped.to_string())
            }
        }
        value => value,
    }
}

fn bind(values: &[String], fields: &[FieldBinding]) -> Vec<(String, CellValue)> {
    fields
        .iter()
        .map(|f| (f.name.clone(), value_at(values, f.position, f.strip_quotes)))
        .collect()
}

/// Tokenized lines with a valid description.
fn described_lines(lines: &[&str], rules: &TextRules) -> Vec<(String, Vec<String>)> {
    let mut seen_values = !rules.skip_until_values;

    kept_lines(lines, rules)
        .iter()
        .filter_map(|line| tokenize(line, rules))
        .filter(|t| {
            seen_values |= !t.values.is_empty();
            seen_values
        })
        .filter_map(|t| {
            let description = valid_description(&t.description)?.to_string();
            Some((description, t.values))
        })
        .collect()
}

/// Maps recognized analysis text to today and to-date indicators.
#[must_use]
pub fn map_analysis(lines: &[&str], layout: &ReportLayout) -> (Vec<Indicator>, Vec<Indicator>) {
    let analysis = &layout.analysis;
    let (today, to_date): (Vec<_>, Vec<_>) = described_lines(lines, &analysis.text)
        .into_iter()
        .map(|(description, values)| {
            (
                Indicator::new(description.clone(), bind(&values, &analysis.today)),
                Indicator::new(description, bind(&values, &analysis.to_date)),
            )
        })
        .unzip();

    log::debug!("Recognized {} analysis lines", today.len());
    (today, to_date)
}

/// Maps recognized continuation text, one indicator per sugar type.
#[must_use]
pub fn map_continuation(lines: &[&str], layout: &ReportLayout) -> Vec<Indicator> {
    let continuation = &layout.continuation;
    let indicators: Vec<Indicator> = described_lines(lines, &continuation.text)
        .into_iter()
        .map(|(description, values)| Indicator::new(description, bind(&values, &continuation.fields)))
        .collect();

    log::debug!("Recognized {} continuation lines", indicators.len());
    indicators
}

/// Splits a metric-title line into titles.
///
/// `|` borders are read as spaces, since they also fall inside titles. A
/// `[` always separates two titles; otherwise a title starts at a `TOTAL`
/// token (unless it continues a lone `TOTAL`) or at a standalone `QQ` or
/// `AZ.` token that does not follow `TOTAL` or `QQ`.
#[must_use]
pub fn split_header_phrases(line: &str) -> Vec<String> {
    let line = line.replace('|', " ");
    let mut phrases = Vec::new();

    for part in HEADER_BREAK_RE.split(&line) {
        let tokens: Vec<&str> = part.split_whitespace().collect();
        let mut current: Vec<&str> = Vec::new();

        for (i, &token) in tokens.iter().enumerate() {
            current.push(token);
            let Some(&next) = tokens.get(i + 1) else {
                continue;
            };
            let last = token;
            let breaks = match next {
                "TOTAL" => current.len() >= 2 || last != "TOTAL",
                "QQ" | "AZ." => !matches!(last, "TOTAL" | "QQ"),
                _ => false,
            };
            if breaks {
                phrases.push(current.join(" "));
                current.clear();
            }
        }

        if !current.is_empty() {
            phrases.push(current.join(" "));
        }
    }

    phrases
}

/// Which labelled row a recognized line belongs to.
#[derive(Clone, Copy)]
enum LabelledRow {
    Standard,
    Today,
    ToDate,
}

fn labelled_row(line: &str, layout: &FinishedProductLayout) -> Option<LabelledRow> {
    let upper = line.to_uppercase();
    if upper.starts_with(layout.standard_label.to_uppercase().as_str()) {
        Some(LabelledRow::Standard)
    } else if upper.starts_with(layout.today_label.to_uppercase().as_str()) {
        Some(LabelledRow::Today)
    } else if upper.starts_with(layout.to_date_label.to_uppercase().as_str()) {
        Some(LabelledRow::ToDate)
    } else {
        None
    }
}

/// Maps recognized finished-product text.
///
/// The table is printed transposed: one title line naming the metrics,
/// then one line each for the standard, today, and to-date values. Each
/// title becomes an indicator. The standard line is missing the values
/// listed in the layout's `standard_gaps`; those read as null and later
/// standard values shift back. Without a title line the layout's metric
/// names are used; without any title or value line the result is empty.
#[must_use]
pub fn map_finished_product(lines: &[&str], layout: &ReportLayout) -> Vec<Indicator> {
    let finished = &layout.finished_product;
    let value_rules = TextRules::default();

    let mut headers: Vec<String> = Vec::new();
    let mut standard: Vec<CellValue> = Vec::new();
    let mut today: Vec<CellValue> = Vec::new();
    let mut to_date: Vec<CellValue> = Vec::new();

    for line in kept_lines(lines, &finished.text) {
        if finished.header_line.matches(&line) {
            headers.extend(split_header_phrases(&line));
            continue;
        }

        let Some(row) = labelled_row(&line, finished) else {
            continue;
        };
        let values = line
            .split_whitespace()
            .skip(1)
            .filter(|t| is_value_token(t, &value_rules))
            .map(|t| normalize(Some(t)));
        match row {
            LabelledRow::Standard => standard.extend(values),
            LabelledRow::Today => today.extend(values),
            LabelledRow::ToDate => to_date.extend(values),
        }
    }

    if headers.is_empty() {
        if standard.is_empty() && today.is_empty() && to_date.is_empty() {
            log::warn!("No finished product lines recognized");
            return Vec::new();
        }
        log::warn!("No finished product title line; using layout metric names");
        headers = finished.metrics.iter().map(|m| m.name.clone()).collect();
    }

    let pick = |values: &[CellValue], index: Option<usize>| {
        index
            .and_then(|i| values.get(i))
            .cloned()
            .unwrap_or(CellValue::Null)
    };

    headers
        .iter()
        .enumerate()
        .filter_map(|(i, header)| {
            let description = valid_description(header)?;
            Some(Indicator::new(
                description,
                vec![
                    (
                        finished.standard_field.clone(),
                        pick(&standard, finished.standard_index(i)),
                    ),
                    (finished.today_field.clone(), pick(&today, Some(i))),
                    (finished.to_date_field.clone(), pick(&to_date, Some(i))),
                ],
            ))
        })
        .collect()
}
