//! Cell text to typed value coercion.

use zafra_report_models::CellValue;

/// Characters that make up visual separator rows (`-----`, `____`, ...).
const SEPARATOR_CHARS: &[char] = &['—', '-', '_', '=', '*', '\t', ' '];

/// Coerces one cell's text into a typed value.
///
/// 1. Missing, blank, or `nan` (any case) becomes [`CellValue::Null`]
/// 2. Surrounding whitespace and thousands-separator commas are removed
/// 3. Text containing `.` is parsed as `f64`, anything else as `i64`
/// 4. If parsing fails the cleaned text is kept as [`CellValue::Text`]
///
/// Never fails.
#[must_use]
pub fn normalize(cell: Option<&str>) -> CellValue {
    let Some(raw) = cell else {
        return CellValue::Null;
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return CellValue::Null;
    }

    let cleaned = trimmed.replace(',', "");
    let parsed = if cleaned.contains('.') {
        cleaned.parse::<f64>().ok().map(CellValue::Float)
    } else {
        cleaned.parse::<i64>().ok().map(CellValue::Int)
    };

    parsed.unwrap_or_else(|| {
        if cleaned.is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(cleaned)
        }
    })
}

/// Returns the trimmed description if it names a real indicator row.
///
/// Rejects empty text, `nan`, single characters, and separator rows made
/// only of dashes, underscores, equals signs, asterisks, or whitespace.
#[must_use]
pub fn valid_description(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.chars().count() < 2
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.chars().all(|c| SEPARATOR_CHARS.contains(&c))
    {
        return None;
    }
    Some(trimmed)
}
