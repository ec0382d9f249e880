//! Parse-with-default for untyped table cells

use tracing::debug;

/// Parse a numeric cell
///
/// Trims whitespace and accepts anything `f64` accepts. Empty cells and
/// non-finite results (`NaN`, `inf`) yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        Ok(_) => {
            debug!(%raw, "parse_number: non-finite value rejected");
            None
        }
        Err(_) => {
            debug!(%raw, "parse_number: not a number");
            None
        }
    }
}

/// Parse a latitude cell, rejecting values outside `[-90, 90]`
pub fn parse_latitude(raw: &str) -> Option<f64> {
    parse_number(raw).filter(|v| (-90.0..=90.0).contains(v))
}

/// Parse a longitude cell, rejecting values outside `[-180, 180]`
pub fn parse_longitude(raw: &str) -> Option<f64> {
    parse_number(raw).filter(|v| (-180.0..=180.0).contains(v))
}

/// Parse a numeric cell, defaulting to `0` when the cell is malformed
pub(crate) fn number_or_zero(raw: &str, column: &str) -> f64 {
    match parse_number(raw) {
        Some(value) => value,
        None => {
            if !raw.trim().is_empty() {
                debug!(%raw, column, "number_or_zero: defaulting malformed cell to 0");
            }
            0.0
        }
    }
}

/// Render a number back into a cell the way a spreadsheet would show it
///
/// Whole numbers are written without a fractional part.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
