//! Duration codec.
//!
//! Converts between the duration representations found in agent exports
//! (`H:MM:SS` / `M:SS` strings or plain seconds) and a seconds scalar,
//! and back to `H:MM:SS` for display.

use crate::models::Cell;

/// Seconds in one day; spreadsheet time cells are fractions of a day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Parse a cell into elapsed seconds.
///
/// Never fails: anything that is not a recognizable duration yields 0.
/// A malformed string is therefore indistinguishable from a real zero.
pub fn parse(cell: &Cell) -> f64 {
    match cell {
        Cell::Null => 0.0,
        Cell::Number(n) if n.is_nan() => 0.0,
        Cell::Number(n) => *n,
        Cell::Text(s) => parse_clock(s).map(|secs| secs as f64).unwrap_or(0.0),
    }
}

/// Parse `H:MM:SS` or `M:SS` into seconds.
///
/// Returns `None` for any other shape, a non-integer part, or overflow.
fn parse_clock(s: &str) -> Option<i64> {
    let parts = s
        .split(':')
        .map(|p| p.trim().parse::<i64>().ok())
        .collect::<Option<Vec<i64>>>()?;

    match parts.as_slice() {
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        _ => None,
    }
}

/// Format seconds as `H:MM:SS`.
///
/// `None` and NaN render as `0:00:00`. Fractional seconds are truncated.
pub fn format(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(s) if !s.is_nan() => s as i64,
        _ => return "0:00:00".to_string(),
    };

    let hours = seconds.div_euclid(3600);
    let rem = seconds.rem_euclid(3600);
    format!("{}:{:02}:{:02}", hours, rem / 60, rem % 60)
}

/// Format a cell holding seconds; non-numeric cells render as zero.
pub fn format_cell(cell: &Cell) -> String {
    format(cell.as_number())
}

/// Convert seconds to a fraction of a day for time-formatted cells.
pub fn to_day_fraction(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY
}

/// Convert a fraction of a day back to whole seconds, rounding to the
/// nearest second to absorb floating-point noise from spreadsheet storage.
pub fn from_day_fraction(fraction: f64) -> f64 {
    (fraction * SECONDS_PER_DAY).round()
}
