//! Rendering cells to the text written into delimited output.
//!
//! Cells are rendered the way the document displays them, not as their
//! raw stored value. A cell carrying a number format code goes through
//! [`crate::numfmt`]. Cells without one use the general rules: whole
//! numbers lose their trailing `.0`, dates come out as `YYYY-MM-DD`,
//! durations as `h:mm:ss`, booleans are upper-case.

use crate::document::{Cell, CellValue};
use crate::error::CellFormatError;
use crate::numfmt;
use chrono::{Days, NaiveDate, NaiveDateTime};

pub(crate) const SECONDS_PER_DAY: f64 = 86_400.0;

/// Serial of 9999-12-31, the last date spreadsheets can represent.
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// Whole numbers beyond this are printed as floats.
const MAX_EXACT_INTEGER: f64 = 1e15;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Renders one cell to its display text.
pub fn format_cell(cell: &Cell) -> Result<String, CellFormatError> {
    let code = cell
        .format
        .as_deref()
        .filter(|code| !code.is_empty() && !code.eq_ignore_ascii_case("general"));

    match (&cell.value, code) {
        (
            CellValue::Number(n) | CellValue::DateTime(n) | CellValue::Duration(n),
            Some(code),
        ) => numfmt::format_number(*n, code),
        (CellValue::Text(s), Some(code)) => Ok(numfmt::format_text(s, code)),
        (value, _) => format_value(value),
    }
}

fn format_value(value: &CellValue) -> Result<String, CellFormatError> {
    match value {
        CellValue::Empty => Ok(String::new()),
        CellValue::Text(s) => Ok(s.clone()),
        CellValue::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        CellValue::Error(code) => Ok(code.clone()),
        CellValue::Number(n) => general(*n),
        CellValue::DateTime(serial) => format_datetime(*serial),
        CellValue::Duration(serial) => format_duration(*serial),
    }
}

/// The general number rendering.
pub(crate) fn general(n: f64) -> Result<String, CellFormatError> {
    if !n.is_finite() {
        return Err(CellFormatError::NonFinite);
    }
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        Ok(format!("{}", n as i64))
    } else {
        Ok(n.to_string())
    }
}

fn format_datetime(serial: f64) -> Result<String, CellFormatError> {
    let datetime = serial_to_datetime(serial)?;
    if serial.fract() == 0.0 {
        Ok(datetime.format("%Y-%m-%d").to_string())
    } else {
        Ok(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

fn format_duration(serial: f64) -> Result<String, CellFormatError> {
    if !serial.is_finite() || serial < 0.0 {
        return Err(CellFormatError::DateOutOfRange(serial));
    }
    let total = (serial * SECONDS_PER_DAY).round() as u64;
    Ok(format!(
        "{}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    ))
}

/// Calendar date `days` after 1899-12-30. `serial` is only for the error.
pub(crate) fn serial_to_date(days: u64, serial: f64) -> Result<NaiveDate, CellFormatError> {
    if days as f64 > MAX_DATE_SERIAL {
        return Err(CellFormatError::DateOutOfRange(serial));
    }
    epoch()
        .checked_add_days(Days::new(days))
        .ok_or(CellFormatError::DateOutOfRange(serial))
}

/// Converts a serial (days since 1899-12-30) to a calendar timestamp.
fn serial_to_datetime(serial: f64) -> Result<NaiveDateTime, CellFormatError> {
    if !serial.is_finite() || !(0.0..MAX_DATE_SERIAL + 1.0).contains(&serial) {
        return Err(CellFormatError::DateOutOfRange(serial));
    }

    let seconds = (serial * SECONDS_PER_DAY).round() as u64;
    let date = serial_to_date(seconds / 86_400, serial)?;
    let time = (seconds % 86_400) as u32;
    date.and_hms_opt(time / 3600, time % 3600 / 60, time % 60)
        .ok_or(CellFormatError::DateOutOfRange(serial))
}

/// Serial in the 1900 date system for a calendar timestamp.
pub(crate) fn datetime_to_serial(datetime: NaiveDateTime) -> f64 {
    let since_epoch = datetime - epoch().and_time(Default::default());
    since_epoch.num_milliseconds() as f64 / (SECONDS_PER_DAY * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: CellValue) -> String {
        format_cell(&Cell::new(value)).unwrap()
    }

    fn fmt_as(value: CellValue, code: &str) -> String {
        format_cell(&Cell::with_format(value, code)).unwrap()
    }

    #[test]
    fn test_format_plain_values() {
        assert_eq!(fmt(CellValue::Empty), "");
        assert_eq!(fmt(CellValue::Text("Jan".into())), "Jan");
        assert_eq!(fmt(CellValue::Bool(true)), "TRUE");
        assert_eq!(fmt(CellValue::Bool(false)), "FALSE");
        assert_eq!(fmt(CellValue::Error("#DIV/0!".into())), "#DIV/0!");
    }

    #[test]
    fn test_format_numbers() {
        assert_eq!(fmt(CellValue::Number(100.0)), "100");
        assert_eq!(fmt(CellValue::Number(-3.0)), "-3");
        assert_eq!(fmt(CellValue::Number(0.25)), "0.25");
        assert_eq!(fmt(CellValue::Number(1234.5)), "1234.5");
    }

    #[test]
    fn test_non_finite_number_fails() {
        assert_eq!(
            format_cell(&Cell::new(CellValue::Number(f64::NAN))),
            Err(CellFormatError::NonFinite)
        );
        assert_eq!(
            format_cell(&Cell::with_format(CellValue::Number(f64::INFINITY), "0.00")),
            Err(CellFormatError::NonFinite)
        );
    }

    #[test]
    fn test_format_dates() {
        // 2024-01-15
        assert_eq!(fmt(CellValue::DateTime(45306.0)), "2024-01-15");
        // 2024-01-15 12:00:00
        assert_eq!(fmt(CellValue::DateTime(45306.5)), "2024-01-15 12:00:00");
        assert_eq!(fmt(CellValue::DateTime(1.0)), "1899-12-31");
    }

    #[test]
    fn test_date_out_of_range_fails() {
        assert!(matches!(
            format_cell(&Cell::new(CellValue::DateTime(-1.0))),
            Err(CellFormatError::DateOutOfRange(_))
        ));
        assert!(matches!(
            format_cell(&Cell::new(CellValue::DateTime(1e9))),
            Err(CellFormatError::DateOutOfRange(_))
        ));
    }

    #[test]
    fn test_format_durations() {
        assert_eq!(fmt(CellValue::Duration(0.5)), "12:00:00");
        assert_eq!(fmt(CellValue::Duration(1.5)), "36:00:00");
        assert_eq!(fmt(CellValue::Duration(90.0 / 86_400.0)), "0:01:30");
    }

    #[test]
    fn test_cells_render_with_their_own_format_code() {
        assert_eq!(fmt_as(CellValue::Number(12.5), "0.00"), "12.50");
        assert_eq!(fmt_as(CellValue::Number(0.5), "0%"), "50%");
        assert_eq!(fmt_as(CellValue::Number(1234.5), "#,##0.00"), "1,234.50");
        assert_eq!(fmt_as(CellValue::DateTime(45306.0), "m/d/yy"), "1/15/24");
        assert_eq!(fmt_as(CellValue::Duration(1.5), "[h]:mm"), "36:00");
        assert_eq!(fmt_as(CellValue::Text("x".into()), "\"<\"@\">\""), "<x>");
    }

    #[test]
    fn test_general_code_uses_default_rules() {
        assert_eq!(fmt_as(CellValue::Number(1234.5), "General"), "1234.5");
        assert_eq!(fmt_as(CellValue::DateTime(45306.0), "General"), "2024-01-15");
        assert_eq!(fmt_as(CellValue::Bool(true), "0.00"), "TRUE");
    }

    #[test]
    fn test_datetime_to_serial() {
        let noon = NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        assert_eq!(datetime_to_serial(noon), 45306.5);
    }
}
