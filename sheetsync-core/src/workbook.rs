//! Spreadsheet container parsing.
//!
//! Wraps calamine and maps its cell model onto ours. The container
//! format is detected from the file extension (xlsx, xlsm, xlsb, xls,
//! ods); anything else is a parse error. For xlsx and xlsm each cell
//! also gets the number format code it is displayed with.

use crate::adapter::DocumentParser;
use crate::document::{Cell, CellValue, Row, Sheet, SourceDocument};
use crate::error::ParseError;
use crate::format::datetime_to_serial;
use crate::styles::{read_workbook_formats, SheetFormats, WorkbookFormats};
use calamine::{open_workbook_auto, Data, ExcelDateTime, Range, Reader};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads workbooks from disk with calamine.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookParser;

impl DocumentParser for WorkbookParser {
    fn parse(&self, path: &Path) -> Result<SourceDocument, ParseError> {
        // Surface missing/unreadable files as IO errors rather than
        // whatever calamine makes of them.
        fs::metadata(path).map_err(|e| ParseError::io(path, e))?;

        let mut workbook = open_workbook_auto(path).map_err(|e| ParseError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let formats = if has_style_parts(path) {
            read_workbook_formats(path)?
        } else {
            WorkbookFormats::default()
        };

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ParseError::Sheet {
                    name: name.clone(),
                    message: e.to_string(),
                })?;

            let rows = range_to_rows(&range, formats.sheet(&name));
            debug!("Read sheet [{}] with {} rows", name, rows.len());
            sheets.push(Sheet::new(name, rows));
        }

        Ok(SourceDocument::new(sheets))
    }
}

fn has_style_parts(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"))
}

/// Converts a used range into rows anchored at A1.
///
/// calamine trims the range to the used area, so rows above it become
/// empty rows and columns left of it become leading empty cells.
/// Trailing empty cells are dropped, which keeps rows sparse.
fn range_to_rows(range: &Range<Data>, formats: Option<&SheetFormats>) -> Vec<Row> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<Row> = (0..first_row).map(|_| Row::default()).collect();

    for (offset, data_row) in range.rows().enumerate() {
        let row = first_row + offset as u32;
        let mut cells: Vec<Cell> = Vec::with_capacity(first_col as usize + data_row.len());
        cells.extend((0..first_col).map(|_| Cell::default()));
        cells.extend(data_row.iter().enumerate().map(|(i, data)| {
            let col = first_col + i as u32;
            Cell {
                value: convert_cell(data),
                format: formats.and_then(|f| f.get(&(row, col))).cloned(),
            }
        }));

        while cells.last().is_some_and(Cell::is_empty) {
            cells.pop();
        }
        rows.push(Row::new(cells));
    }

    rows
}

/// Convert calamine Data to our CellValue.
fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => convert_datetime(dt),
        // Already rendered by the container (ods).
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

/// Re-bases the serial on the 1900 date system, so workbooks saved with
/// the 1904 system show the same dates.
fn convert_datetime(dt: &ExcelDateTime) -> CellValue {
    if dt.is_duration() {
        let serial = dt
            .as_duration()
            .map_or(dt.as_f64(), |d| d.num_milliseconds() as f64 / 86_400_000.0);
        return CellValue::Duration(serial);
    }
    match dt.as_datetime() {
        Some(datetime) => CellValue::DateTime(datetime_to_serial(datetime)),
        None => CellValue::DateTime(dt.as_f64()),
    }
}
