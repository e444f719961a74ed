//! In-memory document representation.
//!
//! A SourceDocument is our abstraction over whatever container the
//! spreadsheet came from. It only keeps what conversion needs: sheet
//! names, rows in physical order, and typed cell values that still
//! have to be rendered to text.

use serde::{Deserialize, Serialize};

/// A typed value as read from the document.
///
/// Date, time and duration values are serial numbers in the 1900 date
/// system (days since 1899-12-30, fraction is time of day), whatever
/// system the workbook itself uses. Rendering to text happens in
/// [`crate::format::format_cell`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(f64),
    Duration(f64),
    /// Spreadsheet error code such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A cell value plus the number format code the document displays it
/// with, e.g. `#,##0.00` or `m/d/yy`.
///
/// `format` is `None` when the container carries no code for the cell
/// or the code is the general one; such cells render with the default
/// rules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            format: None,
        }
    }

    pub fn with_format(value: CellValue, code: impl Into<String>) -> Self {
        Self {
            value,
            format: Some(code.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl From<CellValue> for Cell {
    fn from(value: CellValue) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::new(s.into())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::new(s.into())
    }
}

/// One row of a sheet.
///
/// Rows are sparse: a row only holds the cells it actually has, so
/// neighbours may differ in width. Nothing pads them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<T: Into<Cell>> FromIterator<T> for Row {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// A named table within the document.
///
/// Names are not guaranteed unique across a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// A parsed spreadsheet, alive for one conversion pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceDocument {
    pub sheets: Vec<Sheet>,
}

impl SourceDocument {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_strings() {
        let row: Row = ["Jan", "100"].into_iter().collect();
        assert_eq!(
            row.cells,
            vec![
                Cell::new(CellValue::Text("Jan".into())),
                Cell::new(CellValue::Text("100".into()))
            ]
        );
    }

    #[test]
    fn test_cell_value_serde_shape() {
        let json = serde_json::to_string(&CellValue::Number(1.5)).unwrap();
        assert_eq!(json, r#"{"type":"number","value":1.5}"#);

        let back: CellValue = serde_json::from_str(r#"{"type":"empty"}"#).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_cell_format_is_optional_in_json() {
        let plain: Cell = serde_json::from_str(r#"{"value":{"type":"bool","value":true}}"#).unwrap();
        assert_eq!(plain, Cell::new(CellValue::Bool(true)));

        let styled = Cell::with_format(CellValue::Number(0.5), "0%");
        assert_eq!(
            serde_json::to_string(&styled).unwrap(),
            r#"{"value":{"type":"number","value":0.5},"format":"0%"}"#
        );
    }
}
