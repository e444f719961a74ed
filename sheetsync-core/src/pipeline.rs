//! Conversion pipeline - one document in, one file per sheet out.
//!
//! Sheets are converted strictly in document order and the first failure
//! aborts the pass. There is no partial-success reporting: either every
//! sheet was written or the caller gets the error that stopped it.

use crate::adapter::{DocumentParser, TabularWriter};
use crate::delimited::CsvWriter;
use crate::document::Sheet;
use crate::error::{ConversionError, Result};
use crate::format::format_cell;
use crate::workbook::WorkbookParser;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output file name for a sheet.
///
/// Two sheets with the same name map to the same file; the later one
/// wins.
pub fn output_name(sheet: &Sheet) -> String {
    format!("{}.csv", sheet.name)
}

/// One sheet that made it to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedSheet {
    pub sheet: String,
    pub output: PathBuf,
    pub rows: usize,
}

/// Result of a successful conversion pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionSummary {
    pub sheets: Vec<ConvertedSheet>,
}

impl ConversionSummary {
    pub fn total_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows).sum()
    }
}

/// Writes one sheet to `out_dir`.
///
/// A cell that can't be rendered aborts the sheet before anything
/// replaces the destination. A sheet with no rows still produces an
/// (empty) file.
pub fn convert_sheet(
    writer: &dyn TabularWriter,
    sheet: &Sheet,
    out_dir: &Path,
) -> Result<ConvertedSheet> {
    let output = out_dir.join(output_name(sheet));
    let mut sink = writer.create(&output)?;

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let fields = row
            .cells
            .iter()
            .enumerate()
            .map(|(col_idx, cell)| {
                format_cell(cell).map_err(|source| ConversionError::CellFormat {
                    sheet: sheet.name.clone(),
                    row: row_idx + 1,
                    column: col_idx + 1,
                    source,
                })
            })
            .collect::<Result<Vec<String>>>()?;

        sink.write_row(&fields)?;
    }

    sink.finish()?;

    info!(
        "sheet [{}] successfully converted to [{}]",
        sheet.name,
        output.display()
    );

    Ok(ConvertedSheet {
        sheet: sheet.name.clone(),
        output,
        rows: sheet.rows.len(),
    })
}

/// Parses `source` and writes every sheet to `out_dir`.
///
/// A parse failure is returned unchanged and nothing is written.
pub fn convert_document(
    parser: &dyn DocumentParser,
    writer: &dyn TabularWriter,
    source: &Path,
    out_dir: &Path,
) -> Result<ConversionSummary> {
    let document = parser.parse(source)?;

    let mut summary = ConversionSummary::default();
    for sheet in &document.sheets {
        summary.sheets.push(convert_sheet(writer, sheet, out_dir)?);
    }

    Ok(summary)
}

/// A parser, a writer and an output directory bundled together.
///
/// This is what the watcher re-runs on every detected change.
pub struct Converter {
    parser: Box<dyn DocumentParser>,
    writer: Box<dyn TabularWriter>,
    out_dir: PathBuf,
}

impl Converter {
    pub fn new(
        parser: Box<dyn DocumentParser>,
        writer: Box<dyn TabularWriter>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            parser,
            writer,
            out_dir: out_dir.into(),
        }
    }

    /// Spreadsheet files in, CSV files out.
    pub fn workbook_to_csv(out_dir: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(WorkbookParser), Box::new(CsvWriter::new()), out_dir)
    }

    /// Runs one full conversion pass over `source`.
    pub fn convert(&self, source: &Path) -> Result<ConversionSummary> {
        convert_document(
            self.parser.as_ref(),
            self.writer.as_ref(),
            source,
            &self.out_dir,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CellValue, Row};

    #[test]
    fn test_output_name() {
        let sheet = Sheet::new("Sales", vec![]);
        assert_eq!(output_name(&sheet), "Sales.csv");

        let sheet = Sheet::new("Q1 2024", vec![]);
        assert_eq!(output_name(&sheet), "Q1 2024.csv");
    }

    #[test]
    fn test_summary_totals() {
        let summary = ConversionSummary {
            sheets: vec![
                ConvertedSheet {
                    sheet: "a".into(),
                    output: "a.csv".into(),
                    rows: 2,
                },
                ConvertedSheet {
                    sheet: "b".into(),
                    output: "b.csv".into(),
                    rows: 3,
                },
            ],
        };
        assert_eq!(summary.total_rows(), 5);
    }

    #[test]
    fn test_cell_format_error_carries_position() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = Sheet::new(
            "Bad",
            vec![
                Row::new(vec!["ok".into()]),
                Row::new(vec!["ok".into(), CellValue::Number(f64::NAN).into()]),
            ],
        );

        let err = convert_sheet(&CsvWriter::new(), &sheet, dir.path()).unwrap_err();
        match err {
            ConversionError::CellFormat {
                sheet, row, column, ..
            } => {
                assert_eq!(sheet, "Bad");
                assert_eq!(row, 2);
                assert_eq!(column, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("Bad.csv").exists());
    }
}
