//! Sheetsync Core - spreadsheet to CSV conversion
//!
//! This crate provides the conversion side of sheetsync. It reads a
//! spreadsheet document into sheets of typed cells, renders each cell
//! through its own number format code the way the spreadsheet displays
//! it, and writes one CSV file per sheet.
//!
//! Parsing and writing sit behind the [`DocumentParser`] and
//! [`TabularWriter`] traits so the pipeline can run against in-memory
//! documents.
//!
//! # Example
//!
//! ```no_run
//! use sheetsync_core::Converter;
//! use std::path::Path;
//!
//! let converter = Converter::workbook_to_csv(".");
//! let summary = converter.convert(Path::new("Book1.xlsx")).unwrap();
//! for sheet in summary.sheets {
//!     println!("{} -> {}", sheet.sheet, sheet.output.display());
//! }
//! ```

pub mod adapter;
pub mod delimited;
pub mod document;
pub mod error;
pub mod format;
pub mod numfmt;
pub mod pipeline;
mod styles;
pub mod workbook;

pub use adapter::{DocumentParser, RowSink, TabularWriter};
pub use delimited::CsvWriter;
pub use document::{Cell, CellValue, Row, Sheet, SourceDocument};
pub use error::{CellFormatError, ConversionError, ParseError, Result, WriteError};
pub use format::format_cell;
pub use pipeline::{
    convert_document, convert_sheet, output_name, ConversionSummary, ConvertedSheet, Converter,
};
pub use workbook::WorkbookParser;
