//! Failures of a conversion pass, split by stage: reading the source
//! workbook, rendering a cell, and writing an output file.
//!
//! A pass stops at its first error, so every variant carries the path,
//! sheet or cell position needed to find the offending input.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for functions that can fail during a conversion pass.
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Things that can go wrong when opening a spreadsheet document.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Couldn't reach the file on disk.
    #[error("failed to read file '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but isn't a spreadsheet container we understand,
    /// or it is corrupt.
    #[error("failed to open workbook '{path}': {message}")]
    Open { path: PathBuf, message: String },

    /// The workbook opened but one of its sheets couldn't be read.
    #[error("failed to read sheet '{name}': {message}")]
    Sheet { name: String, message: String },
}

impl ParseError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

/// A single cell value that has no text rendering.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellFormatError {
    /// NaN or infinity stored in a numeric cell.
    #[error("number is not finite")]
    NonFinite,

    /// A date, time or duration serial that doesn't map to a calendar value.
    #[error("date serial {0} is out of range")]
    DateOutOfRange(f64),
}

/// Failures creating or writing an output file.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to create '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The finished temp file couldn't be moved over the destination.
    #[error("failed to persist '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything that can abort a conversion pass.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Row and column are 1-based, the way spreadsheet users count.
    #[error("sheet '{sheet}' row {row} column {column}: {source}")]
    CellFormat {
        sheet: String,
        row: usize,
        column: usize,
        #[source]
        source: CellFormatError,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}
