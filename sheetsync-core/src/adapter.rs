//! Capability traits at the edges of the conversion core.
//!
//! The pipeline never touches a spreadsheet container or an output
//! format directly. It asks a [`DocumentParser`] for sheets and hands
//! formatted rows to a [`TabularWriter`]. Tests plug in-memory fakes in
//! here; the binary uses [`crate::WorkbookParser`] and [`crate::CsvWriter`].

use crate::document::SourceDocument;
use crate::error::{ParseError, WriteError};
use std::path::Path;

/// Turns a source path into an ordered list of sheets.
pub trait DocumentParser: Send + Sync {
    /// Reads the whole document.
    ///
    /// Fails if the file is absent, corrupt, or not a container this
    /// parser recognises.
    fn parse(&self, path: &Path) -> Result<SourceDocument, ParseError>;
}

/// Opens output destinations for delimited text.
pub trait TabularWriter: Send + Sync {
    /// Starts a new output at `path`.
    ///
    /// Any existing file at `path` is only replaced once the returned
    /// sink is finished. Dropping the sink unfinished leaves it alone.
    fn create(&self, path: &Path) -> Result<Box<dyn RowSink>, WriteError>;
}

/// One open output destination.
pub trait RowSink {
    /// Appends one record. Fields keep their order.
    fn write_row(&mut self, fields: &[String]) -> Result<(), WriteError>;

    /// Flushes everything written so far and makes it durable.
    fn finish(self: Box<Self>) -> Result<(), WriteError>;
}
