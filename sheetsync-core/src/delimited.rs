//! Delimited text output.
//!
//! Each output goes to a temp file next to its destination and is
//! renamed into place on finish, so a failed sheet never leaves a
//! half-written file and a finished one is fully on disk.

use crate::adapter::{RowSink, TabularWriter};
use crate::error::WriteError;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes comma-separated values with standard quoting.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    pub delimiter: char,
    pub quote: char,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
        }
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders one record, terminator included.
    pub fn encode_record(&self, fields: &[String]) -> String {
        let mut line = String::new();
        for (idx, field) in fields.iter().enumerate() {
            if idx > 0 {
                line.push(self.delimiter);
            }
            if self.needs_quotes(field) {
                let doubled = format!("{0}{0}", self.quote);
                line.push(self.quote);
                line.push_str(&field.replace(self.quote, &doubled));
                line.push(self.quote);
            } else {
                line.push_str(field);
            }
        }
        line.push('\n');
        line
    }

    fn needs_quotes(&self, field: &str) -> bool {
        if field.is_empty() {
            return false;
        }
        field.starts_with([' ', '\t'])
            || field.contains([self.delimiter, self.quote, '\r', '\n'])
    }
}

impl TabularWriter for CsvWriter {
    fn create(&self, path: &Path) -> Result<Box<dyn RowSink>, WriteError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir).map_err(|source| WriteError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Box::new(CsvSink {
            path: path.to_path_buf(),
            out: BufWriter::new(tmp),
            writer: self.clone(),
        }))
    }
}

struct CsvSink {
    path: PathBuf,
    out: BufWriter<NamedTempFile>,
    writer: CsvWriter,
}

impl CsvSink {
    fn write_err(&self, source: std::io::Error) -> WriteError {
        WriteError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl RowSink for CsvSink {
    fn write_row(&mut self, fields: &[String]) -> Result<(), WriteError> {
        let line = self.writer.encode_record(fields);
        self.out
            .write_all(line.as_bytes())
            .map_err(|e| self.write_err(e))
    }

    fn finish(self: Box<Self>) -> Result<(), WriteError> {
        let CsvSink { path, out, .. } = *self;

        let tmp = out.into_inner().map_err(|e| WriteError::Write {
            path: path.clone(),
            source: e.into_error(),
        })?;
        tmp.as_file().sync_all().map_err(|source| WriteError::Write {
            path: path.clone(),
            source,
        })?;
        tmp.persist(&path).map_err(|e| WriteError::Persist {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}
