//! Errors that end a watch loop.

use sheetsync_core::ConversionError;
use std::path::PathBuf;
use thiserror::Error;

/// The watched path couldn't be stat'd.
#[derive(Error, Debug)]
#[error("failed to stat '{path}': {source}")]
pub struct StatError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl StatError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Both variants are fatal: the watcher never resumes after one.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error(transparent)]
    Stat(#[from] StatError),

    #[error("conversion failed while watching: {0}")]
    Conversion(#[from] ConversionError),
}
