//! Sheetsync Watcher - keeps CSV output in step with its source
//!
//! This crate handles the "when" of conversion:
//! - Recording the source's modification time when watching starts
//! - Re-checking it on a fixed cadence
//! - Triggering exactly one conversion per detected change
//!
//! Conversion itself is whatever closure the caller passes in, usually
//! [`sheetsync_core::Converter::convert`].

mod error;
mod watcher;

pub use error::{StatError, WatchError};
pub use watcher::{ChangeWatcher, FsModTime, ModTimeSource, WatchState, DEFAULT_INTERVAL};
