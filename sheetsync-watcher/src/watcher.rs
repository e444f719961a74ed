//! Modification-time polling.
//!
//! The watcher stats one path on every tick of a fixed-period timer and
//! reconverts when the timestamp moves strictly forward. Conversion runs
//! inline, so a tick is never processed while a conversion is still in
//! flight, and ticks missed during a long conversion are skipped rather
//! than replayed.

use crate::error::{StatError, WatchError};
use sheetsync_core::ConversionError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default period between modification-time checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Where modification times come from.
///
/// The filesystem in production; a settable clock in tests.
pub trait ModTimeSource: Send + Sync {
    fn modified(&self, path: &Path) -> Result<SystemTime, StatError>;
}

/// Reads modification times from file metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsModTime;

impl ModTimeSource for FsModTime {
    fn modified(&self, path: &Path) -> Result<SystemTime, StatError> {
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|e| StatError::new(path, e))
    }
}

/// What one watcher knows about its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    watched_path: PathBuf,
    last_seen: SystemTime,
}

impl WatchState {
    pub fn watched_path(&self) -> &Path {
        &self.watched_path
    }

    pub fn last_seen(&self) -> SystemTime {
        self.last_seen
    }
}

/// Watches one source path for modification-time changes.
///
/// The [`WatchState`] is owned here and only advanced after a
/// change-triggered conversion succeeds.
pub struct ChangeWatcher<S = FsModTime> {
    state: WatchState,
    source: S,
}

impl ChangeWatcher<FsModTime> {
    /// Starts watching `path` on the real filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, WatchError> {
        Self::start(path, FsModTime)
    }
}

impl<S: ModTimeSource> ChangeWatcher<S> {
    /// Records the current modification time as the baseline.
    ///
    /// Fails if the path can't be stat'd; there is no retry.
    pub fn start(path: impl Into<PathBuf>, source: S) -> Result<Self, WatchError> {
        let watched_path = path.into();
        let last_seen = source.modified(&watched_path)?;

        info!("Watching {} for changes", watched_path.display());

        Ok(Self {
            state: WatchState {
                watched_path,
                last_seen,
            },
            source,
        })
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Runs one check.
    ///
    /// Returns `true` if the source had moved forward and `convert` ran
    /// successfully. An equal or older timestamp is not a change.
    pub fn poll<F, T>(&mut self, convert: F) -> Result<bool, WatchError>
    where
        F: FnOnce(&Path) -> Result<T, ConversionError>,
    {
        let modified = self.source.modified(&self.state.watched_path)?;

        if modified <= self.state.last_seen {
            debug!("{} unchanged", self.state.watched_path.display());
            return Ok(false);
        }

        info!(
            "{} changed, reconverting",
            self.state.watched_path.display()
        );
        convert(&self.state.watched_path)?;
        self.state.last_seen = modified;

        Ok(true)
    }

    /// Polls every `period` until cancelled or a check fails.
    ///
    /// The first check happens one full period after the call. Only
    /// cancellation returns `Ok`; stat and conversion errors end the loop.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub async fn run<F, T>(
        mut self,
        period: Duration,
        cancel: CancellationToken,
        mut convert: F,
    ) -> Result<(), WatchError>
    where
        F: FnMut(&Path) -> Result<T, ConversionError>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Stopped watching {}", self.state.watched_path.display());
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.poll(&mut convert)?;
                }
            }
        }
    }
}
