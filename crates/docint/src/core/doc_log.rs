//! Per-document log files.
//!
//! While a pipe processes a file it routes every `tracing` event on the current
//! thread into `{log_dir}/{file_name}.{stub}.log`. Component output (table errors,
//! skipped rows, cache use) lands next to the engine's own lines. Events emitted
//! outside [`DocLog::in_scope`] go to the global subscriber as usual.

use crate::{DocintError, Result};
use std::path::{Path, PathBuf};
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoUtc;

pub struct DocLog {
    path: PathBuf,
    dispatch: Dispatch,
}

impl std::fmt::Debug for DocLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocLog").field("path", &self.path).finish()
    }
}

impl DocLog {
    /// Open (append) the log of `file_name` for pipe `stub`.
    pub fn open(log_dir: &Path, file_name: &str, stub: &str) -> Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let file = format!("{}.{}.log", file_name, stub);
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(&file)
            .build(log_dir)
            .map_err(|e| {
                DocintError::Io(std::io::Error::other(format!(
                    "Failed to open document log in {}: {}",
                    log_dir.display(),
                    e
                )))
            })?;

        let subscriber = tracing_subscriber::fmt()
            .with_writer(appender)
            .with_ansi(false)
            .with_target(false)
            .with_timer(ChronoUtc::rfc_3339())
            .with_max_level(LevelFilter::INFO)
            .finish();

        Ok(Self {
            path: log_dir.join(file),
            dispatch: Dispatch::new(subscriber),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` with this log as the thread's default subscriber.
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}
