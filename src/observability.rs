//! Upload observers and the per-call log file sink.
//!
//! Callers can pass an [`UploadObserver`] in the upload options to record metrics, logs, or
//! progress. [`FileObserver`] is also what [`crate::dash::upload_dataframe`] uses for its
//! `<table>_<YYYYMMDDHHMM>.log` file.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};

use crate::dash::DashResponse;
use crate::error::DashError;

const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d,%H:%M:%S";

/// Level of a line written to a [`FileObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width specifiers apply.
        f.pad(match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        })
    }
}

/// Which chunk of which upload an event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadContext {
    /// Target Dash table.
    pub table: String,
    /// Chunk index, numbered the same way as the dry-run file names of the entry point.
    pub chunk_index: usize,
    /// Rows in the chunk.
    pub rows: usize,
}

/// Observer interface for chunk outcomes.
///
/// All hooks default to no-ops.
pub trait UploadObserver: Send + Sync {
    /// Called after a dry-run chunk file is written.
    fn on_chunk_written(&self, _ctx: &UploadContext, _path: &Path) {}

    /// Called after a chunk upload returned a 2xx response.
    fn on_chunk_uploaded(&self, _ctx: &UploadContext, _response: &DashResponse) {}

    /// Called when a chunk fails; the error is returned to the caller right after.
    fn on_failure(&self, _ctx: &UploadContext, _error: &DashError) {}
}

/// Appends formatted lines to a local log file.
///
/// Lines look like `2024-05-01,09:30:00 - my_logger    INFO     message`. The file is opened
/// (created or appended) on construction and closed when the observer is dropped; every line is
/// flushed as it is written.
pub struct FileObserver {
    path: PathBuf,
    name: String,
    file: Mutex<LineWriter<File>>,
}

impl FileObserver {
    /// Open `path` for appending, logging under `name`.
    pub fn create(path: impl AsRef<Path>, name: impl Into<String>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            name: name.into(),
            file: Mutex::new(LineWriter::new(file)),
        })
    }

    /// Write one line at `level`.
    pub fn log(&self, level: LogLevel, message: &str) -> io::Result<()> {
        let line = format_log_line(Local::now().naive_local(), &self.name, level, message);
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file mutex poisoned"))?;
        writeln!(file, "{line}")
    }
}

impl fmt::Debug for FileObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileObserver")
            .field("path", &self.path)
            .field("name", &self.name)
            .finish()
    }
}

// Observer callbacks are best-effort; call `log` directly to see write failures.
impl UploadObserver for FileObserver {
    fn on_chunk_written(&self, ctx: &UploadContext, path: &Path) {
        let _ = self.log(
            LogLevel::Info,
            &format!("chunk {} ({} rows) written to {}", ctx.chunk_index, ctx.rows, path.display()),
        );
    }

    fn on_chunk_uploaded(&self, _ctx: &UploadContext, response: &DashResponse) {
        let _ = self.log(LogLevel::Info, &response.body);
    }

    fn on_failure(&self, ctx: &UploadContext, error: &DashError) {
        let _ = self.log(
            LogLevel::Error,
            &format!("chunk {} of table {} failed: {error}", ctx.chunk_index, ctx.table),
        );
    }
}

/// Render one log line: `<timestamp> - <name:12> <LEVEL:8> <message>`.
pub fn format_log_line(timestamp: NaiveDateTime, name: &str, level: LogLevel, message: &str) -> String {
    format!(
        "{} - {name:<12} {level:<8} {message}",
        timestamp.format(LOG_TIMESTAMP_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn log_line_pads_name_and_level() {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(
            format_log_line(ts, "dash", LogLevel::Info, "{\"ok\":true}"),
            "2024-05-01,09:30:00 - dash         INFO     {\"ok\":true}"
        );
        assert_eq!(
            format_log_line(ts, "dash_upload::dash::upload", LogLevel::Warning, "m"),
            "2024-05-01,09:30:00 - dash_upload::dash::upload WARNING  m"
        );
    }

    #[test]
    fn file_observer_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.log");
        {
            let obs = FileObserver::create(&path, "dash").unwrap();
            obs.log(LogLevel::Info, "first").unwrap();
            obs.on_chunk_uploaded(
                &UploadContext {
                    table: "t".to_string(),
                    chunk_index: 0,
                    rows: 1,
                },
                &DashResponse {
                    status: 200,
                    body: "second".to_string(),
                },
            );
        }
        let obs = FileObserver::create(&path, "dash").unwrap();
        obs.log(LogLevel::Error, "third").unwrap();
        drop(obs);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("dash         INFO     first"));
        assert!(lines[1].ends_with("INFO     second"));
        assert!(lines[2].ends_with("ERROR    third"));
    }

    #[test]
    fn create_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileObserver::create(dir.path().join("nope").join("t.log"), "dash").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
