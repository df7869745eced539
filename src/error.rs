use thiserror::Error;

/// Convenience result type for reading, serializing and uploading datasets.
pub type DashResult<T> = Result<T, DashError>;

/// Error type returned by every fallible operation in this crate.
///
/// A single enum is shared by CSV reading, serialization and the HTTP upload path. Nothing is
/// retried; the first error aborts the chunk loop and is returned to the caller.
#[derive(Debug, Error)]
pub enum DashError {
    /// Underlying I/O error (source file missing, dry-run directory or log file not writable).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read or write error, including invalid UTF-8 in the source.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Transport-level HTTP failure (connection refused, TLS, timeout, client construction).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Dash API answered with a non-2xx status.
    #[error("upload to table '{table}' rejected with status {status}: {body}")]
    UploadRejected {
        status: u16,
        table: String,
        body: String,
    },

    /// The data does not have the expected shape (missing columns, empty input, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed or cast into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// An option or argument is out of range (zero chunk size, unknown encoding, bad header).
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },
}

impl DashError {
    pub(crate) fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }
}
