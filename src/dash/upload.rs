//! Chunked upload entry points.
//!
//! Both entry points split their input into row-bounded chunks, serialize each chunk with
//! [`create_gzipped_csv_stream`], and then either POST it or, in dry-run mode, write it to
//! `<dir>/<table>.<index>.csv.gz`. They differ on purpose:
//!
//! | | [`read_and_upload_file_to_dash`] | [`upload_dataframe`] |
//! |---|---|---|
//! | input | CSV path or stream, read lazily | in-memory [`DataSet`] |
//! | chunk index | 1-based | 0-based |
//! | response bodies | returned in order | written to `<table>_<YYYYMMDDHHMM>.log` |
//! | per-chunk hook | `modify` callback | none |
//! | type coercion / snapshot column | none | `dtypes` / `include_snapshot` |
//!
//! Processing is strictly sequential. The first failure stops the loop and is returned; chunks
//! already uploaded or written stay that way.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{DashError, DashResult};
use crate::export::create_gzipped_csv_stream;
use crate::ingestion::csv::{CsvReadOptions, CsvSource, DEFAULT_CHUNK_SIZE};
use crate::observability::{FileObserver, LogLevel, UploadContext, UploadObserver};
use crate::processing::{cast_columns, chunk_ranges};
use crate::types::{DataSet, DataType, Schema, Value};

use super::client::{DashClient, DashResponse, DashTarget};

/// Name of the column added by [`DataFrameUploadOptions::include_snapshot`].
pub const SNAPSHOT_COLUMN: &str = "snapshot_timestamp";

const SNAPSHOT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const LOG_FILE_STAMP: &str = "%Y%m%d%H%M";
const LOGGER_NAME: &str = module_path!();

/// Options for [`read_and_upload_file_to_dash`].
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct FileUploadOptions {
    /// Source text encoding (WHATWG label). Defaults to `utf-8`.
    pub encoding: String,
    /// Maximum rows per uploaded file. Keep it low enough that each gzip payload stays under the
    /// Dash file size limit.
    pub chunk_size: usize,
    /// If set, nothing is uploaded; chunks are written here as `<table>.<i>.csv.gz`, `i` from 1.
    pub dry_run_dir: Option<PathBuf>,
    /// If set, only these columns are read and parsed as typed; otherwise types are inferred.
    pub schema: Option<Schema>,
    /// Optional observer for per-chunk outcomes.
    pub observer: Option<Arc<dyn UploadObserver>>,
}

impl Default for FileUploadOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            dry_run_dir: None,
            schema: None,
            observer: None,
        }
    }
}

impl fmt::Debug for FileUploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUploadOptions")
            .field("encoding", &self.encoding)
            .field("chunk_size", &self.chunk_size)
            .field("dry_run_dir", &self.dry_run_dir)
            .field("schema", &self.schema)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// Options for [`upload_dataframe`].
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct DataFrameUploadOptions {
    /// Columns to cast before chunking, applied in order.
    pub dtypes: Option<Vec<(String, DataType)>>,
    /// Maximum rows per uploaded file.
    pub chunk_size: usize,
    /// If set, nothing is uploaded; chunks are written here as `<table>.<i>.csv.gz`, `i` from 0.
    pub dry_run_dir: Option<PathBuf>,
    /// Add a [`SNAPSHOT_COLUMN`] holding the call start time to every row.
    pub include_snapshot: bool,
    /// Directory for the `<table>_<YYYYMMDDHHMM>.log` file. Defaults to the working directory.
    pub log_dir: PathBuf,
    /// Draw a progress bar on stderr while chunks are processed.
    pub show_progress: bool,
    /// Optional observer for per-chunk outcomes, in addition to the log file.
    pub observer: Option<Arc<dyn UploadObserver>>,
}

impl Default for DataFrameUploadOptions {
    fn default() -> Self {
        Self {
            dtypes: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            dry_run_dir: None,
            include_snapshot: true,
            log_dir: PathBuf::from("."),
            show_progress: true,
            observer: None,
        }
    }
}

impl fmt::Debug for DataFrameUploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFrameUploadOptions")
            .field("dtypes", &self.dtypes)
            .field("chunk_size", &self.chunk_size)
            .field("dry_run_dir", &self.dry_run_dir)
            .field("include_snapshot", &self.include_snapshot)
            .field("log_dir", &self.log_dir)
            .field("show_progress", &self.show_progress)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// What happened to one chunk.
enum Delivery {
    Written(PathBuf),
    Uploaded(DashResponse),
}

impl DashClient {
    /// Read a CSV source in chunks and upload each one. See [`read_and_upload_file_to_dash`].
    pub fn read_and_upload_file<'a>(
        &self,
        source: impl Into<CsvSource<'a>>,
        target: &DashTarget,
        options: &FileUploadOptions,
        mut modify: Option<&mut dyn FnMut(&mut DataSet)>,
    ) -> DashResult<Vec<String>> {
        let read_options = CsvReadOptions {
            encoding: options.encoding.clone(),
            chunk_size: options.chunk_size,
            schema: options.schema.clone(),
        };
        let chunks = source.into().open(&read_options)?;

        let mut responses = Vec::new();
        for (idx0, chunk) in chunks.enumerate() {
            let mut ctx = UploadContext {
                table: target.table.clone(),
                chunk_index: idx0 + 1,
                rows: 0,
            };
            let delivered = chunk.and_then(|mut chunk| {
                if let Some(modify) = modify.as_deref_mut() {
                    modify(&mut chunk);
                }
                ctx.rows = chunk.row_count();
                self.deliver(&chunk, target, options.dry_run_dir.as_deref(), &ctx)
            });
            match delivered {
                Ok(Delivery::Written(path)) => {
                    if let Some(obs) = &options.observer {
                        obs.on_chunk_written(&ctx, &path);
                    }
                }
                Ok(Delivery::Uploaded(response)) => {
                    if let Some(obs) = &options.observer {
                        obs.on_chunk_uploaded(&ctx, &response);
                    }
                    responses.push(response.body);
                }
                Err(e) => {
                    if let Some(obs) = &options.observer {
                        obs.on_failure(&ctx, &e);
                    }
                    return Err(e);
                }
            }
        }

        Ok(responses)
    }

    /// Chunk an in-memory dataset and upload each chunk. See [`upload_dataframe`].
    pub fn upload_dataframe(
        &self,
        dataset: DataSet,
        target: &DashTarget,
        options: &DataFrameUploadOptions,
    ) -> DashResult<()> {
        if options.chunk_size == 0 {
            return Err(DashError::invalid_options("chunk_size must be > 0"));
        }

        let started = Local::now().naive_local();
        let log_file = FileObserver::create(
            options.log_dir.join(log_file_name(&target.table, started)),
            LOGGER_NAME,
        )?;

        let mut dataset = match &options.dtypes {
            Some(dtypes) => cast_columns(dataset, dtypes)?,
            None => dataset,
        };

        if options.include_snapshot {
            dataset.set_constant_column(
                SNAPSHOT_COLUMN,
                DataType::Utf8,
                Value::Utf8(started.format(SNAPSHOT_FORMAT).to_string()),
            );
        }

        let total_chunks = chunk_ranges(dataset.row_count(), options.chunk_size).len();
        let progress = progress_bar(total_chunks, &target.table, options.show_progress);

        for (index, chunk) in dataset.chunks(options.chunk_size).enumerate() {
            let ctx = UploadContext {
                table: target.table.clone(),
                chunk_index: index,
                rows: chunk.row_count(),
            };
            match self.deliver(&chunk, target, options.dry_run_dir.as_deref(), &ctx) {
                Ok(Delivery::Written(path)) => {
                    if let Some(obs) = &options.observer {
                        obs.on_chunk_written(&ctx, &path);
                    }
                }
                Ok(Delivery::Uploaded(response)) => {
                    log_file.log(LogLevel::Info, &response.body)?;
                    if let Some(obs) = &options.observer {
                        obs.on_chunk_uploaded(&ctx, &response);
                    }
                }
                Err(e) => {
                    log_file.on_failure(&ctx, &e);
                    if let Some(obs) = &options.observer {
                        obs.on_failure(&ctx, &e);
                    }
                    progress.abandon();
                    return Err(e);
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(())
    }

    fn deliver(
        &self,
        chunk: &DataSet,
        target: &DashTarget,
        dry_run_dir: Option<&Path>,
        ctx: &UploadContext,
    ) -> DashResult<Delivery> {
        let payload = create_gzipped_csv_stream(chunk)?;
        tracing::debug!(
            table = %ctx.table,
            chunk = ctx.chunk_index,
            rows = ctx.rows,
            bytes = payload.len(),
            "serialized chunk"
        );

        match dry_run_dir {
            Some(dir) => {
                let path = dry_run_path(dir, &target.table, ctx.chunk_index);
                fs::write(&path, &payload)?;
                Ok(Delivery::Written(path))
            }
            None => self.upload_csv(target, payload).map(Delivery::Uploaded),
        }
    }
}

/// Read a CSV file or stream and upload it to Dash in chunks.
///
/// - reads `source` lazily, at most `options.chunk_size` rows at a time
/// - applies `modify` to each chunk in place (e.g. to add a column)
/// - uploads each chunk, or writes `<dry_run_dir>/<table>.<i>.csv.gz` with `i` starting at 1
///
/// Returns the response bodies in chunk order; empty in dry-run mode.
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
///
/// use dash_upload::dash::{read_and_upload_file_to_dash, DashTarget, FileUploadOptions};
/// use dash_upload::types::{DataSet, DataType, Value};
///
/// # fn main() -> Result<(), dash_upload::DashError> {
/// let target = DashTarget::new("my-org", "api-key", "sales");
/// let options = FileUploadOptions {
///     chunk_size: 10_000,
///     dry_run_dir: Some(PathBuf::from("out")),
///     ..Default::default()
/// };
///
/// let mut add_source = |chunk: &mut DataSet| {
///     chunk.set_constant_column("source", DataType::Utf8, Value::text("sales.csv"));
/// };
/// let responses = read_and_upload_file_to_dash("sales.csv", &target, &options, Some(&mut add_source))?;
/// assert!(responses.is_empty());
/// # Ok(())
/// # }
/// ```
pub fn read_and_upload_file_to_dash<'a>(
    source: impl Into<CsvSource<'a>>,
    target: &DashTarget,
    options: &FileUploadOptions,
    modify: Option<&mut dyn FnMut(&mut DataSet)>,
) -> DashResult<Vec<String>> {
    DashClient::new()?.read_and_upload_file(source, target, options, modify)
}

/// Upload an in-memory dataset to Dash in chunks.
///
/// - opens `<log_dir>/<table>_<YYYYMMDDHHMM>.log`, stamped with the call start time
/// - casts `dtypes` columns, then (if `include_snapshot`) adds [`SNAPSHOT_COLUMN`] with the call
///   start time, identical in every row
/// - uploads each chunk and logs its response body, or writes
///   `<dry_run_dir>/<table>.<i>.csv.gz` with `i` starting at 0
///
/// # Examples
///
/// ```no_run
/// use dash_upload::dash::{upload_dataframe, DashTarget, DataFrameUploadOptions};
/// use dash_upload::types::{DataSet, DataType, Field, Schema, Value};
///
/// # fn main() -> Result<(), dash_upload::DashError> {
/// let ds = DataSet::new(
///     Schema::new(vec![Field::new("id", DataType::Utf8)]),
///     vec![vec![Value::text("1")], vec![Value::text("2")]],
/// );
/// let options = DataFrameUploadOptions {
///     dtypes: Some(vec![("id".to_string(), DataType::Int64)]),
///     ..Default::default()
/// };
/// upload_dataframe(ds, &DashTarget::new("my-org", "api-key", "ids"), &options)?;
/// # Ok(())
/// # }
/// ```
pub fn upload_dataframe(
    dataset: DataSet,
    target: &DashTarget,
    options: &DataFrameUploadOptions,
) -> DashResult<()> {
    DashClient::new()?.upload_dataframe(dataset, target, options)
}

/// `<table>_<YYYYMMDDHHMM>.log`
pub fn log_file_name(table: &str, started: NaiveDateTime) -> String {
    format!("{table}_{}.log", started.format(LOG_FILE_STAMP))
}

fn dry_run_path(dir: &Path, table: &str, index: usize) -> PathBuf {
    dir.join(format!("{table}.{index}.csv.gz"))
}

fn progress_bar(total_chunks: usize, table: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total_chunks as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} chunks ({elapsed})") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(table.to_string());
    bar
}

#[cfg(test)]
mod tests {
    use super::{dry_run_path, log_file_name};
    use chrono::NaiveDate;
    use std::path::Path;

    #[test]
    fn log_file_name_uses_minute_stamp() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 6)
            .unwrap();
        assert_eq!(log_file_name("sales", ts), "sales_202401020304.log");
    }

    #[test]
    fn dry_run_path_joins_table_and_index() {
        assert_eq!(
            dry_run_path(Path::new("/tmp/out"), "sales", 3),
            Path::new("/tmp/out/sales.3.csv.gz")
        );
    }
}
