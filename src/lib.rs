//! `dash-upload` is a thin client for loading tabular data into the Dash data-ingestion API.
//!
//! Data is split into row-bounded chunks, each chunk is serialized as gzip-compressed UTF-8 CSV,
//! and every chunk is POSTed to `https://api.comodash.io/v1/data-input-file` with the organisation,
//! table and API key in request headers. A dry-run mode writes the compressed chunks to a local
//! directory instead.
//!
//! ## Entry points
//!
//! - [`dash::read_and_upload_file_to_dash`]: read a CSV file or stream lazily, optionally modify
//!   each chunk, upload; returns the response bodies
//! - [`dash::upload_dataframe`]: upload an in-memory [`types::DataSet`], with optional column
//!   casting and a `snapshot_timestamp` column; responses go to a per-call log file
//! - [`dash::upload_csv_to_dash`]: POST one already-serialized payload
//! - [`export::create_gzipped_csv_stream`]: serialize a dataset without uploading it
//!
//! Everything is synchronous and sequential. Nothing is retried: the first failure is returned and
//! chunks that were already uploaded stay uploaded.
//!
//! ## Quick example: dry run of a CSV file
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use dash_upload::dash::{read_and_upload_file_to_dash, DashTarget, FileUploadOptions};
//!
//! # fn main() -> Result<(), dash_upload::DashError> {
//! let target = DashTarget::new("my-org", "my-api-key", "people");
//! let options = FileUploadOptions {
//!     chunk_size: 2,
//!     dry_run_dir: Some(PathBuf::from("out")),
//!     ..Default::default()
//! };
//!
//! // Writes out/people.1.csv.gz, out/people.2.csv.gz, ...
//! let responses = read_and_upload_file_to_dash("people.csv", &target, &options, None)?;
//! assert!(responses.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Serialization example
//!
//! ```rust
//! use std::io::Read;
//!
//! use dash_upload::export::create_gzipped_csv_stream;
//! use dash_upload::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let ds = DataSet::new(
//!     Schema::new(vec![
//!         Field::new("id", DataType::Int64),
//!         Field::new("name", DataType::Utf8),
//!     ]),
//!     vec![vec![Value::Int64(1), Value::text("Ada")]],
//! );
//!
//! let gz = create_gzipped_csv_stream(&ds).unwrap();
//! let mut text = String::new();
//! flate2::read::GzDecoder::new(gz.as_slice()).read_to_string(&mut text).unwrap();
//! assert_eq!(text, "\"id\",\"name\"\n1,\"Ada\"\n");
//! ```
//!
//! ## Modules
//!
//! - [`dash`]: HTTP client and chunked upload entry points
//! - [`export`]: CSV + gzip serialization
//! - [`ingestion`]: chunked CSV reading with type inference
//! - [`processing`]: column casting and chunk splitting
//! - [`observability`]: upload observers and the log file sink
//! - [`types`]: schema + in-memory dataset types
//! - [`error`]: the crate error type

pub mod dash;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod observability;
pub mod processing;
pub mod types;

pub use error::{DashError, DashResult};
