//! Reading CSV sources into in-memory datasets.
//!
//! - [`CsvChunkReader`] yields a source lazily as row-bounded [`crate::types::DataSet`] chunks
//! - [`read_csv`] loads a whole source at once, for callers that want to prepare a dataset before
//!   handing it to [`crate::dash::upload_dataframe`]

pub mod csv;

pub use self::csv::{read_csv, CsvChunkReader, CsvReadOptions, CsvSource, DEFAULT_CHUNK_SIZE};
