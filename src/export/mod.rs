//! Serialization of in-memory datasets into upload payloads.
//!
//! - [`csv`]: gzip-compressed CSV, the only payload format the Dash API accepts

pub mod csv;

pub use self::csv::{create_gzipped_csv_stream, write_csv};
