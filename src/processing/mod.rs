//! In-memory dataset preparation ahead of upload.
//!
//! Currently implemented:
//!
//! - [`cast_columns()`]: coerce named columns to a [`crate::types::DataType`]
//! - [`chunk_ranges()`]: contiguous row ranges backing [`crate::types::DataSet::chunks`]
//!
//! ## Example: cast → chunk
//!
//! ```rust
//! use dash_upload::processing::cast_columns;
//! use dash_upload::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let ds = DataSet::new(
//!     Schema::new(vec![Field::new("a", DataType::Utf8)]),
//!     vec![
//!         vec![Value::text("1")],
//!         vec![Value::text("2")],
//!         vec![Value::text("3")],
//!     ],
//! );
//!
//! let cast = cast_columns(ds, &[("a".to_string(), DataType::Int64)]).unwrap();
//! assert_eq!(cast.rows[2][0], Value::Int64(3));
//!
//! let sizes: Vec<usize> = cast.chunks(2).map(|c| c.row_count()).collect();
//! assert_eq!(sizes, vec![2, 1]);
//! ```

pub mod cast;
pub mod chunk;

pub use cast::{cast_columns, cast_value};
pub use chunk::chunk_ranges;
