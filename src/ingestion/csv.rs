//! Chunked CSV reading.
//!
//! [`CsvChunkReader`] lazily yields a source as row-bounded [`DataSet`] chunks, in order, with no
//! overlap and no gaps. Each chunk is built in one of two ways:
//!
//! - with a [`Schema`]: the named columns are selected (order can differ from the file) and each
//!   value is parsed to the field type;
//! - without one: every column is kept and its type is inferred from the chunk's values
//!   (Int64, then Float64, then Bool, falling back to Utf8). Integer columns with missing cells
//!   are read as Float64.
//!
//! Rows shorter than the header are padded with nulls; longer rows are an error.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};

use crate::error::{DashError, DashResult};
use crate::processing::cast::parse_bool;
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 30_000;

/// Cell values read as null when column types are inferred.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_VALUES: &[&str] = &["True", "true", "TRUE"];
const FALSE_VALUES: &[&str] = &["False", "false", "FALSE"];

/// Options controlling how a CSV source is decoded and chunked.
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// Source text encoding, as a WHATWG label (`utf-8`, `latin1`, `windows-1252`, ...).
    pub encoding: String,
    /// Maximum number of rows per chunk. Must be > 0.
    pub chunk_size: usize,
    /// If `None`, every column is kept and its type inferred per chunk.
    pub schema: Option<Schema>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            schema: None,
        }
    }
}

/// Where CSV data comes from: a path on disk or an already-open byte stream.
pub enum CsvSource<'a> {
    /// Path to an uncompressed CSV file.
    Path(PathBuf),
    /// Any byte stream holding uncompressed CSV.
    Reader(Box<dyn Read + 'a>),
}

impl<'a> CsvSource<'a> {
    /// Wrap a byte stream.
    pub fn reader(reader: impl Read + 'a) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Open the source and start a chunked read.
    pub fn open(self, options: &CsvReadOptions) -> DashResult<CsvChunkReader<Box<dyn Read + 'a>>> {
        let reader: Box<dyn Read + 'a> = match self {
            Self::Path(path) => Box::new(File::open(path)?),
            Self::Reader(reader) => reader,
        };
        CsvChunkReader::from_reader(reader, options)
    }
}

impl fmt::Debug for CsvSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<PathBuf> for CsvSource<'_> {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for CsvSource<'_> {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for CsvSource<'_> {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

/// Lazily reads a CSV source as a sequence of [`DataSet`] chunks.
///
/// Iteration stops after the first error.
pub struct CsvChunkReader<R: Read> {
    rdr: csv::Reader<DecodeReaderBytes<R, Vec<u8>>>,
    headers: Vec<String>,
    /// Schema and the header position of each of its fields.
    projection: Option<(Schema, Vec<usize>)>,
    chunk_size: usize,
    rows_read: usize,
    done: bool,
}

impl<R: Read> CsvChunkReader<R> {
    /// Start a chunked read over `reader`.
    ///
    /// Reads the header row immediately, so an empty source or a schema naming a missing column
    /// fails here rather than on the first chunk.
    pub fn from_reader(reader: R, options: &CsvReadOptions) -> DashResult<Self> {
        if options.chunk_size == 0 {
            return Err(DashError::invalid_options("chunk_size must be > 0"));
        }

        let encoding = Encoding::for_label(options.encoding.trim().as_bytes()).ok_or_else(|| {
            DashError::invalid_options(format!("unknown encoding '{}'", options.encoding))
        })?;
        // UTF-8 sources pass through untouched so invalid bytes fail in the csv reader instead
        // of being replaced.
        let decoded = DecodeReaderBytesBuilder::new()
            .encoding((encoding != UTF_8).then_some(encoding))
            .utf8_passthru(true)
            .strip_bom(true)
            .build(reader);

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(decoded);
        let raw_headers = rdr.headers()?.clone();
        if raw_headers.is_empty() {
            return Err(DashError::SchemaMismatch {
                message: "no columns to parse from input".to_string(),
            });
        }
        let headers = dedupe_headers(&raw_headers);

        let projection = match &options.schema {
            Some(schema) => Some((schema.clone(), project(schema, &headers)?)),
            None => None,
        };

        Ok(Self {
            rdr,
            headers,
            projection,
            chunk_size: options.chunk_size,
            rows_read: 0,
            done: false,
        })
    }

    /// Column names as read from the header row, with duplicates and blanks renamed.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn build_chunk(&self, records: &[StringRecord], first_row: usize) -> DashResult<DataSet> {
        match &self.projection {
            Some((schema, col_idxs)) => {
                let mut rows = Vec::with_capacity(records.len());
                for (offset, record) in records.iter().enumerate() {
                    let user_row = first_row + offset;
                    let mut row = Vec::with_capacity(schema.fields.len());
                    for (field, &csv_idx) in schema.fields.iter().zip(col_idxs) {
                        let raw = record.get(csv_idx).unwrap_or("");
                        row.push(parse_typed_value(user_row, &field.name, field.data_type, raw)?);
                    }
                    rows.push(row);
                }
                Ok(DataSet::new(schema.clone(), rows))
            }
            None => Ok(infer_chunk(&self.headers, records)),
        }
    }
}

impl<R: Read> Iterator for CsvChunkReader<R> {
    type Item = DashResult<DataSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut records = Vec::with_capacity(self.chunk_size.min(4_096));
        let mut record = StringRecord::new();
        while records.len() < self.chunk_size {
            match self.rdr.read_record(&mut record) {
                // Short rows are padded with nulls; long rows have nowhere to go.
                Ok(true) if record.len() > self.headers.len() => {
                    self.done = true;
                    return Some(Err(DashError::SchemaMismatch {
                        message: format!(
                            "row {}: expected {} fields, saw {}",
                            self.rows_read + records.len() + 2,
                            self.headers.len(),
                            record.len()
                        ),
                    }));
                }
                Ok(true) => records.push(record.clone()),
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }

        if records.is_empty() {
            return None;
        }

        // 1-based row numbers for users; +1 again because the header is row 1.
        let first_row = self.rows_read + 2;
        self.rows_read += records.len();
        tracing::debug!(rows = records.len(), first_row, "read csv chunk");

        let chunk = self.build_chunk(&records, first_row);
        if chunk.is_err() {
            self.done = true;
        }
        Some(chunk)
    }
}

/// Read an entire CSV source into one [`DataSet`].
///
/// Column types are inferred over the whole input when `options.schema` is `None`. A source with a
/// header but no rows yields an empty dataset of [`DataType::Utf8`] columns (or the schema).
pub fn read_csv<'a>(source: impl Into<CsvSource<'a>>, options: &CsvReadOptions) -> DashResult<DataSet> {
    let options = CsvReadOptions {
        chunk_size: usize::MAX,
        ..options.clone()
    };
    let mut chunks = source.into().open(&options)?;
    let empty_schema = match &options.schema {
        Some(schema) => schema.clone(),
        None => Schema::new(
            chunks
                .headers()
                .iter()
                .map(|h| Field::new(h.clone(), DataType::Utf8))
                .collect(),
        ),
    };

    match chunks.next() {
        Some(chunk) => chunk,
        None => Ok(DataSet::new(empty_schema, Vec::new())),
    }
}

fn dedupe_headers(raw: &StringRecord) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, name) in raw.iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

// Map schema fields -> CSV column indexes (allows re-ordered CSV columns).
fn project(schema: &Schema, headers: &[String]) -> DashResult<Vec<usize>> {
    schema
        .fields
        .iter()
        .map(|field| {
            headers
                .iter()
                .position(|h| *h == field.name)
                .ok_or_else(|| DashError::SchemaMismatch {
                    message: format!(
                        "missing required column '{}'. headers={headers:?}",
                        field.name
                    ),
                })
        })
        .collect()
}

fn parse_typed_value(row: usize, column: &str, data_type: DataType, raw: &str) -> DashResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| DashError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_error),
    }
}

fn infer_chunk(headers: &[String], records: &[StringRecord]) -> DataSet {
    let mut fields = Vec::with_capacity(headers.len());
    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(headers.len());

    for (idx, name) in headers.iter().enumerate() {
        let raw: Vec<&str> = records.iter().map(|r| r.get(idx).unwrap_or("")).collect();
        let data_type = infer_type(&raw);
        columns.push(raw.iter().map(|s| infer_value(s, data_type)).collect());
        fields.push(Field::new(name.clone(), data_type));
    }

    let mut rows: Vec<Vec<Value>> = (0..records.len())
        .map(|_| Vec::with_capacity(headers.len()))
        .collect();
    for column in columns {
        for (row, value) in rows.iter_mut().zip(column) {
            row.push(value);
        }
    }

    DataSet::new(Schema::new(fields), rows)
}

fn is_na(raw: &str) -> bool {
    NA_VALUES.contains(&raw)
}

fn infer_type(raw: &[&str]) -> DataType {
    let present: Vec<&str> = raw.iter().copied().filter(|s| !is_na(s)).collect();
    if present.is_empty() {
        return DataType::Utf8;
    }
    // Integer columns with missing cells read as Float64.
    if present.iter().all(|s| s.trim().parse::<i64>().is_ok()) {
        if present.len() < raw.len() {
            DataType::Float64
        } else {
            DataType::Int64
        }
    } else if present.iter().all(|s| s.trim().parse::<f64>().is_ok()) {
        DataType::Float64
    } else if present
        .iter()
        .all(|s| TRUE_VALUES.contains(s) || FALSE_VALUES.contains(s))
    {
        DataType::Bool
    } else {
        DataType::Utf8
    }
}

// Only called with the type `infer_type` chose for this column, so the parses cannot fail.
fn infer_value(raw: &str, data_type: DataType) -> Value {
    if is_na(raw) {
        return Value::Null;
    }
    match data_type {
        DataType::Int64 => raw.trim().parse().map(Value::Int64).unwrap_or(Value::Null),
        DataType::Float64 => raw.trim().parse().map(Value::Float64).unwrap_or(Value::Null),
        DataType::Bool => Value::Bool(TRUE_VALUES.contains(&raw)),
        DataType::Utf8 => Value::Utf8(raw.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks_of(input: &str, chunk_size: usize) -> Vec<DataSet> {
        let options = CsvReadOptions {
            chunk_size,
            ..Default::default()
        };
        CsvChunkReader::from_reader(input.as_bytes(), &options)
            .unwrap()
            .collect::<DashResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn infers_column_types_per_chunk() {
        let chunks = chunks_of("id,score,flag,name\n1,1.5,True,a\n2,,False,b\n", 10);
        assert_eq!(chunks.len(), 1);
        let types: Vec<DataType> = chunks[0].schema.fields.iter().map(|f| f.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::Int64, DataType::Float64, DataType::Bool, DataType::Utf8]
        );
        assert_eq!(chunks[0].rows[1][1], Value::Null);
        assert_eq!(chunks[0].rows[1][2], Value::Bool(false));
    }

    #[test]
    fn inference_is_independent_between_chunks() {
        let chunks = chunks_of("v\n1\n2\nx\n", 2);
        assert_eq!(chunks[0].schema.fields[0].data_type, DataType::Int64);
        assert_eq!(chunks[1].schema.fields[0].data_type, DataType::Utf8);
    }

    #[test]
    fn na_markers_read_as_null() {
        let chunks = chunks_of("a,b\nNA,x\n3,null\n", 10);
        assert_eq!(chunks[0].rows[0][0], Value::Null);
        assert_eq!(chunks[0].rows[1][1], Value::Null);
    }

    #[test]
    fn duplicate_and_blank_headers_are_renamed() {
        let chunks = chunks_of("a,a,\n1,2,3\n", 10);
        let names: Vec<&str> = chunks[0].schema.field_names().collect();
        assert_eq!(names, vec!["a", "a.1", "Unnamed: 2"]);
    }

    #[test]
    fn header_only_input_yields_no_chunks() {
        assert!(chunks_of("a,b\n", 5).is_empty());
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = CsvChunkReader::from_reader("".as_bytes(), &CsvReadOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("no columns to parse"));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let options = CsvReadOptions {
            chunk_size: 0,
            ..Default::default()
        };
        let err = CsvChunkReader::from_reader("a\n1\n".as_bytes(), &options).err().unwrap();
        assert!(err.to_string().contains("chunk_size must be > 0"));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let options = CsvReadOptions {
            encoding: "klingon".to_string(),
            ..Default::default()
        };
        let err = CsvChunkReader::from_reader("a\n1\n".as_bytes(), &options).err().unwrap();
        assert!(err.to_string().contains("unknown encoding 'klingon'"));
    }

    #[test]
    fn decodes_latin1_source() {
        let bytes: &[u8] = b"name\nJos\xe9\n";
        let options = CsvReadOptions {
            encoding: "latin1".to_string(),
            ..Default::default()
        };
        let chunks: Vec<DataSet> = CsvChunkReader::from_reader(bytes, &options)
            .unwrap()
            .collect::<DashResult<_>>()
            .unwrap();
        assert_eq!(chunks[0].rows[0][0], Value::text("José"));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let bytes: &[u8] = b"name\nJos\xe9\n";
        let mut reader = CsvChunkReader::from_reader(bytes, &CsvReadOptions::default()).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DashError::Csv(_)), "{err}");
        assert!(reader.next().is_none());
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let chunks = chunks_of("\u{feff}name\nAda\n", 10);
        assert_eq!(chunks[0].schema.fields[0].name, "name");
    }

    #[test]
    fn integer_column_with_missing_cells_reads_as_float() {
        let chunks = chunks_of("a,b\n1,4\n,5\n3,6\n", 10);
        assert_eq!(chunks[0].schema.fields[0].data_type, DataType::Float64);
        assert_eq!(chunks[0].schema.fields[1].data_type, DataType::Int64);
        assert_eq!(chunks[0].rows[0][0], Value::Float64(1.0));
        assert_eq!(chunks[0].rows[1][0], Value::Null);
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let chunks = chunks_of("a,b\n1,x\n2\n", 10);
        assert_eq!(chunks[0].row_count(), 2);
        assert_eq!(chunks[0].rows[1], vec![Value::Int64(2), Value::Null]);

        let options = CsvReadOptions {
            schema: Some(Schema::new(vec![
                Field::new("b", DataType::Utf8),
                Field::new("a", DataType::Int64),
            ])),
            ..Default::default()
        };
        let chunk = CsvChunkReader::from_reader("a,b\n7\n".as_bytes(), &options)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(chunk.rows[0], vec![Value::Null, Value::Int64(7)]);
    }

    #[test]
    fn long_rows_are_rejected() {
        let mut reader =
            CsvChunkReader::from_reader("a,b\n1,x\n2,y,z\n".as_bytes(), &CsvReadOptions::default())
                .unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DashError::SchemaMismatch { .. }), "{err}");
        assert!(err.to_string().contains("row 3: expected 2 fields, saw 3"), "{err}");
        assert!(reader.next().is_none());
    }

    #[test]
    fn schema_projection_parses_and_reorders() {
        let options = CsvReadOptions {
            schema: Some(Schema::new(vec![
                Field::new("id", DataType::Int64),
                Field::new("name", DataType::Utf8),
            ])),
            ..Default::default()
        };
        let mut reader =
            CsvChunkReader::from_reader("name,extra,id\nAda,z,1\n".as_bytes(), &options).unwrap();
        let chunk = reader.next().unwrap().unwrap();
        assert_eq!(chunk.rows[0], vec![Value::Int64(1), Value::text("Ada")]);
    }

    #[test]
    fn schema_parse_error_reports_user_row() {
        let options = CsvReadOptions {
            schema: Some(Schema::new(vec![Field::new("id", DataType::Int64)])),
            chunk_size: 1,
            ..Default::default()
        };
        let results: Vec<DashResult<DataSet>> =
            CsvChunkReader::from_reader("id\n1\nnope\n".as_bytes(), &options)
                .unwrap()
                .collect();
        assert_eq!(results.len(), 2);
        let msg = results[1].as_ref().unwrap_err().to_string();
        assert!(msg.contains("row 3 column 'id'"), "{msg}");
    }

    #[test]
    fn read_csv_loads_whole_input() {
        let ds = read_csv(CsvSource::reader("a,b\n1,x\n2,y\n3,z\n".as_bytes()), &CsvReadOptions::default())
            .unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.schema.fields[0].data_type, DataType::Int64);
    }
}
