//! Core data model types.
//!
//! Uploads operate on an in-memory [`DataSet`]: a [`Schema`] (a list of typed [`Field`]s) plus
//! row-major [`Value`] storage.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{DashError, DashResult};
use crate::processing::chunk_ranges;

/// Logical data type for a schema field.
///
/// Parses from the usual dataframe dtype names, so a coercion map can be written as
/// `{"id": "int", "name": "str"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int64" | "integer" | "i64" => Ok(Self::Int64),
            "float" | "float64" | "double" | "f64" => Ok(Self::Float64),
            "bool" | "boolean" => Ok(Self::Bool),
            "str" | "string" | "object" | "utf8" => Ok(Self::Utf8),
            other => Err(format!("unknown data type '{other}'")),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Utf8 => "utf8",
        };
        f.write_str(name)
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A list of fields describing the shape of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Convenience constructor for [`Value::Utf8`].
    pub fn text(s: impl Into<String>) -> Self {
        Self::Utf8(s.into())
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. There is no
/// index column; row order is the only identity a row has.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Borrow every value of the named column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Replace the column named `field.name`, or append it if absent.
    ///
    /// `values` must hold exactly one value per row.
    pub fn set_column(&mut self, field: Field, values: Vec<Value>) -> DashResult<()> {
        if values.len() != self.row_count() {
            return Err(DashError::SchemaMismatch {
                message: format!(
                    "column '{}' has {} values but dataset has {} rows",
                    field.name,
                    values.len(),
                    self.row_count()
                ),
            });
        }

        match self.schema.index_of(&field.name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
                self.schema.fields[idx] = field;
            }
            None => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
                self.schema.fields.push(field);
            }
        }
        Ok(())
    }

    /// Replace or append a column that holds `value` in every row.
    pub fn set_constant_column(&mut self, name: impl Into<String>, data_type: DataType, value: Value) {
        let field = Field::new(name, data_type);
        match self.schema.index_of(&field.name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
                self.schema.fields[idx] = field;
            }
            None => {
                for row in &mut self.rows {
                    row.push(value.clone());
                }
                self.schema.fields.push(field);
            }
        }
    }

    /// Copy `len` rows starting at `start` into a new dataset with the same schema.
    ///
    /// The range is clamped to the available rows.
    pub fn slice(&self, start: usize, len: usize) -> Self {
        let start = start.min(self.rows.len());
        let end = start.saturating_add(len).min(self.rows.len());
        Self {
            schema: self.schema.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// Split into contiguous chunks of at most `chunk_size` rows, preserving row order.
    ///
    /// An empty dataset yields no chunks.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size == 0`.
    pub fn chunks(&self, chunk_size: usize) -> impl Iterator<Item = DataSet> + '_ {
        assert!(chunk_size > 0, "chunk_size must be > 0");
        chunk_ranges(self.row_count(), chunk_size)
            .into_iter()
            .map(move |range| self.slice(range.start, range.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataSet {
        DataSet::new(
            Schema::new(vec![
                Field::new("id", DataType::Int64),
                Field::new("name", DataType::Utf8),
            ]),
            vec![
                vec![Value::Int64(1), Value::text("a")],
                vec![Value::Int64(2), Value::text("b")],
                vec![Value::Int64(3), Value::text("c")],
            ],
        )
    }

    #[test]
    fn data_type_parses_dtype_names() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Int64);
        assert_eq!("Float64".parse::<DataType>().unwrap(), DataType::Float64);
        assert_eq!("object".parse::<DataType>().unwrap(), DataType::Utf8);
        assert_eq!("boolean".parse::<DataType>().unwrap(), DataType::Bool);
        assert!("decimal".parse::<DataType>().is_err());
    }

    #[test]
    fn data_type_deserializes_from_json_map() {
        let dtypes: std::collections::BTreeMap<String, DataType> =
            serde_json::from_str(r#"{"a": "int", "b": "str"}"#).unwrap();
        assert_eq!(dtypes["a"], DataType::Int64);
        assert_eq!(dtypes["b"], DataType::Utf8);

        let err = serde_json::from_str::<DataType>(r#""complex""#).unwrap_err();
        assert!(err.to_string().contains("unknown data type"));
    }

    #[test]
    fn set_constant_column_appends_then_replaces() {
        let mut ds = sample();
        ds.set_constant_column("ts", DataType::Utf8, Value::text("t0"));
        assert_eq!(ds.column_count(), 3);
        assert!(ds.column("ts").unwrap().iter().all(|v| **v == Value::text("t0")));

        ds.set_constant_column("ts", DataType::Utf8, Value::text("t1"));
        assert_eq!(ds.column_count(), 3);
        assert!(ds.column("ts").unwrap().iter().all(|v| **v == Value::text("t1")));
    }

    #[test]
    fn set_column_rejects_wrong_length() {
        let mut ds = sample();
        let err = ds
            .set_column(Field::new("x", DataType::Int64), vec![Value::Int64(1)])
            .unwrap_err();
        assert!(err.to_string().contains("has 1 values but dataset has 3 rows"));
    }

    #[test]
    fn chunks_preserve_order_without_gaps() {
        let ds = sample();
        let chunks: Vec<DataSet> = ds.chunks(2).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].row_count(), 2);
        assert_eq!(chunks[1].row_count(), 1);

        let rejoined: Vec<Vec<Value>> = chunks.into_iter().flat_map(|c| c.rows).collect();
        assert_eq!(rejoined, ds.rows);
    }

    #[test]
    fn slice_clamps_to_available_rows() {
        let ds = sample();
        assert_eq!(ds.slice(2, 10).row_count(), 1);
        assert_eq!(ds.slice(5, 1).row_count(), 0);
    }
}
