//! Column type coercion for [`crate::types::DataSet`].

use crate::error::{DashError, DashResult};
use crate::export::csv::format_float;
use crate::types::{DataSet, DataType, Value};

/// Cast a single value to `to`.
///
/// Nulls stay null for every target except [`DataType::Int64`], which has no null-free
/// representation of a missing value and rejects it. Strings are trimmed before parsing.
pub fn cast_value(value: &Value, to: DataType) -> Result<Value, String> {
    match (value, to) {
        (Value::Null, DataType::Int64) => Err("cannot convert null to integer".to_string()),
        (Value::Null, _) => Ok(Value::Null),

        (Value::Int64(v), DataType::Int64) => Ok(Value::Int64(*v)),
        (Value::Int64(v), DataType::Float64) => Ok(Value::Float64(*v as f64)),
        (Value::Int64(v), DataType::Bool) => Ok(Value::Bool(*v != 0)),
        (Value::Int64(v), DataType::Utf8) => Ok(Value::Utf8(v.to_string())),

        (Value::Float64(v), DataType::Int64) => {
            if !v.is_finite() {
                return Err(format!("cannot convert non-finite float {v} to integer"));
            }
            let truncated = v.trunc();
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(format!("float {v} out of range for i64"));
            }
            Ok(Value::Int64(truncated as i64))
        }
        (Value::Float64(v), DataType::Float64) => Ok(Value::Float64(*v)),
        (Value::Float64(v), DataType::Bool) => Ok(Value::Bool(*v != 0.0)),
        (Value::Float64(v), DataType::Utf8) => Ok(Value::Utf8(format_float(*v))),

        (Value::Bool(b), DataType::Int64) => Ok(Value::Int64(i64::from(*b))),
        (Value::Bool(b), DataType::Float64) => Ok(Value::Float64(if *b { 1.0 } else { 0.0 })),
        (Value::Bool(b), DataType::Bool) => Ok(Value::Bool(*b)),
        (Value::Bool(b), DataType::Utf8) => Ok(Value::Utf8(if *b { "True" } else { "False" }.to_string())),

        (Value::Utf8(s), DataType::Int64) => s.trim().parse::<i64>().map(Value::Int64).map_err(|e| e.to_string()),
        (Value::Utf8(s), DataType::Float64) => s.trim().parse::<f64>().map(Value::Float64).map_err(|e| e.to_string()),
        (Value::Utf8(s), DataType::Bool) => parse_bool(s.trim()).map(Value::Bool),
        (Value::Utf8(s), DataType::Utf8) => Ok(Value::Utf8(s.clone())),
    }
}

/// Cast the named columns of `dataset` to the given types.
///
/// Every named column must exist; the first value that cannot be cast aborts with
/// [`DashError::ParseError`] (rows are reported 0-based, as positions in `dataset`).
pub fn cast_columns(mut dataset: DataSet, dtypes: &[(String, DataType)]) -> DashResult<DataSet> {
    let mut targets = Vec::with_capacity(dtypes.len());
    for (name, to) in dtypes {
        let idx = dataset.schema.index_of(name).ok_or_else(|| DashError::SchemaMismatch {
            message: format!(
                "cannot cast missing column '{name}'. columns={:?}",
                dataset.schema.field_names().collect::<Vec<_>>()
            ),
        })?;
        targets.push((idx, *to));
    }

    for &(idx, to) in &targets {
        for (row_idx, row) in dataset.rows.iter_mut().enumerate() {
            let cast = cast_value(&row[idx], to).map_err(|message| DashError::ParseError {
                row: row_idx,
                column: dataset.schema.fields[idx].name.clone(),
                raw: raw_text(&row[idx]),
                message,
            })?;
            row[idx] = cast;
        }
        dataset.schema.fields[idx].data_type = to;
    }

    Ok(dataset)
}

pub(crate) fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Int64(v) => v.to_string(),
        Value::Float64(v) => format_float(*v),
        Value::Bool(b) => b.to_string(),
        Value::Utf8(s) => s.clone(),
    }
}
