//! CSV + gzip serialization of a [`DataSet`].
//!
//! Output rules:
//!
//! - header row first, no index column, `\n` line endings
//! - non-numeric quoting driven by the value type: header names, [`Value::Utf8`] and
//!   [`Value::Null`] are quoted, [`Value::Int64`], [`Value::Float64`] and [`Value::Bool`] are bare
//! - floats keep a trailing `.0` when integral (`1.0`), booleans are `True` / `False`

use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::DashResult;
use crate::types::{DataSet, Value};

/// Write `dataset` as UTF-8 CSV into `writer`.
pub fn write_csv<W: Write>(dataset: &DataSet, writer: W) -> DashResult<()> {
    // Quoting is decided per value below, so the csv writer itself never quotes.
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(dataset.schema.field_names().map(quote_text))?;
    for row in &dataset.rows {
        wtr.write_record(row.iter().map(render_value))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize `dataset` to a gzip-compressed, UTF-8 CSV byte buffer.
///
/// The buffer is a single gzip member and is identical for identical input. It is not split, so
/// callers chunk the dataset first (see [`DataSet::chunks`]) to stay under the upload size limit.
pub fn create_gzipped_csv_stream(dataset: &DataSet) -> DashResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    write_csv(dataset, &mut encoder)?;
    Ok(encoder.finish()?)
}

/// Format a float the way dataframe CSV writers do: shortest round-trip digits, a trailing `.0`
/// on integral values, and an exponent outside `[1e-4, 1e16)`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let formatted = format!("{v:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => formatted,
        };
    }

    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => quote_text(""),
        Value::Int64(v) => v.to_string(),
        Value::Float64(v) if v.is_nan() => quote_text(""),
        Value::Float64(v) => format_float(*v),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Utf8(s) => quote_text(s),
    }
}

fn quote_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::{format_float, write_csv};
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    #[test]
    fn float_formatting_matches_dataframe_output() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-0.0), "-0.0");
        assert_eq!(format_float(98.5), "98.5");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn writes_typed_quoting_and_escapes_quotes() {
        let ds = DataSet::new(
            Schema::new(vec![
                Field::new("id", DataType::Int64),
                Field::new("name", DataType::Utf8),
                Field::new("score", DataType::Float64),
                Field::new("active", DataType::Bool),
            ]),
            vec![
                vec![
                    Value::Int64(1),
                    Value::text("Ada \"the first\", Countess"),
                    Value::Float64(98.0),
                    Value::Bool(true),
                ],
                vec![Value::Int64(2), Value::Null, Value::Float64(f64::NAN), Value::Bool(false)],
            ],
        );

        let mut out = Vec::new();
        write_csv(&ds, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "\"id\",\"name\",\"score\",\"active\"\n\
             1,\"Ada \"\"the first\"\", Countess\",98.0,True\n\
             2,\"\",\"\",False\n"
        );
    }

    #[test]
    fn empty_dataset_writes_header_only() {
        let ds = DataSet::new(Schema::new(vec![Field::new("a", DataType::Utf8)]), vec![]);
        let mut out = Vec::new();
        write_csv(&ds, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"a\"\n");
    }
}
