//! Field inference from decoded text samples.
//!
//! Types are found by elimination: every column starts as a candidate for
//! each typed interpretation and each non-empty value removes the ones it
//! contradicts. The most specific survivor wins; a column with no survivor
//! (or no values) is a string.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ingestor_protocol::defaults::MAX_SAMPLE_ROWS;
use ingestor_protocol::{FieldGuess, FieldSpec, FieldType, FormatGuess, FormatType, IngestError, IngestResult};

use crate::sniff::read_rows;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Candidate interpretations, most specific first.
const CANDIDATES: [FieldType; 4] = [
    FieldType::Long,
    FieldType::Double,
    FieldType::Boolean,
    FieldType::Date,
];

fn admits(field_type: FieldType, value: &str) -> bool {
    match field_type {
        FieldType::Long => value.parse::<i64>().is_ok(),
        FieldType::Double => value.parse::<f64>().is_ok_and(f64::is_finite),
        FieldType::Boolean => value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false"),
        FieldType::Date => is_date(value),
        _ => true,
    }
}

fn is_date(value: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        || DateTime::parse_from_rfc3339(value).is_ok()
}

/// Semantic type of a column from its sampled values.
pub fn infer_type<'a, I>(values: I) -> FieldType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut alive = CANDIDATES.to_vec();
    let mut seen = false;
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        seen = true;
        alive.retain(|&candidate| admits(candidate, value));
        if alive.is_empty() {
            break;
        }
    }
    if !seen {
        return FieldType::String;
    }
    alive.first().copied().unwrap_or(FieldType::String)
}

/// Sample rows and typed columns from decoded delimited text.
pub fn infer_delimited(text: &str, format: &FormatGuess) -> IngestResult<FieldGuess> {
    let delimiter = format.delimiter_byte()?;
    let quote = format.quote_byte()?.unwrap_or(b'"');
    let limit = MAX_SAMPLE_ROWS + usize::from(format.has_header);
    let mut rows = read_rows(text, delimiter, quote, limit);

    let header = if format.has_header && !rows.is_empty() {
        Some(rows.remove(0))
    } else {
        None
    };
    let width = header
        .as_ref()
        .map(Vec::len)
        .into_iter()
        .chain(rows.iter().map(Vec::len))
        .max()
        .unwrap_or(0);

    let names = column_names(header, width);
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let values = rows
                .iter()
                .map(|row| row.get(index).map(String::as_str).unwrap_or(""));
            FieldSpec::new(name, infer_type(values))
        })
        .collect();

    Ok(FieldGuess {
        sample: rows,
        columns,
    })
}

fn column_names(header: Option<Vec<String>>, width: usize) -> Vec<String> {
    let header = header.unwrap_or_default();
    (0..width)
        .map(|index| {
            header
                .get(index)
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("field_{}", index + 1))
        })
        .collect()
}

/// Sample rows and typed columns from JSON lines; keys of the first object
/// define the columns.
pub fn infer_json_lines(text: &str) -> IngestResult<FieldGuess> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|value| match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .take(MAX_SAMPLE_ROWS)
        .collect();

    let names: Vec<String> = objects
        .first()
        .ok_or_else(|| IngestError::unsupported_format("no JSON object found in sample"))?
        .keys()
        .cloned()
        .collect();

    let sample: Vec<Vec<String>> = objects
        .iter()
        .map(|object| {
            names
                .iter()
                .map(|name| match object.get(name) {
                    None | Some(serde_json::Value::Null) => String::new(),
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                })
                .collect()
        })
        .collect();

    let columns = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            FieldSpec::new(
                name.clone(),
                infer_type(sample.iter().map(|row| row[index].as_str())),
            )
        })
        .collect();

    Ok(FieldGuess { sample, columns })
}

/// Dispatch on the serialization of a text sample.
pub fn infer_text(text: &str, format: &FormatGuess) -> IngestResult<FieldGuess> {
    match format.format_type {
        FormatType::Csv => infer_delimited(text, format),
        FormatType::Json => infer_json_lines(text),
        FormatType::Parquet => Err(IngestError::unsupported_format(
            "columnar data has no text sample to infer fields from",
        )),
    }
}
