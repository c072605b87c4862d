//! Format sniffing over the head of a file.

use ingestor_protocol::{FormatGuess, FormatType};

/// Magic bytes at the start (and end) of a columnar file.
const COLUMNAR_MAGIC: &[u8; 4] = b"PAR1";

/// Delimiters tried in order of preference.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b'|', b';'];

/// Lines examined per candidate.
const MAX_SNIFF_LINES: usize = 50;

pub fn is_columnar(sample: &[u8]) -> bool {
    sample.len() >= COLUMNAR_MAGIC.len() && &sample[..COLUMNAR_MAGIC.len()] == COLUMNAR_MAGIC
}

/// Guess delimiter, quote, record separator and header presence of a text
/// sample. `truncated` means the sample was cut at a byte limit, so its last
/// line is ignored.
pub fn sniff_text(text: &str, truncated: bool) -> FormatGuess {
    let body = complete_lines(text, truncated);
    let record_separator = if body.contains("\r\n") { "\r\n" } else { "\n" };

    if looks_like_json(body) {
        return FormatGuess {
            format_type: FormatType::Json,
            record_separator: record_separator.to_string(),
            ..Default::default()
        };
    }

    let quote = guess_quote(body);
    let delimiter = CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .find(|&delim| consistent_field_count(body, delim, quote).is_some())
        .unwrap_or(b',');

    let rows = read_rows(body, delimiter, quote, MAX_SNIFF_LINES);
    let has_header = looks_like_header(&rows);

    tracing::debug!(
        delimiter = %(delimiter as char).escape_default(),
        quote = %(quote as char),
        has_header,
        "sniffed delimited text"
    );

    FormatGuess::csv(
        &(delimiter as char).to_string(),
        &(quote as char).to_string(),
        has_header,
    )
    .with_record_separator(record_separator)
}

fn complete_lines(text: &str, truncated: bool) -> &str {
    if !truncated {
        return text;
    }
    match text.rfind('\n') {
        Some(end) => &text[..=end],
        None => text,
    }
}

fn looks_like_json(text: &str) -> bool {
    let first = text.lines().map(str::trim).find(|line| !line.is_empty());
    match first {
        Some(line) if line.starts_with('{') => {
            serde_json::from_str::<serde_json::Value>(line).is_ok()
        }
        _ => false,
    }
}

/// `'` when more fields are wrapped in single quotes than in double quotes.
fn guess_quote(text: &str) -> u8 {
    let wrapped = |q: char| {
        text.lines()
            .flat_map(|line| line.split([',', '\t', '|', ';']))
            .map(str::trim)
            .filter(|field| field.len() >= 2 && field.starts_with(q) && field.ends_with(q))
            .count()
    };
    if wrapped('\'') > wrapped('"') {
        b'\''
    } else {
        b'"'
    }
}

fn reader(text: &str, delimiter: u8, quote: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(quote)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
}

pub(crate) fn read_rows(text: &str, delimiter: u8, quote: u8, limit: usize) -> Vec<Vec<String>> {
    reader(text, delimiter, quote)
        .records()
        .filter_map(Result::ok)
        .filter(|record| !(record.len() == 1 && record[0].trim().is_empty()))
        .take(limit)
        .map(|record| record.iter().map(str::to_string).collect())
        .collect()
}

/// Field count shared by every sampled row, when it is at least two.
fn consistent_field_count(text: &str, delimiter: u8, quote: u8) -> Option<usize> {
    let rows = read_rows(text, delimiter, quote, MAX_SNIFF_LINES);
    let first = rows.first()?.len();
    if first < 2 || rows.iter().any(|row| row.len() != first) {
        return None;
    }
    Some(first)
}

fn non_numeric_ratio(row: &[String]) -> f64 {
    if row.is_empty() {
        return 0.0;
    }
    let non_numeric = row
        .iter()
        .filter(|field| field.trim().parse::<f64>().is_err())
        .count();
    non_numeric as f64 / row.len() as f64
}

fn is_identifier_like(field: &str) -> bool {
    let field = field.trim();
    let mut chars = field.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ' ' | '-' | '.'))
}

/// The first row is a header when it is mostly non-numeric and the rows
/// below it are less so. For all-text samples, fall back to whether the first
/// row reads like distinct column names.
fn looks_like_header(rows: &[Vec<String>]) -> bool {
    let Some((first, rest)) = rows.split_first() else {
        return false;
    };
    let first_ratio = non_numeric_ratio(first);
    if first_ratio <= 0.7 {
        return false;
    }
    if rest.is_empty() {
        return first.iter().all(|f| is_identifier_like(f));
    }
    let rest_ratio = rest.iter().map(|row| non_numeric_ratio(row)).sum::<f64>() / rest.len() as f64;
    if rest_ratio < first_ratio {
        return true;
    }
    let mut names: Vec<&str> = first.iter().map(|f| f.trim()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    names.len() == total && first.iter().all(|f| is_identifier_like(f))
}
