//! Pipeline descriptor types (the UI transport's JSON shapes)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::defaults::DEFAULT_SPLIT_SEPARATOR;
use crate::error::{IngestError, IngestResult};

// ============================================================================
// Canonical Enums
// ============================================================================

/// Semantic type of a field, as understood by every sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string (default/fallback)
    #[default]
    String,
    /// Tokenised free text
    Text,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "bigint")]
    Long,
    Float,
    Double,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "tdate", alias = "timestamp")]
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Int | FieldType::Long | FieldType::Float | FieldType::Double
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(FieldType::String),
            "text" => Ok(FieldType::Text),
            "int" | "integer" => Ok(FieldType::Int),
            "long" | "bigint" => Ok(FieldType::Long),
            "float" => Ok(FieldType::Float),
            "double" => Ok(FieldType::Double),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "date" | "tdate" | "timestamp" => Ok(FieldType::Date),
            _ => Err(format!(
                "Invalid field type: '{}'. Expected: string, text, int, long, float, double, boolean, date",
                s
            )),
        }
    }
}

/// Discriminant of [`SourceDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    File,
    Table,
    Query,
    Rdbms,
    Kafka,
    Crm,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Table => "table",
            SourceKind::Query => "query",
            SourceKind::Rdbms => "rdbms",
            SourceKind::Kafka => "stream/kafka",
            SourceKind::Crm => "stream/sfdc",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discriminant of [`SinkTarget`] (the `outputFormat` tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    File,
    Table,
    Database,
    Index,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::File => "file",
            SinkKind::Table => "table",
            SinkKind::Database => "database",
            SinkKind::Index => "index",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(SinkKind::File),
            "table" => Ok(SinkKind::Table),
            "database" => Ok(SinkKind::Database),
            "index" => Ok(SinkKind::Index),
            other => Err(format!(
                "Unsupported output format: '{}'. Expected: file, table, database, index",
                other
            )),
        }
    }
}

/// Serialization format of a byte-oriented source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    #[default]
    Csv,
    Parquet,
    Json,
}

impl FormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatType::Csv => "csv",
            FormatType::Parquet => "parquet",
            FormatType::Json => "json",
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Field Model
// ============================================================================

/// Per-field transform applied while loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Split {
        #[serde(default, rename = "splitChar", skip_serializing_if = "Option::is_none")]
        delimiter: Option<String>,
    },
}

fn default_keep() -> bool {
    true
}

/// A column of the source as it will appear in the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default = "default_keep")]
    pub keep: bool,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub multi_valued: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            keep: true,
            operations: Vec::new(),
            multi_valued: false,
        }
    }

    pub fn dropped(mut self) -> Self {
        self.keep = false;
        self
    }

    pub fn with_split(mut self, delimiter: Option<&str>) -> Self {
        self.operations.push(Operation::Split {
            delimiter: delimiter.map(str::to_string),
        });
        self
    }

    /// Separator of the first split operation, if the field is split.
    ///
    /// An empty or absent delimiter falls back to `,`.
    pub fn split_separator(&self) -> Option<&str> {
        self.operations.iter().find_map(|op| match op {
            Operation::Split { delimiter } => Some(
                delimiter
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .unwrap_or(DEFAULT_SPLIT_SEPARATOR),
            ),
        })
    }
}

/// A typed column reported by a catalog, query or database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

// ============================================================================
// Format Guess
// ============================================================================

/// Inferred serialization parameters of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FormatGuess {
    #[serde(rename = "type")]
    pub format_type: FormatType,
    #[serde(default)]
    pub field_separator: String,
    #[serde(default)]
    pub record_separator: String,
    #[serde(default)]
    pub quote_char: String,
    #[serde(default)]
    pub has_header: bool,
    /// Topic names offered by a Kafka source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    /// Queryable objects offered by a CRM source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<String>,
}

impl FormatGuess {
    pub fn csv(field_separator: &str, quote_char: &str, has_header: bool) -> Self {
        Self {
            format_type: FormatType::Csv,
            field_separator: field_separator.to_string(),
            record_separator: "\n".to_string(),
            quote_char: quote_char.to_string(),
            has_header,
            topics: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Columnar files carry no delimiter fields.
    pub fn parquet() -> Self {
        Self {
            format_type: FormatType::Parquet,
            ..Default::default()
        }
    }

    pub fn with_record_separator(mut self, separator: &str) -> Self {
        self.record_separator = separator.to_string();
        self
    }

    /// Field separator as a single byte, for the CSV reader.
    pub fn delimiter_byte(&self) -> IngestResult<u8> {
        single_byte("fieldSeparator", &self.field_separator, b',')
    }

    /// Quote character as a single byte; `None` disables quoting.
    pub fn quote_byte(&self) -> IngestResult<Option<u8>> {
        if self.quote_char.is_empty() {
            return Ok(None);
        }
        single_byte("quoteChar", &self.quote_char, b'"').map(Some)
    }
}

fn single_byte(field: &str, value: &str, default: u8) -> IngestResult<u8> {
    if value.is_empty() {
        return Ok(default);
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(IngestError::validation(
            field,
            format!("expected a single ASCII character, got '{}'", value),
        )),
    }
}

/// Sample rows plus typed columns inferred for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldGuess {
    pub sample: Vec<Vec<String>>,
    pub columns: Vec<FieldSpec>,
}

// ============================================================================
// Job Handle
// ============================================================================

/// Result of a submission. Returned by value, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_sub_url: Option<String>,
    /// Per-record errors reported by the sink; the run still succeeded.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Execution-engine task to poll, for staged submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl JobHandle {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn with_success_url(mut self, url: impl Into<String>) -> Self {
        self.on_success_url = Some(url.into());
        self
    }

    pub fn with_pub_sub(mut self, topic: impl Into<String>) -> Self {
        self.pub_sub_url = Some(topic.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn is_partial(&self) -> bool {
        self.status == 0 && !self.errors.is_empty()
    }
}
