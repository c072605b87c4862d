//! Source and sink descriptors.
//!
//! Both are closed tagged unions: the `inputFormat` tag (plus
//! `streamSelection` for streams) selects the source variant and the
//! `outputFormat` tag selects the sink variant. Descriptors are caller-owned
//! and read-only for the duration of a run; [`SourceDescriptor::validate`] and
//! [`SinkDescriptor::validate`] must pass before any collaborator is called.

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};
use crate::types::{FieldSpec, FieldType, FormatGuess, SinkKind, SourceKind};

fn require(field: &str, value: &str) -> IngestResult<()> {
    if value.trim().is_empty() {
        return Err(IngestError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Sources
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "inputFormat", rename_all = "lowercase")]
pub enum SourceDescriptor {
    File(FileSource),
    Table(TableSource),
    Query(QuerySource),
    Rdbms(RdbmsSource),
    Stream(StreamSource),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSource {
    pub path: String,
    /// Format confirmed by the user after guessing, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatGuess>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSource {
    #[serde(alias = "databaseName")]
    pub database: String,
    #[serde(alias = "tableName")]
    pub table: String,
}

/// A saved query (by id) or an inline statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuerySource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdbmsSource {
    pub rdbms_type: String,
    #[serde(alias = "rdbmsDatabaseName")]
    pub database: String,
    #[serde(alias = "rdbmsTableName")]
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "streamSelection", rename_all = "lowercase")]
pub enum StreamSource {
    Kafka(KafkaStream),
    #[serde(rename = "sfdc", alias = "crm")]
    Crm(CrmStream),
}

fn default_delimiter_type() -> String {
    "delimited".to_string()
}

fn default_field_delimiter() -> String {
    ",".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaStream {
    /// Comma-separated topic names.
    #[serde(alias = "kafkaSelectedTopics")]
    pub topics: String,
    /// Translator kind for the record payload (e.g. `delimited`).
    #[serde(default = "default_delimiter_type", alias = "kafkaFieldType")]
    pub delimiter_type: String,
    #[serde(default = "default_field_delimiter", alias = "kafkaFieldDelimiter")]
    pub delimiter: String,
    /// Comma-separated field names.
    #[serde(alias = "kafkaFieldNames")]
    pub field_names: String,
    /// Comma-separated field types, parallel to `field_names`.
    #[serde(alias = "kafkaFieldTypes")]
    pub field_types: String,
}

impl KafkaStream {
    pub fn topic_list(&self) -> Vec<String> {
        split_list(&self.topics)
    }

    pub fn field_name_list(&self) -> Vec<String> {
        split_list(&self.field_names)
    }

    pub fn field_type_list(&self) -> Vec<String> {
        split_list(&self.field_types)
    }

    /// Declared names zipped with parsed types.
    pub fn declared_fields(&self) -> IngestResult<Vec<FieldSpec>> {
        let names = self.field_name_list();
        let types = self.field_type_list();
        if names.len() != types.len() {
            return Err(IngestError::validation(
                "fieldTypes",
                format!(
                    "{} field names but {} field types",
                    names.len(),
                    types.len()
                ),
            ));
        }
        names
            .into_iter()
            .zip(types)
            .map(|(name, type_name)| {
                let field_type = type_name
                    .parse::<FieldType>()
                    .map_err(|e| IngestError::validation("fieldTypes", e))?;
                Ok(FieldSpec::new(name, field_type))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmStream {
    #[serde(alias = "streamObject")]
    pub object: String,
    #[serde(alias = "streamUsername")]
    pub username: String,
    #[serde(alias = "streamPassword")]
    pub password: String,
    #[serde(alias = "streamToken")]
    pub token: String,
    #[serde(alias = "streamEndpointUrl")]
    pub endpoint_url: String,
}

impl SourceDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceDescriptor::File(_) => SourceKind::File,
            SourceDescriptor::Table(_) => SourceKind::Table,
            SourceDescriptor::Query(_) => SourceKind::Query,
            SourceDescriptor::Rdbms(_) => SourceKind::Rdbms,
            SourceDescriptor::Stream(StreamSource::Kafka(_)) => SourceKind::Kafka,
            SourceDescriptor::Stream(StreamSource::Crm(_)) => SourceKind::Crm,
        }
    }

    /// Check the kind-specific required properties.
    pub fn validate(&self) -> IngestResult<()> {
        match self {
            SourceDescriptor::File(file) => require("path", &file.path),
            SourceDescriptor::Table(table) => {
                require("database", &table.database)?;
                require("table", &table.table)
            }
            SourceDescriptor::Query(query) => {
                let has_id = query.query_id.as_deref().is_some_and(|s| !s.trim().is_empty());
                let has_statement = query
                    .statement
                    .as_deref()
                    .is_some_and(|s| !s.trim().is_empty());
                if !has_id && !has_statement {
                    return Err(IngestError::validation(
                        "query",
                        "either a query id or an inline statement is required",
                    ));
                }
                Ok(())
            }
            SourceDescriptor::Rdbms(rdbms) => {
                require("rdbmsType", &rdbms.rdbms_type)?;
                require("database", &rdbms.database)?;
                require("table", &rdbms.table)
            }
            SourceDescriptor::Stream(StreamSource::Kafka(kafka)) => {
                require("topics", &kafka.topics)?;
                require("delimiterType", &kafka.delimiter_type)?;
                require("fieldNames", &kafka.field_names)?;
                require("fieldTypes", &kafka.field_types)?;
                kafka.declared_fields().map(|_| ())
            }
            SourceDescriptor::Stream(StreamSource::Crm(crm)) => {
                require("object", &crm.object)?;
                require("username", &crm.username)?;
                require("password", &crm.password)?;
                require("token", &crm.token)?;
                require("endpointUrl", &crm.endpoint_url)
            }
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

fn default_file_format() -> String {
    "csv".to_string()
}

/// Destination of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSinkDescriptor")]
pub struct SinkDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub target: SinkTarget,
    /// Ordered field-level schema.
    #[serde(default)]
    pub columns: Vec<FieldSpec>,
    /// Declared unique key; synthesised when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    /// Whether the source data starts with a header row.
    #[serde(default = "default_true")]
    pub has_header: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outputFormat", rename_all = "lowercase")]
pub enum SinkTarget {
    File(FileSink),
    Table(TableSink),
    Database(DatabaseSink),
    Index(IndexSink),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSink {
    pub path: String,
    #[serde(default = "default_file_format")]
    pub format: String,
}

/// Storage of a table created for the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Kudu,
    Text,
    Parquet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TableSink {
    /// Database holding the table; `default` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub table_format: TableFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_default_location: Option<String>,
    #[serde(default)]
    pub is_target_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSink {
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub use_default_location: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_default_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSink {
    #[serde(default = "default_one")]
    pub num_shards: u32,
    #[serde(default = "default_one")]
    pub replication_factor: u32,
    /// Run as a staged engine job instead of a direct upload.
    #[serde(default)]
    pub run_job: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_lib_path: Option<String>,
}

impl Default for IndexSink {
    fn default() -> Self {
        Self {
            num_shards: 1,
            replication_factor: 1,
            run_job: false,
            config_set: None,
            default_field: None,
            job_lib_path: None,
        }
    }
}

impl SinkTarget {
    pub fn kind(&self) -> SinkKind {
        match self {
            SinkTarget::File(_) => SinkKind::File,
            SinkTarget::Table(_) => SinkKind::Table,
            SinkTarget::Database(_) => SinkKind::Database,
            SinkTarget::Index(_) => SinkKind::Index,
        }
    }
}

impl SinkDescriptor {
    pub fn new(name: impl Into<String>, target: SinkTarget) -> Self {
        Self {
            name: name.into(),
            target,
            columns: Vec::new(),
            primary_key: None,
            has_header: true,
        }
    }

    pub fn with_columns(mut self, columns: Vec<FieldSpec>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    /// The `outputFormat` discriminant.
    pub fn output_format(&self) -> SinkKind {
        self.target.kind()
    }

    pub fn validate(&self) -> IngestResult<()> {
        match &self.target {
            SinkTarget::File(file) => {
                require("path", &file.path)?;
                require("format", &file.format)
            }
            SinkTarget::Table(_) | SinkTarget::Database(_) => require("name", &self.name),
            SinkTarget::Index(index) => {
                require("name", &self.name)?;
                if index.num_shards == 0 {
                    return Err(IngestError::validation("numShards", "must be at least 1"));
                }
                if index.replication_factor == 0 {
                    return Err(IngestError::validation(
                        "replicationFactor",
                        "must be at least 1",
                    ));
                }
                Ok(())
            }
        }?;
        if let Some(key) = &self.primary_key {
            require("primaryKey", key)?;
        }
        Ok(())
    }
}

/// Wire shape accepted for [`SinkDescriptor`].
///
/// `ouputFormat` is accepted next to or instead of `outputFormat`; when both
/// are present they must agree. Everything kind-specific is re-read from the
/// remaining keys once the tag is known.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSinkDescriptor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    output_format: Option<SinkKind>,
    #[serde(default, rename = "ouputFormat")]
    ouput_format: Option<SinkKind>,
    #[serde(default)]
    columns: Vec<FieldSpec>,
    #[serde(default)]
    primary_key: Option<String>,
    #[serde(default = "default_true")]
    has_header: bool,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

impl RawSinkDescriptor {
    fn kind(&self) -> IngestResult<SinkKind> {
        match (self.output_format, self.ouput_format) {
            (Some(kind), None) | (None, Some(kind)) => Ok(kind),
            (Some(kind), Some(legacy)) if kind == legacy => Ok(kind),
            (Some(kind), Some(legacy)) => Err(IngestError::validation(
                "outputFormat",
                format!("'{}' disagrees with ouputFormat '{}'", kind, legacy),
            )),
            (None, None) => Err(IngestError::validation("outputFormat", "is required")),
        }
    }
}

impl TryFrom<RawSinkDescriptor> for SinkDescriptor {
    type Error = IngestError;

    fn try_from(raw: RawSinkDescriptor) -> Result<Self, Self::Error> {
        let kind = raw.kind()?;
        let options = serde_json::Value::Object(raw.rest);
        let decode_err =
            |e: serde_json::Error| IngestError::validation(format!("{} sink", kind), e.to_string());
        let target = match kind {
            SinkKind::File => SinkTarget::File(serde_json::from_value(options).map_err(decode_err)?),
            SinkKind::Table => {
                SinkTarget::Table(serde_json::from_value(options).map_err(decode_err)?)
            }
            SinkKind::Database => {
                SinkTarget::Database(serde_json::from_value(options).map_err(decode_err)?)
            }
            SinkKind::Index => {
                SinkTarget::Index(serde_json::from_value(options).map_err(decode_err)?)
            }
        };
        Ok(SinkDescriptor {
            name: raw.name,
            target,
            columns: raw.columns,
            primary_key: raw.primary_key.filter(|k| !k.is_empty()),
            has_header: raw.has_header,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kafka_source_from_json() {
        let source: SourceDescriptor = serde_json::from_value(json!({
            "inputFormat": "stream",
            "streamSelection": "kafka",
            "kafkaSelectedTopics": "t1",
            "kafkaFieldNames": "id,name",
            "kafkaFieldTypes": "int,string"
        }))
        .unwrap();
        assert_eq!(source.kind(), SourceKind::Kafka);
        source.validate().unwrap();
        match source {
            SourceDescriptor::Stream(StreamSource::Kafka(kafka)) => {
                assert_eq!(kafka.delimiter_type, "delimited");
                assert_eq!(kafka.delimiter, ",");
                assert_eq!(kafka.field_name_list(), vec!["id", "name"]);
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_stream_selection_is_rejected() {
        let result: Result<SourceDescriptor, _> = serde_json::from_value(json!({
            "inputFormat": "stream",
            "streamSelection": "kinesis",
            "topics": "t1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_source_validation_names_missing_property() {
        let source = SourceDescriptor::Table(TableSource {
            database: "default".to_string(),
            table: " ".to_string(),
        });
        let err = source.validate().unwrap_err();
        assert!(matches!(err, IngestError::Validation { ref field, .. } if field == "table"));

        let query = SourceDescriptor::Query(QuerySource::default());
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_kafka_type_count_mismatch() {
        let kafka = KafkaStream {
            topics: "t1".to_string(),
            delimiter_type: "delimited".to_string(),
            delimiter: ",".to_string(),
            field_names: "id,name".to_string(),
            field_types: "int".to_string(),
        };
        let err = SourceDescriptor::Stream(StreamSource::Kafka(kafka))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("2 field names but 1 field types"));
    }

    #[test]
    fn test_sink_accepts_legacy_spelling() {
        let sink: SinkDescriptor = serde_json::from_value(json!({
            "name": "traffic",
            "ouputFormat": "index",
            "numShards": 2,
            "columns": [{"name": "id", "type": "int"}]
        }))
        .unwrap();
        assert_eq!(sink.output_format(), SinkKind::Index);
        match &sink.target {
            SinkTarget::Index(index) => {
                assert_eq!(index.num_shards, 2);
                assert_eq!(index.replication_factor, 1);
            }
            other => panic!("unexpected target: {other:?}"),
        }
        assert!(sink.has_header);
        sink.validate().unwrap();
    }

    #[test]
    fn test_sink_serializes_canonical_tag() {
        let sink = SinkDescriptor::new(
            "out",
            SinkTarget::File(FileSink {
                path: "/out".to_string(),
                format: "csv".to_string(),
            }),
        );
        let json = serde_json::to_value(&sink).unwrap();
        assert_eq!(json["outputFormat"], "file");
        assert!(json.get("ouputFormat").is_none());

        let back: SinkDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, sink);
    }

    #[test]
    fn test_sink_rejects_unknown_output_format() {
        let result: Result<SinkDescriptor, _> = serde_json::from_value(json!({
            "name": "x",
            "outputFormat": "hbase"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_file_sink_requires_path() {
        let sink = SinkDescriptor::new(
            "",
            SinkTarget::File(FileSink {
                path: String::new(),
                format: "csv".to_string(),
            }),
        );
        assert!(matches!(
            sink.validate(),
            Err(IngestError::Validation { ref field, .. }) if field == "path"
        ));
    }
}
