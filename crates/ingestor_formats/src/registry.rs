//! Format registry: per-source-kind format and field inference.
//!
//! Dispatch happens in exactly two matches over [`SourceDescriptor`], one per
//! operation, so adding a source kind fails to compile until both handle it.

use ingestor_protocol::defaults::{FIELD_SAMPLE_BYTES, FORMAT_SNIFF_BYTES, MAX_SAMPLE_ROWS};
use ingestor_protocol::services::{CATALOG, CLUSTER_REGISTRY, CRM, FILESYSTEM, QUERY_SERVICE, RDBMS};
use ingestor_protocol::{
    ColumnInfo, Collaborators, CrmStream, FieldGuess, FieldSpec, FileSource, FormatGuess,
    FormatType, IngestError, IngestResult, QuerySource, RdbmsSource, ServiceContext,
    SourceDescriptor, StreamSource, TableSource,
};
use tracing::{debug, warn};

use crate::catalog_types::field_type_for;
use crate::encoding::decode_lossy;
use crate::infer::infer_text;
use crate::sniff::{is_columnar, sniff_text};

/// Separator of query result sets.
const QUERY_FIELD_SEPARATOR: &str = "\u{0001}";

pub struct FormatRegistry {
    collaborators: Collaborators,
}

impl FormatRegistry {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Infer the serialization of a source.
    pub fn guess_format(&self, source: &SourceDescriptor) -> IngestResult<FormatGuess> {
        source.validate()?;
        let guess = match source {
            SourceDescriptor::File(file) => self.file_format(file)?,
            SourceDescriptor::Table(table) => self.table_format(table)?,
            SourceDescriptor::Query(_) => FormatGuess::csv(QUERY_FIELD_SEPARATOR, "\"", false),
            SourceDescriptor::Rdbms(_) => FormatGuess::csv(",", "\"", true),
            SourceDescriptor::Stream(StreamSource::Kafka(_)) => {
                let topics = self
                    .collaborators
                    .cluster_registry()?
                    .topics()
                    .service(CLUSTER_REGISTRY)?;
                FormatGuess {
                    topics,
                    ..FormatGuess::csv(",", "\"", true)
                }
            }
            SourceDescriptor::Stream(StreamSource::Crm(_)) => {
                let objects = self.collaborators.crm()?.list_objects().service(CRM)?;
                FormatGuess {
                    objects,
                    ..FormatGuess::csv(",", "\"", true)
                }
            }
        };
        debug!(source = %source.kind(), format = %guess.format_type, "guessed format");
        Ok(guess)
    }

    /// Sample rows (at most four) and typed columns of a source.
    pub fn guess_field_types(
        &self,
        source: &SourceDescriptor,
        format: &FormatGuess,
    ) -> IngestResult<FieldGuess> {
        source.validate()?;
        let mut guess = match source {
            SourceDescriptor::File(file) => self.file_fields(file, format)?,
            SourceDescriptor::Table(table) => self.table_fields(table)?,
            SourceDescriptor::Query(query) => self.query_fields(query)?,
            SourceDescriptor::Rdbms(rdbms) => self.rdbms_fields(rdbms)?,
            SourceDescriptor::Stream(StreamSource::Kafka(kafka)) => FieldGuess {
                sample: Vec::new(),
                columns: kafka.declared_fields()?,
            },
            SourceDescriptor::Stream(StreamSource::Crm(crm)) => self.crm_fields(crm)?,
        };
        guess.sample.truncate(MAX_SAMPLE_ROWS);
        debug!(
            source = %source.kind(),
            columns = guess.columns.len(),
            rows = guess.sample.len(),
            "guessed field types"
        );
        Ok(guess)
    }

    fn file_format(&self, file: &FileSource) -> IngestResult<FormatGuess> {
        let head = self.read_file_head(file, FORMAT_SNIFF_BYTES)?;
        if is_columnar(&head) {
            return Ok(FormatGuess::parquet());
        }
        let (text, encoding) = decode_lossy(&head);
        debug!(path = %file.path, encoding, bytes = head.len(), "sniffing file head");
        Ok(sniff_text(&text, head.len() == FORMAT_SNIFF_BYTES))
    }

    fn file_fields(&self, file: &FileSource, format: &FormatGuess) -> IngestResult<FieldGuess> {
        if format.format_type == FormatType::Parquet {
            return Err(IngestError::unsupported_format(format!(
                "field inference for parquet file {}",
                file.path
            )));
        }
        let head = self.read_file_head(file, FIELD_SAMPLE_BYTES)?;
        let (text, _) = decode_lossy(&head);
        let text = if head.len() == FIELD_SAMPLE_BYTES {
            match text.rfind('\n') {
                Some(end) => &text[..=end],
                None => text.as_str(),
            }
        } else {
            text.as_str()
        };
        infer_text(text, format)
    }

    fn read_file_head(&self, file: &FileSource, max_bytes: usize) -> IngestResult<Vec<u8>> {
        let fs = self.collaborators.filesystem()?;
        let stat = fs.stat(&file.path).service(FILESYSTEM)?;
        if stat.is_dir {
            return Err(IngestError::validation(
                "path",
                format!("Path {} is not a file", file.path),
            ));
        }
        fs.read(&file.path, 0, max_bytes).service(FILESYSTEM)
    }

    fn table_format(&self, table: &TableSource) -> IngestResult<FormatGuess> {
        let metadata = self
            .collaborators
            .catalog()?
            .get_table(&table.database, &table.table)
            .service(CATALOG)?;
        match metadata.storage_format.to_ascii_lowercase().as_str() {
            "text" | "textfile" => {
                let delimiter = metadata
                    .storage_properties
                    .get("field.delim")
                    .map(String::as_str)
                    .unwrap_or(",");
                Ok(FormatGuess::csv(delimiter, "\"", false))
            }
            "parquet" => Ok(FormatGuess::parquet()),
            other => Err(IngestError::unsupported_format(format!(
                "table {}.{} is stored as '{}'",
                table.database, table.table, other
            ))),
        }
    }

    fn table_fields(&self, table: &TableSource) -> IngestResult<FieldGuess> {
        let catalog = self.collaborators.catalog()?;
        let metadata = catalog
            .get_table(&table.database, &table.table)
            .service(CATALOG)?;
        let sample = catalog
            .sample_rows(&table.database, &table.table, MAX_SAMPLE_ROWS)
            .service(CATALOG)?;
        Ok(typed_guess(&metadata.columns, sample))
    }

    fn query_fields(&self, query: &QuerySource) -> IngestResult<FieldGuess> {
        let service = self.collaborators.query_service()?;
        let reference = query_reference(query);
        let columns = service.columns(reference).service(QUERY_SERVICE)?;
        // The result handle may have expired since the query ran.
        let sample = match service.fetch_sample(reference, MAX_SAMPLE_ROWS) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(query = reference, error = %err, "could not fetch query sample");
                Vec::new()
            }
        };
        Ok(typed_guess(&columns, sample))
    }

    fn rdbms_fields(&self, rdbms: &RdbmsSource) -> IngestResult<FieldGuess> {
        let service = self.collaborators.rdbms()?;
        let columns = service
            .columns(&rdbms.rdbms_type, &rdbms.database, &rdbms.table)
            .service(RDBMS)?;
        let sample = service
            .sample_rows(&rdbms.rdbms_type, &rdbms.database, &rdbms.table, MAX_SAMPLE_ROWS)
            .service(RDBMS)?;
        Ok(typed_guess(&columns, sample))
    }

    fn crm_fields(&self, crm: &CrmStream) -> IngestResult<FieldGuess> {
        let bytes = self
            .collaborators
            .crm()?
            .sample_records(&crm.object)
            .service(CRM)?;
        let (text, _) = decode_lossy(&bytes);
        infer_text(&text, &FormatGuess::csv(",", "\"", true))
    }
}

/// Inline statement when present, saved query id otherwise.
pub fn query_reference(query: &QuerySource) -> &str {
    query
        .statement
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(query.query_id.as_deref())
        .unwrap_or_default()
}

fn typed_guess(columns: &[ColumnInfo], sample: Vec<Vec<String>>) -> FieldGuess {
    FieldGuess {
        sample,
        columns: columns
            .iter()
            .map(|column| FieldSpec::new(column.name.clone(), field_type_for(&column.data_type)))
            .collect(),
    }
}
