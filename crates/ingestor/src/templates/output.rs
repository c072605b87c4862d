//! Output blocks, selected by the sink's `outputFormat`.

use ingestor_protocol::defaults::KUDU_TABLE_PREFIX;
use ingestor_protocol::{
    FieldSpec, FileSink, IngestError, IngestResult, SinkDescriptor, SinkKind, TableFormat,
    TableSink,
};
use ingestor_schema::{resolve_specs, split_kept, SinkSchema};
use ingestor_sinks::{quote_ident, split_qualified};

use super::engine::{bare_or_quoted, quoted, Bindings, Template};
use super::{required, required_name};

const FILE_OUTPUT: Template = Template::new(
    "output/file",
    r#"        deriver {
          type = sql
          query.literal = "%(query)s"
        }
        planner = {
          type = overwrite
        }
        output = {
          type = filesystem
          path = %(path)s
          format = %(format)s
          header = true
        }"#,
);

const TABLE_OUTPUT: Template = Template::new(
    "output/table",
    r#"        deriver {
            type = sql
            query.literal = "%(query)s"
        }
        planner {
            type = upsert
        }
        output {
            type = kudu
            connection = "%(connection)s"
            table.name = "%(table_name)s"
        }"#,
);

const INDEX_OUTPUT: Template = Template::new(
    "output/index",
    r#"        planner {
            type = upsert
        }
        output {
            type = solr
            connection = "%(connection)s"
            collection.name = "%(collection)s"
        }"#,
);

/// SQL step between input and output: selects the kept source columns and
/// fills a generated row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlDeriver {
    /// Empty selects every input column.
    pub columns: Vec<String>,
    /// Column given a fresh uuid per row.
    pub row_id: Option<String>,
}

impl SqlDeriver {
    /// Kept fields only, no row id.
    pub fn projecting(fields: &[FieldSpec]) -> IngestResult<Self> {
        let (kept, _) = split_kept(&resolve_specs(fields)?);
        Ok(Self {
            columns: kept.into_iter().map(|field| field.name).collect(),
            row_id: None,
        })
    }

    /// Kept fields plus the generated unique key, unless the source already
    /// carries a column by that name.
    pub fn keyed(schema: &SinkSchema) -> Self {
        let columns = schema.source_columns();
        let key = schema.unique_key();
        let row_id = (key.is_generated() && !columns.iter().any(|c| c == key.name()))
            .then(|| key.name().to_string());
        Self { columns, row_id }
    }

    pub fn query(&self) -> String {
        let mut select: Vec<String> = if self.columns.is_empty() {
            vec!["*".to_string()]
        } else {
            self.columns.iter().map(|c| quote_ident(c)).collect()
        };
        if let Some(row_id) = &self.row_id {
            select.push(format!("uuid() AS {}", quote_ident(row_id)));
        }
        format!("SELECT {} FROM inputdata", select.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    pub path: String,
    pub format: String,
    pub deriver: SqlDeriver,
}

impl FileOutput {
    pub fn bind(file: &FileSink, fields: &[FieldSpec]) -> IngestResult<Self> {
        Ok(Self {
            path: required_name("file", "path", Some(&file.path))?,
            format: required_name("file", "format", Some(&file.format))?,
            deriver: SqlDeriver::projecting(fields)?,
        })
    }

    fn bindings(&self) -> Bindings {
        Bindings::from([
            ("query", quoted(&self.deriver.query())),
            ("path", bare_or_quoted(&self.path)),
            ("format", bare_or_quoted(&self.format)),
        ])
    }
}

/// Upsert into a key-ordered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutput {
    pub connection: String,
    /// `impala::<database>.<table>`
    pub table_name: String,
    pub deriver: SqlDeriver,
}

impl TableOutput {
    pub fn bind(
        sink: &SinkDescriptor,
        table: &TableSink,
        schema: &SinkSchema,
        kudu_master: Option<&str>,
    ) -> IngestResult<Self> {
        if table.table_format != TableFormat::Kudu {
            return Err(IngestError::unsupported_format(format!(
                "output 'table' can only stream into kudu tables, not {:?} tables",
                table.table_format
            )));
        }
        let name = required_name("table", "name", Some(&sink.name))?;
        let (database, table_name) = split_qualified(&name, table.database.as_deref());
        Ok(Self {
            connection: required_name("table", "kudu_master", kudu_master)?,
            table_name: format!("{}{}.{}", KUDU_TABLE_PREFIX, database, table_name),
            deriver: SqlDeriver::keyed(schema),
        })
    }

    fn bindings(&self) -> Bindings {
        Bindings::from([
            ("query", quoted(&self.deriver.query())),
            ("connection", quoted(&self.connection)),
            ("table_name", quoted(&self.table_name)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOutput {
    pub connection: String,
    pub collection: String,
}

impl IndexOutput {
    pub fn bind(sink: &SinkDescriptor, endpoint: Option<&str>) -> IngestResult<Self> {
        Ok(Self {
            connection: required_name("index", "connection", endpoint)?,
            collection: required_name("index", "name", Some(&sink.name))?,
        })
    }

    fn bindings(&self) -> Bindings {
        Bindings::from([
            ("connection", quoted(&self.connection)),
            ("collection", quoted(&self.collection)),
        ])
    }
}

/// The `output` step of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputBlock {
    File(FileOutput),
    Table(TableOutput),
    Index(IndexOutput),
}

impl OutputBlock {
    /// Sink kinds that have an output template.
    pub fn supports(kind: SinkKind) -> bool {
        match kind {
            SinkKind::File | SinkKind::Table | SinkKind::Index => true,
            SinkKind::Database => false,
        }
    }

    pub fn template(&self) -> &'static Template {
        match self {
            OutputBlock::File(_) => &FILE_OUTPUT,
            OutputBlock::Table(_) => &TABLE_OUTPUT,
            OutputBlock::Index(_) => &INDEX_OUTPUT,
        }
    }

    pub fn render(&self) -> IngestResult<String> {
        let bindings = match self {
            OutputBlock::File(file) => file.bindings(),
            OutputBlock::Table(table) => table.bindings(),
            OutputBlock::Index(index) => index.bindings(),
        };
        self.template().render(&bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestor_protocol::{FieldType, IndexSink, SinkTarget};

    fn traffic() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("measurement_time", FieldType::Date),
            FieldSpec::new("number_of_vehicles", FieldType::Int),
            FieldSpec::new("note", FieldType::String).dropped(),
        ]
    }

    fn no_key(fields: &[FieldSpec]) -> SinkSchema {
        SinkSchema::build(fields, None).unwrap()
    }

    #[test]
    fn test_file_block() {
        let sink = FileSink {
            path: "/out".to_string(),
            format: "csv".to_string(),
        };
        let text = OutputBlock::File(FileOutput::bind(&sink, &traffic()).unwrap())
            .render()
            .unwrap();
        assert!(text.starts_with("        deriver {\n          type = sql\n"));
        assert!(text.contains(
            "query.literal = \"SELECT `measurement_time`, `number_of_vehicles` FROM inputdata\""
        ));
        assert!(text.contains("type = overwrite"));
        assert!(text.contains("type = filesystem"));
        assert!(text.contains("path = /out\n"));
        assert!(text.contains("header = true"));
    }

    #[test]
    fn test_file_block_without_fields_selects_everything() {
        let sink = FileSink {
            path: "/out".to_string(),
            format: "csv".to_string(),
        };
        let output = FileOutput::bind(&sink, &[]).unwrap();
        assert_eq!(output.deriver.query(), "SELECT * FROM inputdata");
    }

    #[test]
    fn test_table_block_names_kudu_table() {
        let table = TableSink::default();
        let sink = SinkDescriptor::new("sfdc", SinkTarget::Table(table.clone()));
        let schema = no_key(&traffic());
        let text = OutputBlock::Table(
            TableOutput::bind(&sink, &table, &schema, Some("km:7051")).unwrap(),
        )
        .render()
        .unwrap();
        assert!(text.starts_with("        deriver {\n            type = sql\n"));
        assert!(text.contains(
            "query.literal = \"SELECT `measurement_time`, `number_of_vehicles`, uuid() AS `hue_id` FROM inputdata\""
        ));
        assert!(!text.contains("`note`"));
        assert!(text.contains("type = upsert"));
        assert!(text.contains("connection = \"km:7051\""));
        assert!(text.contains("table.name = \"impala::default.sfdc\""));
    }

    #[test]
    fn test_table_block_requires_kudu_master() {
        let table = TableSink::default();
        let sink = SinkDescriptor::new("sfdc", SinkTarget::Table(table.clone()));
        let err = TableOutput::bind(&sink, &table, &no_key(&traffic()), Some("  ")).unwrap_err();
        assert!(matches!(err, IngestError::Template(_)));
        assert!(err.to_string().contains("kudu_master"));
    }

    #[test]
    fn test_text_table_cannot_be_streamed_into() {
        let table = TableSink {
            table_format: TableFormat::Text,
            ..Default::default()
        };
        let sink = SinkDescriptor::new("t", SinkTarget::Table(table.clone()));
        assert!(matches!(
            TableOutput::bind(&sink, &table, &no_key(&traffic()), Some("km")),
            Err(IngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_declared_key_is_not_generated() {
        let schema = SinkSchema::build(&traffic(), Some("measurement_time")).unwrap();
        let deriver = SqlDeriver::keyed(&schema);
        assert_eq!(deriver.row_id, None);
        assert_eq!(
            deriver.query(),
            "SELECT `measurement_time`, `number_of_vehicles` FROM inputdata"
        );
    }

    #[test]
    fn test_source_row_id_is_reused() {
        let mut fields = traffic();
        fields.push(FieldSpec::new("hue_id", FieldType::String));
        let deriver = SqlDeriver::keyed(&no_key(&fields));
        assert_eq!(deriver.row_id, None);
        assert!(deriver.query().contains("`hue_id` FROM"));
    }

    #[test]
    fn test_index_block() {
        let sink = SinkDescriptor::new("traffic", SinkTarget::Index(IndexSink::default()));
        let text = OutputBlock::Index(
            IndexOutput::bind(&sink, Some("http://hue.com:8983/solr/")).unwrap(),
        )
        .render()
        .unwrap();
        assert!(text.contains("type = solr"));
        assert!(text.contains("connection = \"http://hue.com:8983/solr/\""));
        assert!(text.contains("collection.name = \"traffic\""));
    }
}
