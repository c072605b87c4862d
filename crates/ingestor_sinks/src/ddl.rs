//! Fixed DDL templates for table and database sinks.
//!
//! Identifiers are back-quoted, literals single-quoted with backslash
//! escaping. Nothing else about the statements is configurable.


use ingestor_protocol::{
    DatabaseSink, FieldSpec, FieldType, IngestError, IngestResult, SinkDescriptor, TableFormat,
    TableSink,
};
use ingestor_schema::SinkSchema;

pub const DEFAULT_DATABASE: &str = "default";

/// Hash partitions of a new key-ordered table.
const KUDU_HASH_PARTITIONS: u32 = 16;

pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub fn sql_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String | FieldType::Text => "STRING",
        FieldType::Int => "INT",
        FieldType::Long => "BIGINT",
        FieldType::Float => "FLOAT",
        FieldType::Double => "DOUBLE",
        FieldType::Boolean => "BOOLEAN",
        FieldType::Date => "TIMESTAMP",
    }
}

/// `CREATE TABLE` for a table sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDdl {
    pub database: String,
    pub name: String,
    pub columns: Vec<FieldSpec>,
    /// Declared as `PRIMARY KEY` for key-ordered storage.
    pub primary_key: Option<String>,
    pub format: TableFormat,
    pub field_delimiter: String,
    pub location: Option<String>,
    pub skip_header: bool,
}

impl TableDdl {
    pub fn for_sink(
        sink: &SinkDescriptor,
        table: &TableSink,
        schema: &SinkSchema,
        field_delimiter: &str,
    ) -> IngestResult<Self> {
        if sink.name.trim().is_empty() {
            return Err(IngestError::validation("name", "must not be empty"));
        }
        let (database, name) = split_qualified(&sink.name, table.database.as_deref());
        let (columns, primary_key) = match table.table_format {
            TableFormat::Kudu => (schema.key_first(), Some(schema.unique_key().name().to_string())),
            _ => (schema.kept().to_vec(), None),
        };
        Ok(Self {
            database,
            name,
            columns,
            primary_key,
            format: table.table_format,
            field_delimiter: field_delimiter.to_string(),
            location: table
                .non_default_location
                .clone()
                .filter(|location| !location.trim().is_empty()),
            skip_header: sink.has_header,
        })
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", quote_ident(&self.database), quote_ident(&self.name))
    }

    pub fn render(&self) -> IngestResult<String> {
        if self.columns.is_empty() {
            return Err(IngestError::schema(format!(
                "table {}.{} has no columns",
                self.database, self.name
            )));
        }
        let external = self.location.is_some() && self.format != TableFormat::Kudu;
        let mut sql = format!(
            "CREATE {}TABLE {} (\n",
            if external { "EXTERNAL " } else { "" },
            self.qualified_name()
        );

        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|column| format!("  {} {}", quote_ident(&column.name), sql_type(column.field_type)))
            .collect();
        if let Some(key) = &self.primary_key {
            lines.push(format!("  PRIMARY KEY ({})", quote_ident(key)));
        }
        sql.push_str(&lines.join(",\n"));
        sql.push_str("\n)");

        match self.format {
            TableFormat::Kudu => {
                sql.push_str(&format!(
                    "\nPARTITION BY HASH PARTITIONS {}\nSTORED AS KUDU",
                    KUDU_HASH_PARTITIONS
                ));
            }
            TableFormat::Text => {
                sql.push_str(&format!(
                    "\nROW FORMAT DELIMITED FIELDS TERMINATED BY {}\nSTORED AS TEXTFILE",
                    quote_literal(&self.field_delimiter)
                ));
            }
            TableFormat::Parquet => sql.push_str("\nSTORED AS PARQUET"),
        }
        if let Some(location) = &self.location {
            sql.push_str(&format!("\nLOCATION {}", quote_literal(location)));
        }
        if self.format == TableFormat::Text && self.skip_header {
            sql.push_str("\nTBLPROPERTIES ('skip.header.line.count'='1')");
        }
        Ok(sql)
    }

    pub fn render_drop(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.qualified_name())
    }
}

/// `CREATE DATABASE` for a database sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseDdl {
    pub name: String,
    pub comment: String,
    pub location: Option<String>,
}

impl DatabaseDdl {
    pub fn for_sink(sink: &SinkDescriptor, database: &DatabaseSink) -> IngestResult<Self> {
        if sink.name.trim().is_empty() {
            return Err(IngestError::validation("name", "must not be empty"));
        }
        let location = if database.use_default_location {
            None
        } else {
            let location = database
                .non_default_location
                .clone()
                .filter(|location| !location.trim().is_empty())
                .ok_or_else(|| {
                    IngestError::validation(
                        "nonDefaultLocation",
                        "required when the default location is not used",
                    )
                })?;
            Some(location)
        };
        Ok(Self {
            name: sink.name.trim().to_string(),
            comment: database.description.clone(),
            location,
        })
    }

    pub fn render(&self) -> String {
        let mut sql = format!("CREATE DATABASE IF NOT EXISTS {}", quote_ident(&self.name));
        if !self.comment.is_empty() {
            sql.push_str(&format!("\nCOMMENT {}", quote_literal(&self.comment)));
        }
        if let Some(location) = &self.location {
            sql.push_str(&format!("\nLOCATION {}", quote_literal(location)));
        }
        sql
    }

    pub fn render_drop(&self) -> String {
        format!("DROP DATABASE IF EXISTS {}", quote_ident(&self.name))
    }
}

/// `db.table` or a bare name in the sink's (or the default) database.
pub fn split_qualified(name: &str, database: Option<&str>) -> (String, String) {
    let name = name.trim();
    match name.split_once('.') {
        Some((db, table)) if !db.is_empty() && !table.is_empty() => {
            (db.to_string(), table.to_string())
        }
        _ => (
            database
                .map(str::trim)
                .filter(|db| !db.is_empty())
                .unwrap_or(DEFAULT_DATABASE)
                .to_string(),
            name.to_string(),
        ),
    }
}
