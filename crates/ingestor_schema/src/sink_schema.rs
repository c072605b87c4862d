//! Sink schema derivation.
//!
//! A [`SinkSchema`] is what a sink resource is created with: the kept fields
//! in source order, a unique key, and the per-field loader options. Two rules
//! are absolute:
//!
//! - a field with a split operation is multi-valued in the sink;
//! - every schema has a unique key. Without a declared one, a string field
//!   named `hue_id` is appended and passed as the row identifier.

use std::collections::BTreeMap;

use ingestor_protocol::defaults::GENERATED_UNIQUE_KEY;
use ingestor_protocol::{FieldSpec, FieldType, IndexField, IngestError, IngestResult};

use crate::fields::{resolve_specs, split_kept};

/// Loader options for a bulk ingest, keyed by the index server's parameter
/// names.
pub type SinkOptions = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueKey {
    /// Named by the sink descriptor; must be a kept field.
    Declared(String),
    /// Synthesised row identifier.
    Generated,
}

impl UniqueKey {
    pub fn name(&self) -> &str {
        match self {
            UniqueKey::Declared(name) => name,
            UniqueKey::Generated => GENERATED_UNIQUE_KEY,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, UniqueKey::Generated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSchema {
    /// All resolved source fields, kept or not.
    source_fields: Vec<FieldSpec>,
    /// Fields written to the sink, generated key included.
    kept: Vec<FieldSpec>,
    skipped: Vec<String>,
    unique_key: UniqueKey,
}

impl SinkSchema {
    pub fn build(fields: &[FieldSpec], primary_key: Option<&str>) -> IngestResult<Self> {
        let source_fields = resolve_specs(fields)?;
        let (kept, skipped) = split_kept(&source_fields);
        let mut kept: Vec<FieldSpec> = kept.into_iter().map(force_multi_valued).collect();

        let declared = primary_key.map(str::trim).filter(|key| !key.is_empty());
        let unique_key = match declared {
            Some(key) => {
                if !kept.iter().any(|field| field.name == key) {
                    return Err(IngestError::schema(format!(
                        "primary key '{}' is not a kept field",
                        key
                    )));
                }
                UniqueKey::Declared(key.to_string())
            }
            None => {
                match kept.iter().find(|field| field.name == GENERATED_UNIQUE_KEY) {
                    Some(existing) if existing.field_type != FieldType::String => {
                        return Err(IngestError::schema(format!(
                            "field '{}' is reserved for the generated row id and must be a string",
                            GENERATED_UNIQUE_KEY
                        )));
                    }
                    Some(_) => {}
                    None => kept.push(FieldSpec::new(GENERATED_UNIQUE_KEY, FieldType::String)),
                }
                UniqueKey::Generated
            }
        };

        Ok(Self {
            source_fields,
            kept,
            skipped: skipped.into_iter().map(|field| field.name).collect(),
            unique_key,
        })
    }

    pub fn kept(&self) -> &[FieldSpec] {
        &self.kept
    }

    pub fn source_fields(&self) -> &[FieldSpec] {
        &self.source_fields
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn unique_key(&self) -> &UniqueKey {
        &self.unique_key
    }

    /// Kept fields with the unique key moved to the front, as key-ordered
    /// table stores require.
    pub fn key_first(&self) -> Vec<FieldSpec> {
        let key = self.unique_key.name();
        let mut ordered: Vec<FieldSpec> = self
            .kept
            .iter()
            .filter(|field| field.name == key)
            .cloned()
            .collect();
        ordered.extend(self.kept.iter().filter(|field| field.name != key).cloned());
        ordered
    }

    /// Names of the kept fields that come from the source.
    pub fn source_columns(&self) -> Vec<String> {
        self.kept
            .iter()
            .filter(|field| self.source_fields.iter().any(|f| f.name == field.name))
            .map(|field| field.name.clone())
            .collect()
    }

    pub fn index_fields(&self) -> Vec<IndexField> {
        self.kept
            .iter()
            .map(|field| IndexField {
                name: field.name.clone(),
                field_type: field.field_type,
                multi_valued: field.multi_valued,
            })
            .collect()
    }

    /// Loader options for a bulk ingest of this schema.
    pub fn sink_options(&self, has_header: bool) -> SinkOptions {
        let mut options = SinkOptions::new();
        let names: Vec<&str> = self.source_fields.iter().map(|f| f.name.as_str()).collect();
        options.insert("fieldnames".to_string(), names.join(","));

        for field in &self.source_fields {
            if let Some(separator) = field.split_separator() {
                options.insert(format!("f.{}.split", field.name), "true".to_string());
                options.insert(format!("f.{}.separator", field.name), separator.to_string());
            }
        }

        if !self.skipped.is_empty() {
            options.insert("skip".to_string(), self.skipped.join(","));
        }
        if self.unique_key.is_generated() {
            options.insert("rowid".to_string(), GENERATED_UNIQUE_KEY.to_string());
        }
        if has_header {
            options.insert("skipLines".to_string(), "1".to_string());
        } else {
            options.insert("header".to_string(), "false".to_string());
        }
        options
    }
}

fn force_multi_valued(mut field: FieldSpec) -> FieldSpec {
    if field.split_separator().is_some() {
        field.multi_valued = true;
    }
    field
}

/// Route a bulk ingest through the tolerant update processor, with the
/// literal `NULL` loaded as an empty value.
pub fn with_tolerant_processor(mut options: SinkOptions) -> SinkOptions {
    options.insert("processor".to_string(), "tolerant".to_string());
    options.insert("map".to_string(), "NULL:".to_string());
    options
}

/// Build the schema and return its loader options in one step.
pub fn derive_sink_options(
    fields: &[FieldSpec],
    primary_key: Option<&str>,
    has_header: bool,
) -> IngestResult<SinkOptions> {
    Ok(SinkSchema::build(fields, primary_key)?.sink_options(has_header))
}
