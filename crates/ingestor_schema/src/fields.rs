//! Column resolution.
//!
//! Raw columns arrive from the UI with loosely typed names. Resolution turns
//! them into [`FieldSpec`]s in source order, rejecting anything a sink could
//! not represent.

use std::collections::HashMap;

use ingestor_protocol::{FieldSpec, FieldType, IngestError, IngestResult, Operation};
use serde::{Deserialize, Serialize};

fn default_keep() -> bool {
    true
}

/// A column as edited by the user, before its type name is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default = "default_keep")]
    pub keep: bool,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub multi_valued: bool,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            keep: true,
            operations: Vec::new(),
            multi_valued: false,
        }
    }

    fn into_field(self) -> IngestResult<FieldSpec> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(IngestError::schema("column name must not be empty"));
        }
        let field_type = if self.type_name.trim().is_empty() {
            FieldType::default()
        } else {
            self.type_name
                .parse::<FieldType>()
                .map_err(|e| IngestError::schema(format!("column '{}': {}", name, e)))?
        };
        Ok(FieldSpec {
            name,
            field_type,
            keep: self.keep,
            operations: self.operations,
            multi_valued: self.multi_valued,
        })
    }
}

impl From<FieldSpec> for RawColumn {
    fn from(field: FieldSpec) -> Self {
        Self {
            name: field.name,
            type_name: field.field_type.as_str().to_string(),
            keep: field.keep,
            operations: field.operations,
            multi_valued: field.multi_valued,
        }
    }
}

/// Turn raw columns into an ordered field list.
///
/// A repeated name is dropped unless both occurrences are kept, which is a
/// schema error. When only the later occurrence is kept it replaces the
/// earlier one in place, so source order is preserved.
pub fn resolve_fields(raw_columns: Vec<RawColumn>) -> IngestResult<Vec<FieldSpec>> {
    let mut fields: Vec<FieldSpec> = Vec::with_capacity(raw_columns.len());
    let mut seen: HashMap<String, usize> = HashMap::new();

    for raw in raw_columns {
        let field = raw.into_field()?;
        match seen.get(&field.name) {
            None => {
                seen.insert(field.name.clone(), fields.len());
                fields.push(field);
            }
            Some(&index) => {
                let existing = &mut fields[index];
                match (existing.keep, field.keep) {
                    (true, true) => {
                        return Err(IngestError::schema(format!(
                            "field '{}' appears more than once",
                            field.name
                        )));
                    }
                    (false, true) => *existing = field,
                    _ => {}
                }
            }
        }
    }
    Ok(fields)
}

/// Same rules as [`resolve_fields`], for fields that are already typed.
pub fn resolve_specs(fields: &[FieldSpec]) -> IngestResult<Vec<FieldSpec>> {
    resolve_fields(fields.iter().cloned().map(RawColumn::from).collect())
}

/// Partition into `(kept, skipped)`, both in source order.
pub fn split_kept(fields: &[FieldSpec]) -> (Vec<FieldSpec>, Vec<FieldSpec>) {
    fields.iter().cloned().partition(|field| field.keep)
}
