//! Catalog type names to semantic field types.

use ingestor_protocol::FieldType;

/// Map a catalog/SQL type name (`INT`, `decimal(10,2)`, `string_type`, ...)
/// to a [`FieldType`]. Unknown names are strings.
pub fn field_type_for(catalog_type: &str) -> FieldType {
    let lowered = catalog_type.trim().to_ascii_lowercase();
    let base = lowered
        .split(|c: char| c == '(' || c == '<')
        .next()
        .unwrap_or_default()
        .trim();
    let base = base.strip_suffix("_type").unwrap_or(base);

    match base {
        "boolean" | "bool" => FieldType::Boolean,
        "tinyint" | "smallint" | "int" | "integer" | "bigint" | "long" => FieldType::Long,
        "float" | "double" | "decimal" | "real" | "numeric" => FieldType::Double,
        "timestamp" | "date" | "datetime" => FieldType::Date,
        _ => FieldType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_table() {
        assert_eq!(field_type_for("BOOLEAN"), FieldType::Boolean);
        assert_eq!(field_type_for("tinyint"), FieldType::Long);
        assert_eq!(field_type_for("INT_TYPE"), FieldType::Long);
        assert_eq!(field_type_for("decimal(10,2)"), FieldType::Double);
        assert_eq!(field_type_for("timestamp"), FieldType::Date);
        assert_eq!(field_type_for("varchar(32)"), FieldType::String);
    }

    #[test]
    fn test_unknown_defaults_to_string() {
        assert_eq!(field_type_for("array<int>"), FieldType::String);
        assert_eq!(field_type_for("binary"), FieldType::String);
        assert_eq!(field_type_for(""), FieldType::String);
    }
}
