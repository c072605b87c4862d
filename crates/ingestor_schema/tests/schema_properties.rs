//! Property tests for the sink schema rules.

use ingestor_protocol::{FieldSpec, FieldType, Operation};
use ingestor_schema::SinkSchema;
use proptest::prelude::*;

fn field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::String),
        Just(FieldType::Int),
        Just(FieldType::Long),
        Just(FieldType::Double),
        Just(FieldType::Boolean),
        Just(FieldType::Date),
    ]
}

fn field() -> impl Strategy<Value = (FieldType, bool, bool, Option<String>, bool)> {
    (
        field_type(),
        any::<bool>(),
        any::<bool>(),
        proptest::option::of("[,;|]{0,1}"),
        any::<bool>(),
    )
}

/// Distinct, non-reserved names with arbitrary flags.
fn fields() -> impl Strategy<Value = Vec<FieldSpec>> {
    prop::collection::vec(field(), 1..8).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (field_type, keep, split, delimiter, multi_valued))| {
                let mut spec = FieldSpec::new(format!("col_{i}"), field_type);
                spec.keep = keep;
                spec.multi_valued = multi_valued;
                if split {
                    spec.operations.push(Operation::Split { delimiter });
                }
                spec
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn split_fields_are_always_multi_valued(fields in fields()) {
        let schema = SinkSchema::build(&fields, None).unwrap();
        for index_field in schema.index_fields() {
            let source = fields.iter().find(|f| f.name == index_field.name);
            if let Some(source) = source {
                if !source.operations.is_empty() {
                    prop_assert!(index_field.multi_valued);
                }
            }
        }
    }

    #[test]
    fn generated_key_is_unique_string(fields in fields()) {
        let schema = SinkSchema::build(&fields, None).unwrap();
        let ids: Vec<_> = schema.kept().iter().filter(|f| f.name == "hue_id").collect();
        prop_assert_eq!(ids.len(), 1);
        prop_assert_eq!(ids[0].field_type, FieldType::String);
        prop_assert_eq!(schema.unique_key().name(), "hue_id");
        let options = schema.sink_options(true);
        prop_assert_eq!(options.get("rowid").map(String::as_str), Some("hue_id"));
    }

    #[test]
    fn kept_fields_follow_source_order(fields in fields()) {
        let schema = SinkSchema::build(&fields, None).unwrap();
        let expected: Vec<_> = fields.iter().filter(|f| f.keep).map(|f| f.name.clone()).collect();
        prop_assert_eq!(schema.source_columns(), expected);
    }
}
