//! Descriptor payloads as the UI transport sends them.

use ingestor_protocol::{
    FieldType, IngestError, Operation, SinkDescriptor, SinkKind, SinkTarget, SourceDescriptor,
    SourceKind, TableFormat,
};

#[test]
fn test_file_to_index_payload() -> anyhow::Result<()> {
    let source: SourceDescriptor = serde_json::from_str(
        r#"{
            "inputFormat": "file",
            "path": "/x.csv",
            "format": {"type": "csv", "fieldSeparator": ",", "quoteChar": "\"", "hasHeader": true}
        }"#,
    )?;
    let sink: SinkDescriptor = serde_json::from_str(
        r#"{
            "name": "traffic",
            "outputFormat": "index",
            "columns": [
                {"name": "id", "type": "int"},
                {"name": "tags", "type": "string", "operations": [{"type": "split", "splitChar": "|"}]},
                {"name": "junk", "type": "string", "keep": false}
            ]
        }"#,
    )?;

    source.validate()?;
    sink.validate()?;
    assert_eq!(source.kind(), SourceKind::File);
    assert_eq!(sink.output_format(), SinkKind::Index);
    assert_eq!(sink.columns.len(), 3);
    assert_eq!(sink.columns[0].field_type, FieldType::Int);
    assert_eq!(
        sink.columns[1].operations,
        vec![Operation::Split {
            delimiter: Some("|".to_string())
        }]
    );
    assert!(!sink.columns[2].keep);
    Ok(())
}

#[test]
fn test_table_sink_defaults() -> anyhow::Result<()> {
    let sink: SinkDescriptor = serde_json::from_str(
        r#"{"name": "events", "outputFormat": "table", "primaryKey": "id", "hasHeader": false}"#,
    )?;
    assert_eq!(sink.primary_key.as_deref(), Some("id"));
    assert!(!sink.has_header);
    match sink.target {
        SinkTarget::Table(table) => {
            assert_eq!(table.table_format, TableFormat::Kudu);
            assert!(table.database.is_none());
            assert!(!table.is_target_existing);
        }
        other => panic!("unexpected target: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_crm_stream_accepts_both_selection_names() -> anyhow::Result<()> {
    for selection in ["sfdc", "crm"] {
        let payload = format!(
            r#"{{
                "inputFormat": "stream",
                "streamSelection": "{selection}",
                "streamObject": "Account",
                "streamUsername": "u",
                "streamPassword": "p",
                "streamToken": "t",
                "streamEndpointUrl": "https://login.example.com"
            }}"#
        );
        let source: SourceDescriptor = serde_json::from_str(&payload)?;
        assert_eq!(source.kind(), SourceKind::Crm);
        source.validate()?;
    }
    Ok(())
}

#[test]
fn test_empty_credentials_fail_validation() -> anyhow::Result<()> {
    let source: SourceDescriptor = serde_json::from_str(
        r#"{
            "inputFormat": "stream",
            "streamSelection": "sfdc",
            "object": "Account",
            "username": "u",
            "password": "",
            "token": "t",
            "endpointUrl": "https://login.example.com"
        }"#,
    )?;
    match source.validate() {
        Err(IngestError::Validation { field, .. }) => assert_eq!(field, "password"),
        other => panic!("expected validation error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_unknown_input_format_is_rejected() {
    let result: Result<SourceDescriptor, _> =
        serde_json::from_str(r#"{"inputFormat": "manual", "path": "/x"}"#);
    assert!(result.is_err());
}

#[test]
fn test_sink_with_both_tag_spellings() -> anyhow::Result<()> {
    let sink: SinkDescriptor = serde_json::from_str(
        r#"{"name": "t", "outputFormat": "file", "ouputFormat": "file", "path": "/o"}"#,
    )?;
    assert_eq!(sink.output_format(), SinkKind::File);
    match &sink.target {
        SinkTarget::File(file) => assert_eq!(file.path, "/o"),
        other => panic!("unexpected target: {other:?}"),
    }
    sink.validate()?;
    Ok(())
}

#[test]
fn test_sink_with_conflicting_tag_spellings() {
    let err = serde_json::from_str::<SinkDescriptor>(
        r#"{"name": "t", "outputFormat": "file", "ouputFormat": "index", "path": "/o"}"#,
    )
    .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Invalid 'outputFormat'"), "{message}");
    assert!(message.contains("'file' disagrees with ouputFormat 'index'"), "{message}");
}

#[test]
fn test_sink_without_tag_is_rejected() {
    let err = serde_json::from_str::<SinkDescriptor>(r#"{"name": "t", "path": "/o"}"#).unwrap_err();
    assert!(err.to_string().contains("Invalid 'outputFormat': is required"));
}
