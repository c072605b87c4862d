//! End-to-end runs against the in-memory collaborators.

use ingestor::{CancellationToken, Pipeline};
use ingestor_protocol::{
    DatabaseSink, FieldSpec, FieldType, FileSink, FileSource, FormatGuess, IndexSink, IngestConfig,
    IngestError, KafkaStream, QuerySource, RdbmsSource, ServiceError, SinkDescriptor, SinkTarget,
    SourceDescriptor, StreamSource, TableSink, TableSource,
};
use ingestor_test_utils::{FakeCluster, StaticCluster};

const CSV: &str = "id,name\n1,a\n2,b\n";

fn csv_source(path: &str) -> SourceDescriptor {
    SourceDescriptor::File(FileSource {
        path: path.to_string(),
        format: Some(FormatGuess::csv(",", "\"", true)),
    })
}

fn kafka_source() -> SourceDescriptor {
    kafka_topic("t1")
}

fn kafka_topic(topic: &str) -> SourceDescriptor {
    SourceDescriptor::Stream(StreamSource::Kafka(KafkaStream {
        topics: topic.to_string(),
        delimiter_type: "delimited".to_string(),
        delimiter: ",".to_string(),
        field_names: "id,name".to_string(),
        field_types: "int,string".to_string(),
    }))
}

fn columns() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("id", FieldType::Int),
        FieldSpec::new("name", FieldType::String),
    ]
}

fn index_sink(name: &str) -> SinkDescriptor {
    SinkDescriptor::new(name, SinkTarget::Index(IndexSink::default())).with_columns(columns())
}

fn pipeline(cluster: &FakeCluster) -> Pipeline {
    Pipeline::new(cluster.collaborators(), IngestConfig::default())
}

fn run(
    cluster: &FakeCluster,
    source: &SourceDescriptor,
    sink: &SinkDescriptor,
) -> Result<ingestor::PipelineRun, IngestError> {
    pipeline(cluster).run(source, sink, &CancellationToken::new())
}

#[test]
fn test_csv_file_into_new_collection() {
    let cluster = FakeCluster::new();
    cluster.filesystem.put("/x.csv", CSV);

    let result = run(&cluster, &csv_source("/x.csv"), &index_sink("traffic")).unwrap();

    assert_eq!(cluster.log.count("index_server.create_index"), 1);
    assert_eq!(result.handle.status, 0);
    assert!(result.handle.errors.is_empty());
    assert_eq!(result.handle.on_success_url.as_deref(), Some("/indexer/indexes/traffic"));
    assert!(result.handle.task_id.is_none());
    assert_eq!(cluster.index_server.indexed("traffic").unwrap(), CSV.as_bytes());

    let collection = cluster.index_server.collection("traffic").unwrap();
    let names: Vec<&str> = collection.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "hue_id"]);
    assert_eq!(collection.unique_key, "hue_id");

    let document = result.document.unwrap();
    assert!(document.as_str().contains("type = solr"));
    assert!(document.as_str().contains("collection.name = \"traffic\""));
}

#[test]
fn test_kafka_into_file_document() {
    let cluster = FakeCluster::new();
    let sink = SinkDescriptor::new(
        "out",
        SinkTarget::File(FileSink {
            path: "/out".to_string(),
            format: "csv".to_string(),
        }),
    );

    let result = run(&cluster, &kafka_source(), &sink).unwrap();
    let document = result.document.unwrap();
    let text = document.as_str();

    assert!(text.contains("type = kafka"));
    assert!(text.contains("topics = t1"));
    assert!(text.contains("brokers = \"broker1:9092,broker2:9092\""));
    assert!(text.contains("type = filesystem"));
    assert!(text.contains("path = /out"));
    assert!(!text.contains("%("));

    assert_eq!(cluster.log.count("index_server.create_index"), 0);
    assert_eq!(cluster.log.count("engine.execute_statement"), 0);
    assert_eq!(result.handle.task_id.as_deref(), Some("task-1"));
    let tasks = cluster.engine.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(
        cluster.filesystem.contents(&tasks[0].artifacts[0]).unwrap(),
        text.as_bytes()
    );
}

fn file_sink(path: &str) -> SinkDescriptor {
    SinkDescriptor::new(
        path.trim_start_matches('/'),
        SinkTarget::File(FileSink {
            path: path.to_string(),
            format: "csv".to_string(),
        }),
    )
}

#[test]
fn test_staged_runs_keep_their_own_artifacts() {
    let cluster = FakeCluster::new();
    let pipeline = pipeline(&cluster);

    let first = pipeline
        .run(&kafka_topic("topic_a"), &file_sink("/out_a"), &CancellationToken::new())
        .unwrap();
    let second = pipeline
        .run(&kafka_topic("topic_b"), &file_sink("/out_b"), &CancellationToken::new())
        .unwrap();

    let tasks = cluster.engine.tasks();
    assert_eq!(tasks.len(), 2);
    assert_ne!(tasks[0].artifacts, tasks[1].artifacts);
    let first_artifact = cluster.filesystem.contents(&tasks[0].artifacts[0]).unwrap();
    let second_artifact = cluster.filesystem.contents(&tasks[1].artifacts[0]).unwrap();
    assert_eq!(first_artifact, first.document.unwrap().as_str().as_bytes());
    assert_eq!(second_artifact, second.document.unwrap().as_str().as_bytes());
    assert!(String::from_utf8(first_artifact).unwrap().contains("topics = topic_a"));
}

#[test]
fn test_missing_kudu_master_changes_nothing() {
    let cluster = FakeCluster::with_registry(|log| StaticCluster::new(log).without_kudu());
    let sink = SinkDescriptor::new("events", SinkTarget::Table(TableSink::default()))
        .with_primary_key("id");

    let err = run(&cluster, &kafka_source(), &sink).unwrap_err();

    match err {
        IngestError::ExternalService { service, source } => {
            assert_eq!(service, "cluster registry");
            assert!(matches!(source, ServiceError::NotFound(_)));
        }
        other => panic!("expected ExternalService, got {:?}", other),
    }
    assert!(cluster.log.mutations().is_empty());
    assert!(!cluster.catalog.has_table("default", "events"));
}

#[test]
fn test_second_run_creates_nothing() {
    let cluster = FakeCluster::new();
    cluster.filesystem.put("/x.csv", CSV);
    let pipeline = pipeline(&cluster);
    let source = csv_source("/x.csv");
    let sink = index_sink("traffic");

    pipeline.run(&source, &sink, &CancellationToken::new()).unwrap();
    pipeline.run(&source, &sink, &CancellationToken::new()).unwrap();

    assert_eq!(cluster.log.count("index_server.create_index"), 1);
    assert_eq!(cluster.log.count("index_server.index"), 2);
    assert_eq!(cluster.index_server.collection_names(), vec!["traffic"]);
}

#[test]
fn test_table_created_once_then_reused() {
    let cluster = FakeCluster::new();
    let sink = SinkDescriptor::new("events", SinkTarget::Table(TableSink::default()))
        .with_primary_key("id");
    let pipeline = pipeline(&cluster);

    let first = pipeline
        .run(&kafka_source(), &sink, &CancellationToken::new())
        .unwrap();
    pipeline
        .run(&kafka_source(), &sink, &CancellationToken::new())
        .unwrap();

    let statements = cluster.engine.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("CREATE TABLE `default`.`events`"));
    assert!(cluster.catalog.has_table("default", "events"));
    assert_eq!(cluster.log.count("engine.submit_batch_task"), 2);

    let text = first.document.unwrap().into_string();
    assert!(text.contains("connection = \"kudu-master:7051\""));
    assert!(text.contains("table.name = \"impala::default.events\""));
}

#[test]
fn test_generated_table_key_is_filled_by_document() {
    let cluster = FakeCluster::new();
    let sink = SinkDescriptor::new("events", SinkTarget::Table(TableSink::default()));

    let result = run(&cluster, &kafka_source(), &sink).unwrap();

    let statements = cluster.engine.statements();
    assert!(statements[0].contains("PRIMARY KEY (`hue_id`)"));
    let text = result.document.unwrap().into_string();
    assert!(text.contains(
        "query.literal = \"SELECT `id`, `name`, uuid() AS `hue_id` FROM inputdata\""
    ));
}

#[test]
fn test_unsupported_pairs_make_no_calls() {
    let sources = [
        SourceDescriptor::Table(TableSource {
            database: "default".to_string(),
            table: "orders".to_string(),
        }),
        SourceDescriptor::Query(QuerySource {
            query_id: None,
            statement: Some("SELECT 1".to_string()),
        }),
        SourceDescriptor::Rdbms(RdbmsSource {
            rdbms_type: "mysql".to_string(),
            database: "crm".to_string(),
            table: "accounts".to_string(),
        }),
    ];
    let sinks = [
        file_sink("/out"),
        SinkDescriptor::new("events", SinkTarget::Table(TableSink::default())),
        index_sink("traffic"),
    ];

    for source in &sources {
        for sink in &sinks {
            let cluster = FakeCluster::new();
            let err = run(&cluster, source, sink).unwrap_err();
            let expected = format!("'{}'", source.kind());
            assert!(
                matches!(err, IngestError::Template(ref msg) if msg.contains(&expected)),
                "{} -> {}: {:?}",
                source.kind(),
                sink.output_format(),
                err
            );
            assert!(
                cluster.log.is_empty(),
                "{} -> {} called {:?}",
                source.kind(),
                sink.output_format(),
                cluster.log.calls()
            );
        }
    }
}

#[test]
fn test_invalid_descriptor_makes_no_calls() {
    let cluster = FakeCluster::new();
    let err = run(&cluster, &csv_source(" "), &index_sink("traffic")).unwrap_err();
    assert!(matches!(err, IngestError::Validation { ref field, .. } if field == "path"));
    assert!(cluster.log.is_empty());
}

#[test]
fn test_rejected_records_are_partial_success() {
    let cluster = FakeCluster::new();
    cluster.filesystem.put("/x.csv", CSV);
    cluster
        .index_server
        .reject_records(vec!["row 2: id is not an int".to_string()]);

    let result = run(&cluster, &csv_source("/x.csv"), &index_sink("traffic")).unwrap();

    assert_eq!(result.handle.status, 0);
    assert!(result.handle.is_partial());
    assert_eq!(result.handle.errors, vec!["row 2: id is not an int"]);
    assert!(cluster.index_server.collection("traffic").is_some());
    let index_call = &cluster.log.calls_to("index_server.index")[0];
    assert!(index_call.contains("processor=tolerant"));
    assert!(index_call.contains("map=NULL:"));
}

#[test]
fn test_upload_limit_checked_before_creation() {
    let cluster = FakeCluster::new();
    cluster.filesystem.put("/x.csv", CSV);
    let mut config = IngestConfig::default();
    config.submission.max_upload_bytes = 4;
    let pipeline = Pipeline::new(cluster.collaborators(), config);

    let err = pipeline
        .run(&csv_source("/x.csv"), &index_sink("traffic"), &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, IngestError::Validation { .. }));
    assert!(cluster.log.mutations().is_empty());
}

#[test]
fn test_database_sink_runs_ddl_only() {
    let cluster = FakeCluster::new();
    let sink = SinkDescriptor::new(
        "sales",
        SinkTarget::Database(DatabaseSink {
            description: "Sales data".to_string(),
            use_default_location: true,
            non_default_location: None,
        }),
    );

    let result = run(&cluster, &csv_source("/x.csv"), &sink).unwrap();

    assert!(result.document.is_none());
    assert_eq!(result.handle.on_success_url.as_deref(), Some("/metastore/tables/sales"));
    assert_eq!(result.handle.task_id.as_deref(), Some("stmt-1"));
    assert!(cluster.catalog.has_database("sales"));
    assert_eq!(cluster.log.count("engine.submit_batch_task"), 0);
}

#[test]
fn test_cancel_rolls_back_new_collection() {
    let cluster = FakeCluster::new();
    cluster.filesystem.put("/x.csv", CSV);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline(&cluster)
        .run(&csv_source("/x.csv"), &index_sink("traffic"), &cancel)
        .unwrap_err();

    assert!(matches!(err, IngestError::Cancelled(_)));
    assert_eq!(cluster.log.count("index_server.create_index"), 1);
    assert_eq!(cluster.log.count("index_server.delete_index"), 1);
    assert_eq!(cluster.log.count("index_server.index"), 0);
    assert!(cluster.index_server.collection_names().is_empty());
}

#[test]
fn test_failed_index_call_rolls_back() {
    let cluster = FakeCluster::new();
    cluster.filesystem.put("/x.csv", CSV);
    cluster.log.fail_on("index_server.index");

    let err = run(&cluster, &csv_source("/x.csv"), &index_sink("traffic")).unwrap_err();

    assert!(matches!(
        err,
        IngestError::ExternalService { service: "index server", .. }
    ));
    assert_eq!(
        cluster.log.calls_to("index_server.delete_index"),
        vec!["index_server.delete_index(traffic)"]
    );
    assert!(cluster.index_server.collection("traffic").is_none());
}

#[test]
fn test_failed_run_keeps_existing_collection() {
    let cluster = FakeCluster::new();
    cluster.filesystem.put("/x.csv", CSV);
    let pipeline = pipeline(&cluster);
    pipeline
        .run(&csv_source("/x.csv"), &index_sink("traffic"), &CancellationToken::new())
        .unwrap();
    cluster.log.fail_on("index_server.index");

    assert!(pipeline
        .run(&csv_source("/x.csv"), &index_sink("traffic"), &CancellationToken::new())
        .is_err());
    assert_eq!(cluster.log.count("index_server.delete_index"), 0);
    assert!(cluster.index_server.collection("traffic").is_some());
}

#[test]
fn test_kafka_into_index_is_staged() {
    let cluster = FakeCluster::new();
    let sink = SinkDescriptor::new("clicks", SinkTarget::Index(IndexSink::default()));

    let result = run(&cluster, &kafka_source(), &sink).unwrap();

    let handle = result.handle;
    assert_eq!(handle.task_id.as_deref(), Some("task-1"));
    assert_eq!(handle.on_success_url.as_deref(), Some("/indexer/indexes/clicks"));
    assert!(handle.pub_sub_url.is_some());
    assert_eq!(cluster.log.count("index_server.index"), 0);

    let collection = cluster.index_server.collection("clicks").unwrap();
    let names: Vec<&str> = collection.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "hue_id"]);

    let text = result.document.unwrap().into_string();
    assert!(text.contains("connection = \"http://localhost:8983/solr/\""));
}

#[test]
fn test_file_into_index_as_job() {
    let cluster = FakeCluster::new();
    cluster.filesystem.put("/x.csv", CSV);
    let sink = SinkDescriptor::new(
        "traffic",
        SinkTarget::Index(IndexSink {
            run_job: true,
            job_lib_path: Some("/libs/custom.jar".to_string()),
            ..IndexSink::default()
        }),
    )
    .with_columns(columns());

    let result = run(&cluster, &csv_source("/x.csv"), &sink).unwrap();

    assert_eq!(cluster.log.count("index_server.index"), 0);
    assert_eq!(cluster.log.count("filesystem.stat"), 0);
    let tasks = cluster.engine.tasks();
    assert_eq!(tasks[0].lib_path, "/libs/custom.jar");
    assert_eq!(tasks[0].name, "Ingesting into traffic");
    assert_eq!(result.handle.task_id.as_deref(), Some("task-1"));
}

#[test]
fn test_render_makes_no_mutations() {
    let cluster = FakeCluster::new();
    let document = pipeline(&cluster)
        .render(&kafka_source(), &index_sink("clicks"))
        .unwrap();

    assert!(document.as_str().contains("type = upsert"));
    assert!(cluster.log.mutations().is_empty());
}
