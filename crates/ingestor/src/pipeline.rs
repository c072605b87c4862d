//! One ingest run, end to end.
//!
//! Steps run in a fixed order and every check that needs no collaborator
//! comes first:
//!
//! 1. descriptor validation and template support (pure)
//! 2. sink schema and DDL (pure)
//! 3. cluster property lookup and document assembly (reads only)
//! 4. sink preparation (creates resources)
//! 5. submission, guarded by rollback of step 4

use ingestor_protocol::{
    Capabilities, Collaborators, IndexSpec, IndexSink, IngestConfig, IngestResult,
    JobHandle, SinkDescriptor, SinkTarget, SourceDescriptor, StreamSource,
};
use ingestor_schema::SinkSchema;
use ingestor_sinks::{CancellationToken, DatabaseDdl, Prepared, SinkPreparer, TableDdl};
use serde::Serialize;
use tracing::{debug, info};

use crate::properties::ClusterProperties;
use crate::submit::{database_success_url, index_handle, Submitter};
use crate::templates::{sink_schema, Assembler, ConfigDocument};

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRun {
    /// Absent for database sinks, which only run DDL.
    pub document: Option<ConfigDocument>,
    pub handle: JobHandle,
}

/// Resource a sink needs before submission.
enum SinkPlan {
    Nothing,
    Collection(IndexSpec),
    Table(TableDdl),
}

/// How the run is handed over.
enum Delivery {
    /// File bytes posted to the index server.
    Direct { path: String, size: u64 },
    /// Document staged and run as a batch task.
    Staged { lib_path: String },
}

pub struct Pipeline {
    collaborators: Collaborators,
    config: IngestConfig,
    assembler: Assembler,
    preparer: SinkPreparer,
    submitter: Submitter,
    presets: ClusterProperties,
    user: String,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, config: IngestConfig) -> Self {
        let capabilities = collaborators.capabilities();
        debug!("Pipeline capabilities: {:?}", capabilities);
        Self {
            assembler: Assembler::new(config.application.clone()),
            preparer: SinkPreparer::new(collaborators.clone()),
            submitter: Submitter::new(collaborators.clone(), config.submission.clone()),
            presets: ClusterProperties::from_config(&config.cluster),
            collaborators,
            config,
            user: "ingestor".to_string(),
        }
    }

    /// Cluster values that win over collaborator lookups.
    pub fn with_presets(mut self, presets: ClusterProperties) -> Self {
        self.presets = presets;
        self
    }

    /// Name recorded in the audit line.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.collaborators.capabilities()
    }

    /// Assemble the document for a source/sink pair without creating or
    /// submitting anything.
    pub fn render(
        &self,
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
    ) -> IngestResult<ConfigDocument> {
        source.validate()?;
        sink.validate()?;
        Assembler::check_supported(source.kind(), sink.output_format())?;
        self.assemble(source, sink)
    }

    pub fn run(
        &self,
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
        cancel: &CancellationToken,
    ) -> IngestResult<PipelineRun> {
        source.validate()?;
        sink.validate()?;

        if let SinkTarget::Database(database) = &sink.target {
            let ddl = DatabaseDdl::for_sink(sink, database)?;
            let handle = self.create_database(&ddl, cancel)?;
            self.audit(source, sink);
            return Ok(PipelineRun {
                document: None,
                handle,
            });
        }

        Assembler::check_supported(source.kind(), sink.output_format())?;
        let plan = self.plan_sink(source, sink)?;
        let document = self.assemble(source, sink)?;
        let delivery = self.delivery(source, sink)?;

        let mut prepared = Prepared::new();
        match &plan {
            SinkPlan::Nothing => {}
            SinkPlan::Collection(spec) => {
                self.preparer.ensure_collection(spec, &mut prepared)?;
            }
            SinkPlan::Table(ddl) => {
                self.preparer.ensure_table(ddl, &mut prepared)?;
            }
        }

        let handle = self.preparer.finish_with_guard(&prepared, cancel, || {
            self.deliver(source, sink, &document, &delivery)
        })?;
        self.audit(source, sink);
        Ok(PipelineRun {
            document: Some(document),
            handle,
        })
    }

    fn assemble(
        &self,
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
    ) -> IngestResult<ConfigDocument> {
        let properties =
            self.presets
                .resolve(&self.collaborators, source.kind(), sink.output_format())?;
        self.assembler.assemble(source, sink, &properties)
    }

    fn create_database(
        &self,
        ddl: &DatabaseDdl,
        cancel: &CancellationToken,
    ) -> IngestResult<JobHandle> {
        let mut prepared = Prepared::new();
        self.preparer.ensure_database(ddl, &mut prepared)?;
        self.preparer.finish_with_guard(&prepared, cancel, || {
            let handle = JobHandle::success().with_success_url(database_success_url(&ddl.name));
            Ok(match prepared.last_task() {
                Some(task) => handle.with_task(task.id.clone()),
                None => handle,
            })
        })
    }

    fn plan_sink(&self, source: &SourceDescriptor, sink: &SinkDescriptor) -> IngestResult<SinkPlan> {
        match &sink.target {
            SinkTarget::File(_) | SinkTarget::Database(_) => Ok(SinkPlan::Nothing),
            SinkTarget::Table(table) if table.is_target_existing => {
                debug!("Table {} exists by declaration; skipping creation", sink.name);
                Ok(SinkPlan::Nothing)
            }
            SinkTarget::Table(table) => {
                let schema = sink_schema(source, sink)?;
                let ddl = TableDdl::for_sink(sink, table, &schema, &field_delimiter(source))?;
                ddl.render()?;
                Ok(SinkPlan::Table(ddl))
            }
            SinkTarget::Index(index) => {
                let schema = sink_schema(source, sink)?;
                Ok(SinkPlan::Collection(index_spec(sink, index, &schema)))
            }
        }
    }

    fn delivery(&self, source: &SourceDescriptor, sink: &SinkDescriptor) -> IngestResult<Delivery> {
        match (source, &sink.target) {
            (SourceDescriptor::File(file), SinkTarget::Index(index)) if !index.run_job => {
                let size = self.submitter.check_upload(&file.path)?;
                Ok(Delivery::Direct {
                    path: file.path.clone(),
                    size,
                })
            }
            (_, SinkTarget::Index(index)) => Ok(Delivery::Staged {
                lib_path: index
                    .job_lib_path
                    .clone()
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| self.config.submission.engine_lib_path.clone()),
            }),
            _ => Ok(Delivery::Staged {
                lib_path: self.config.submission.engine_lib_path.clone(),
            }),
        }
    }

    fn deliver(
        &self,
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
        document: &ConfigDocument,
        delivery: &Delivery,
    ) -> IngestResult<JobHandle> {
        match delivery {
            Delivery::Direct { path, size } => {
                let schema = sink_schema(source, sink)?;
                let options = schema.sink_options(has_header(source, sink));
                self.submitter.ingest_direct(path, *size, &sink.name, &options)
            }
            Delivery::Staged { lib_path } => {
                let task_name = format!("Ingesting into {}", sink.name);
                let staged = self.submitter.stage(document, &sink.name, &task_name, lib_path)?;
                Ok(match &sink.target {
                    SinkTarget::Index(_) => {
                        let mut handle = index_handle(&sink.name);
                        handle.task_id = staged.task_id;
                        handle
                    }
                    _ => staged,
                })
            }
        }
    }

    fn audit(&self, source: &SourceDescriptor, sink: &SinkDescriptor) {
        info!(
            target: "ingestor::audit",
            "{} exported {} to {}: {}",
            self.user,
            source.kind(),
            sink.output_format(),
            sink.name
        );
    }
}

fn index_spec(sink: &SinkDescriptor, index: &IndexSink, schema: &SinkSchema) -> IndexSpec {
    IndexSpec {
        name: sink.name.trim().to_string(),
        fields: schema.index_fields(),
        unique_key: schema.unique_key().name().to_string(),
        default_field: index.default_field.clone(),
        config_set: index.config_set.clone(),
        shards: index.num_shards,
        replication: index.replication_factor,
    }
}

fn field_delimiter(source: &SourceDescriptor) -> String {
    match source {
        SourceDescriptor::File(file) => file
            .format
            .as_ref()
            .map(|format| format.field_separator.clone())
            .filter(|sep| !sep.is_empty())
            .unwrap_or_else(|| ",".to_string()),
        SourceDescriptor::Stream(StreamSource::Kafka(kafka)) if !kafka.delimiter.is_empty() => {
            kafka.delimiter.clone()
        }
        _ => ",".to_string(),
    }
}

fn has_header(source: &SourceDescriptor, sink: &SinkDescriptor) -> bool {
    match source {
        SourceDescriptor::File(file) => file
            .format
            .as_ref()
            .map_or(sink.has_header, |format| format.has_header),
        _ => sink.has_header,
    }
}
