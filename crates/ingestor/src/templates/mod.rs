//! Template assembler.
//!
//! A document is chosen in two independent stages: the input block by the
//! source kind, the output block by the sink's `outputFormat`. Both blocks
//! are bound and checked before anything is rendered, then spliced into the
//! fixed skeleton where `outputdata` always depends on `inputdata`.

pub mod engine;
pub mod input;
pub mod output;

use std::fmt;

use ingestor_protocol::{
    ApplicationConfig, FieldSpec, IngestError, IngestResult, SinkDescriptor, SinkKind,
    SinkTarget, SourceDescriptor, SourceKind, StreamSource,
};
use ingestor_schema::SinkSchema;
use serde::Serialize;
use tracing::debug;

use crate::properties::ClusterProperties;
use engine::{bare_or_quoted, quoted, Bindings, Template};
use input::{CrmInput, FilesystemInput, InputBlock, KafkaInput};
use output::{FileOutput, IndexOutput, OutputBlock, TableOutput};

const SKELETON: Template = Template::new(
    "skeleton",
    r#"application {
    name = "%(app_name)s"
    batch.milliseconds = %(batch_milliseconds)s
    executors = %(executors)s
    executor.cores = %(executor_cores)s
    executor.memory = %(executor_memory)s
}

steps {
    inputdata {
        input {
%(input)s
        }
    }

    outputdata {
        dependencies = [inputdata]
%(output)s
    }
}
"#,
);

/// A bound property value, exactly as given, or a template error naming the
/// block and the property. Blank values count as missing.
pub(crate) fn required<S: AsRef<str>>(
    block: &str,
    property: &str,
    value: Option<S>,
) -> IngestResult<String> {
    match value {
        Some(value) if !value.as_ref().trim().is_empty() => Ok(value.as_ref().to_string()),
        _ => Err(IngestError::template(format!(
            "'{}' requires property '{}'",
            block, property
        ))),
    }
}

/// Same as [`required`] for names, paths and endpoints, which are trimmed.
pub(crate) fn required_name<S: AsRef<str>>(
    block: &str,
    property: &str,
    value: Option<S>,
) -> IngestResult<String> {
    required(block, property, value).map(|value| value.trim().to_string())
}

/// Sink fields: the descriptor's columns, or the stream's declared fields
/// when the descriptor lists none.
pub(crate) fn sink_fields(
    source: &SourceDescriptor,
    sink: &SinkDescriptor,
) -> IngestResult<Vec<FieldSpec>> {
    if !sink.columns.is_empty() {
        return Ok(sink.columns.clone());
    }
    match source {
        SourceDescriptor::Stream(StreamSource::Kafka(kafka)) => kafka.declared_fields(),
        _ => Ok(Vec::new()),
    }
}

pub(crate) fn sink_schema(
    source: &SourceDescriptor,
    sink: &SinkDescriptor,
) -> IngestResult<SinkSchema> {
    SinkSchema::build(&sink_fields(source, sink)?, sink.primary_key.as_deref())
}

/// An assembled pipeline document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigDocument {
    text: String,
    #[serde(skip)]
    source_kind: SourceKind,
    #[serde(skip)]
    sink_kind: SinkKind,
}

impl ConfigDocument {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn sink_kind(&self) -> SinkKind {
        self.sink_kind
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub struct Assembler {
    application: ApplicationConfig,
}

impl Assembler {
    pub fn new(application: ApplicationConfig) -> Self {
        Self { application }
    }

    /// Whether a template exists for both kinds. Pure; checked before any
    /// collaborator is contacted.
    pub fn supports(source: SourceKind, sink: SinkKind) -> bool {
        InputBlock::supports(source) && OutputBlock::supports(sink)
    }

    /// Same as [`Assembler::supports`], as a template error naming the
    /// unsupported discriminant.
    pub fn check_supported(source: SourceKind, sink: SinkKind) -> IngestResult<()> {
        if !InputBlock::supports(source) {
            return Err(IngestError::template(format!(
                "no input template for inputFormat '{}'",
                source
            )));
        }
        if !OutputBlock::supports(sink) {
            return Err(IngestError::template(format!(
                "no output template for outputFormat '{}'",
                sink
            )));
        }
        Ok(())
    }

    pub fn input_block(
        source: &SourceDescriptor,
        properties: &ClusterProperties,
    ) -> IngestResult<InputBlock> {
        match source {
            SourceDescriptor::Stream(StreamSource::Kafka(kafka)) => Ok(InputBlock::Kafka(
                KafkaInput::bind(kafka, properties.brokers.as_deref())?,
            )),
            SourceDescriptor::Stream(StreamSource::Crm(crm)) => {
                Ok(InputBlock::Crm(CrmInput::bind(crm)?))
            }
            SourceDescriptor::File(file) => Ok(InputBlock::Filesystem(FilesystemInput::bind(file)?)),
            SourceDescriptor::Table(_) | SourceDescriptor::Query(_) | SourceDescriptor::Rdbms(_) => {
                Err(IngestError::template(format!(
                    "no input template for inputFormat '{}'",
                    source.kind()
                )))
            }
        }
    }

    pub fn output_block(
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
        properties: &ClusterProperties,
    ) -> IngestResult<OutputBlock> {
        match &sink.target {
            SinkTarget::File(file) => Ok(OutputBlock::File(FileOutput::bind(
                file,
                &sink_fields(source, sink)?,
            )?)),
            SinkTarget::Table(table) => Ok(OutputBlock::Table(TableOutput::bind(
                sink,
                table,
                &sink_schema(source, sink)?,
                properties.kudu_master.as_deref(),
            )?)),
            SinkTarget::Index(_) => Ok(OutputBlock::Index(IndexOutput::bind(
                sink,
                properties.index_endpoint.as_deref(),
            )?)),
            SinkTarget::Database(_) => Err(IngestError::template(format!(
                "no output template for outputFormat '{}'",
                sink.output_format()
            ))),
        }
    }

    pub fn assemble(
        &self,
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
        properties: &ClusterProperties,
    ) -> IngestResult<ConfigDocument> {
        Self::check_supported(source.kind(), sink.output_format())?;
        let input = Self::input_block(source, properties)?;
        let output = Self::output_block(source, sink, properties)?;

        let input_text = input.render()?;
        let output_text = output.render()?;
        let bindings = Bindings::from([
            ("app_name", quoted(&self.application.name)),
            ("batch_milliseconds", self.application.batch_milliseconds.to_string()),
            ("executors", self.application.executors.to_string()),
            ("executor_cores", self.application.executor_cores.to_string()),
            ("executor_memory", bare_or_quoted(&self.application.executor_memory)),
            ("input", input_text),
            ("output", output_text),
        ]);
        let text = SKELETON.render(&bindings)?;
        debug!(
            "Assembled {} -> {} document ({} bytes)",
            source.kind(),
            sink.output_format(),
            text.len()
        );
        Ok(ConfigDocument {
            text,
            source_kind: source.kind(),
            sink_kind: sink.output_format(),
        })
    }
}
