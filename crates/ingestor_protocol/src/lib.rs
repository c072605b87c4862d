//! Shared types for the ingestor.
//!
//! Descriptors describe one pipeline run: a [`SourceDescriptor`] to read from
//! and a [`SinkDescriptor`] to write to. Collaborators (catalog, index
//! server, filesystem, execution engine, ...) are reached only through the
//! traits in [`services`], bundled in [`Collaborators`].

pub mod config;
pub mod defaults;
pub mod descriptors;
pub mod error;
pub mod paths;
pub mod services;
pub mod types;

pub use config::{ApplicationConfig, ClusterConfig, ConfigError, IngestConfig, SubmissionConfig};

pub use descriptors::{
    CrmStream, DatabaseSink, FileSink, FileSource, IndexSink, KafkaStream, QuerySource,
    RdbmsSource, SinkDescriptor, SinkTarget, SourceDescriptor, StreamSource, TableFormat,
    TableSink, TableSource,
};

pub use error::{IngestError, IngestResult, ServiceContext, ServiceError, ServiceResult};

pub use services::{
    BatchTask, Capabilities, Catalog, ClusterRegistry, Collaborators, CrmClient,
    DatabaseMetadata, ExecutionEngine, FileStat, Filesystem, IndexField, IndexResponse,
    IndexServer, IndexSpec, QueryService, RdbmsService, TableMetadata, TaskHandle,
};

pub use types::{
    ColumnInfo, FieldGuess, FieldSpec, FieldType, FormatGuess, FormatType, JobHandle, Operation,
    SinkKind, SourceKind,
};
