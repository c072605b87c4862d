//! Ingestor - pipeline configuration compiler
//!
//! Turns a source descriptor and a sink descriptor into a configuration
//! document for the execution engine, prepares the sink resource it writes
//! to, and submits the run.
//!
//! - [`templates`]: template selection, binding and document assembly
//! - [`properties`]: cluster values a document needs (brokers, kudu master, index endpoint)
//! - [`submit`]: direct and staged submission
//! - [`pipeline`]: the ordered run with rollback
//! - [`local`]: local-disk and config-backed collaborators for the CLI

pub mod local;
pub mod pipeline;
pub mod properties;
pub mod submit;
pub mod templates;

pub use ingestor_formats as formats;
pub use ingestor_protocol as protocol;
pub use ingestor_sinks::CancellationToken;

pub use local::{LocalFilesystem, StaticClusterRegistry};
pub use pipeline::{Pipeline, PipelineRun};
pub use properties::ClusterProperties;
pub use submit::Submitter;
pub use templates::{Assembler, ConfigDocument};
