//! Field model
//!
//! - [`fields`]: raw column resolution and keep/skip partitioning
//! - [`sink_schema`]: sink schema, unique-key policy and loader options

pub mod fields;
pub mod sink_schema;

pub use fields::{resolve_fields, resolve_specs, split_kept, RawColumn};
pub use sink_schema::{
    derive_sink_options, with_tolerant_processor, SinkOptions, SinkSchema, UniqueKey,
};
