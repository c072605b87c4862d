//! Format registry
//!
//! Infers how a source is serialized and what its fields look like:
//!
//! - [`registry`]: dispatch over source kinds
//! - [`sniff`]: delimiter, quote and header heuristics over a byte sample
//! - [`encoding`]: encoding detection and lossy decoding
//! - [`infer`]: field type inference from decoded samples
//! - [`catalog_types`]: catalog type names to semantic types
//! - [`escape`]: reversible whitespace escaping for the UI transport

pub mod catalog_types;
pub mod encoding;
pub mod escape;
pub mod infer;
pub mod registry;
pub mod sniff;

pub use catalog_types::field_type_for;
pub use escape::{escape_format, escape_whitespace, unescape_format, unescape_whitespace};
pub use registry::{query_reference, FormatRegistry};
