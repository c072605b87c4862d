//! Sink preparation for ingest runs.
//!
//! Sinks are created before submission:
//! - DDL rendering for table and database sinks
//! - Idempotent creation guarded by an existence check
//! - Compensating deletes when a run is cancelled or submission fails

mod cancel;
pub mod ddl;
mod prepare;

pub use cancel::CancellationToken;
pub use ddl::{quote_ident, quote_literal, split_qualified, sql_type, DatabaseDdl, TableDdl};
pub use prepare::{CreatedResource, Prepared, SinkPreparer};
