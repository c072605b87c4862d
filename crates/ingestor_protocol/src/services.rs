//! Collaborator contracts consumed by the core.
//!
//! Every integration is optional. The caller hands a [`Collaborators`] bundle
//! to the pipeline at construction time; [`Collaborators::capabilities`] is
//! the descriptor of what is available, and the `require_*` accessors turn a
//! missing integration into an `ExternalService` error naming it.
//!
//! Calls are blocking and carry no internal timeout; callers impose their own
//! deadline.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult, ServiceResult};
use crate::types::{ColumnInfo, FieldType};

// ============================================================================
// Collaborator data
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub size: u64,
    pub is_dir: bool,
}

/// Storage descriptor of a catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TableMetadata {
    /// Storage format reported by the catalog (`text`, `parquet`, ...).
    pub storage_format: String,
    /// SerDe / storage properties, e.g. `field.delim`.
    #[serde(default)]
    pub storage_properties: BTreeMap<String, String>,
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub path_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DatabaseMetadata {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// A field of an index schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub multi_valued: bool,
}

/// Everything needed to create a search collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    pub name: String,
    pub fields: Vec<IndexField>,
    pub unique_key: String,
    #[serde(default)]
    pub default_field: Option<String>,
    #[serde(default)]
    pub config_set: Option<String>,
    pub shards: u32,
    pub replication: u32,
}

/// Response of a bulk index call. Rejected records are reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IndexResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}

/// A batch task for the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTask {
    pub name: String,
    /// Artifact paths the task reads.
    pub artifacts: Vec<String>,
    pub arguments: Vec<String>,
    pub lib_path: String,
}

/// Opaque handle returned by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub id: String,
}

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

pub trait Filesystem: Send + Sync {
    fn stat(&self, path: &str) -> ServiceResult<FileStat>;
    fn open(&self, path: &str) -> ServiceResult<Box<dyn Read + Send>>;
    /// Read at most `max_bytes` starting at `offset`.
    fn read(&self, path: &str, offset: u64, max_bytes: usize) -> ServiceResult<Vec<u8>>;
    fn mkdir(&self, path: &str) -> ServiceResult<()>;
    fn write_file(&self, path: &str, data: &[u8]) -> ServiceResult<()>;
}

pub trait Catalog: Send + Sync {
    fn get_table(&self, database: &str, table: &str) -> ServiceResult<TableMetadata>;
    fn sample_rows(&self, database: &str, table: &str, limit: usize)
        -> ServiceResult<Vec<Vec<String>>>;
    fn get_database(&self, database: &str) -> ServiceResult<DatabaseMetadata>;
}

pub trait IndexServer: Send + Sync {
    /// Base URL, used as the `connection` of index output blocks.
    fn endpoint(&self) -> ServiceResult<String>;
    fn exists(&self, name: &str) -> ServiceResult<bool>;
    fn create_index(&self, spec: &IndexSpec) -> ServiceResult<()>;
    fn delete_index(&self, name: &str) -> ServiceResult<()>;
    fn index(
        &self,
        name: &str,
        data: &[u8],
        options: &BTreeMap<String, String>,
    ) -> ServiceResult<IndexResponse>;
    /// Whether bulk loads can go through the tolerant update processor,
    /// which reports bad records one by one instead of failing the load.
    fn supports_tolerant_processor(&self) -> ServiceResult<bool> {
        Ok(false)
    }
}

pub trait ClusterRegistry: Send + Sync {
    /// Comma-joined `host:port` list.
    fn broker_list(&self) -> ServiceResult<String>;
    fn kudu_master(&self) -> ServiceResult<String>;
    fn topics(&self) -> ServiceResult<Vec<String>>;
}

pub trait CrmClient: Send + Sync {
    fn list_objects(&self) -> ServiceResult<Vec<String>>;
    /// CSV text of a small sample of the object's records.
    fn sample_records(&self, object: &str) -> ServiceResult<Vec<u8>>;
}

pub trait QueryService: Send + Sync {
    fn columns(&self, query: &str) -> ServiceResult<Vec<ColumnInfo>>;
    fn fetch_sample(&self, query: &str, limit: usize) -> ServiceResult<Vec<Vec<String>>>;
}

pub trait RdbmsService: Send + Sync {
    fn columns(&self, rdbms_type: &str, database: &str, table: &str)
        -> ServiceResult<Vec<ColumnInfo>>;
    fn sample_rows(
        &self,
        rdbms_type: &str,
        database: &str,
        table: &str,
        limit: usize,
    ) -> ServiceResult<Vec<Vec<String>>>;
}

pub trait ExecutionEngine: Send + Sync {
    fn execute_statement(&self, sql: &str) -> ServiceResult<TaskHandle>;
    fn submit_batch_task(&self, task: &BatchTask) -> ServiceResult<TaskHandle>;
}

// ============================================================================
// Capability bundle
// ============================================================================

/// What integrations are available to a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub has_filesystem: bool,
    pub has_catalog: bool,
    pub has_index_server: bool,
    pub has_cluster_registry: bool,
    pub has_crm: bool,
    pub has_query_service: bool,
    pub has_rdbms: bool,
    pub has_execution_engine: bool,
}

pub const FILESYSTEM: &str = "filesystem";
pub const CATALOG: &str = "catalog";
pub const INDEX_SERVER: &str = "index server";
pub const CLUSTER_REGISTRY: &str = "cluster registry";
pub const CRM: &str = "crm";
pub const QUERY_SERVICE: &str = "query service";
pub const RDBMS: &str = "rdbms";
pub const EXECUTION_ENGINE: &str = "execution engine";

#[derive(Clone, Default)]
pub struct Collaborators {
    filesystem: Option<Arc<dyn Filesystem>>,
    catalog: Option<Arc<dyn Catalog>>,
    index_server: Option<Arc<dyn IndexServer>>,
    cluster: Option<Arc<dyn ClusterRegistry>>,
    crm: Option<Arc<dyn CrmClient>>,
    query: Option<Arc<dyn QueryService>>,
    rdbms: Option<Arc<dyn RdbmsService>>,
    engine: Option<Arc<dyn ExecutionEngine>>,
}

macro_rules! collaborator {
    ($with:ident, $require:ident, $field:ident, $trait:ident, $name:expr) => {
        pub fn $with(mut self, value: Arc<dyn $trait>) -> Self {
            self.$field = Some(value);
            self
        }

        pub fn $require(&self) -> IngestResult<&dyn $trait> {
            self.$field
                .as_deref()
                .ok_or_else(|| IngestError::missing_integration($name))
        }
    };
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    collaborator!(with_filesystem, filesystem, filesystem, Filesystem, FILESYSTEM);
    collaborator!(with_catalog, catalog, catalog, Catalog, CATALOG);
    collaborator!(with_index_server, index_server, index_server, IndexServer, INDEX_SERVER);
    collaborator!(with_cluster_registry, cluster_registry, cluster, ClusterRegistry, CLUSTER_REGISTRY);
    collaborator!(with_crm, crm, crm, CrmClient, CRM);
    collaborator!(with_query_service, query_service, query, QueryService, QUERY_SERVICE);
    collaborator!(with_rdbms, rdbms, rdbms, RdbmsService, RDBMS);
    collaborator!(with_execution_engine, execution_engine, engine, ExecutionEngine, EXECUTION_ENGINE);

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_filesystem: self.filesystem.is_some(),
            has_catalog: self.catalog.is_some(),
            has_index_server: self.index_server.is_some(),
            has_cluster_registry: self.cluster.is_some(),
            has_crm: self.crm.is_some(),
            has_query_service: self.query.is_some(),
            has_rdbms: self.rdbms.is_some(),
            has_execution_engine: self.engine.is_some(),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
