//! In-memory collaborators.
//!
//! State is kept behind mutexes so tests can seed it before a run and inspect
//! it afterwards through the same `Arc`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ingestor_protocol::{
    BatchTask, Catalog, ClusterRegistry, ColumnInfo, CrmClient, DatabaseMetadata,
    ExecutionEngine, FileStat, Filesystem, IndexResponse, IndexServer, IndexSpec, QueryService,
    RdbmsService, ServiceError, ServiceResult, TableMetadata, TaskHandle,
};

use crate::log::{lock, CallLog};

// ============================================================================
// Filesystem
// ============================================================================

pub struct MemoryFilesystem {
    log: Arc<CallLog>,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
}

impl MemoryFilesystem {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            files: Mutex::new(BTreeMap::new()),
            dirs: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn put(&self, path: &str, data: impl Into<Vec<u8>>) {
        lock(&self.files).insert(path.to_string(), data.into());
    }

    pub fn put_dir(&self, path: &str) {
        lock(&self.dirs).insert(path.to_string());
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.files).get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        lock(&self.dirs).contains(path)
    }

    fn bytes(&self, path: &str) -> ServiceResult<Vec<u8>> {
        lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(path.to_string()))
    }
}

impl Filesystem for MemoryFilesystem {
    fn stat(&self, path: &str) -> ServiceResult<FileStat> {
        self.log.record("filesystem.stat", path)?;
        if self.has_dir(path) {
            return Ok(FileStat { size: 0, is_dir: true });
        }
        let size = self.bytes(path)?.len() as u64;
        Ok(FileStat { size, is_dir: false })
    }

    fn open(&self, path: &str) -> ServiceResult<Box<dyn Read + Send>> {
        self.log.record("filesystem.open", path)?;
        Ok(Box::new(Cursor::new(self.bytes(path)?)))
    }

    fn read(&self, path: &str, offset: u64, max_bytes: usize) -> ServiceResult<Vec<u8>> {
        self.log
            .record("filesystem.read", format!("{}, {}, {}", path, offset, max_bytes))?;
        let data = self.bytes(path)?;
        let start = (offset as usize).min(data.len());
        let end = start.saturating_add(max_bytes).min(data.len());
        Ok(data[start..end].to_vec())
    }

    fn mkdir(&self, path: &str) -> ServiceResult<()> {
        self.log.record("filesystem.mkdir", path)?;
        lock(&self.dirs).insert(path.to_string());
        Ok(())
    }

    fn write_file(&self, path: &str, data: &[u8]) -> ServiceResult<()> {
        self.log
            .record("filesystem.write_file", format!("{}, {} bytes", path, data.len()))?;
        self.put(path, data.to_vec());
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

pub struct FakeCatalog {
    log: Arc<CallLog>,
    tables: Mutex<BTreeMap<(String, String), TableMetadata>>,
    samples: Mutex<BTreeMap<(String, String), Vec<Vec<String>>>>,
    databases: Mutex<BTreeSet<String>>,
}

fn table_key(database: &str, table: &str) -> (String, String) {
    (database.to_string(), table.to_string())
}

impl FakeCatalog {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            tables: Mutex::new(BTreeMap::new()),
            samples: Mutex::new(BTreeMap::new()),
            databases: Mutex::new(BTreeSet::from(["default".to_string()])),
        }
    }

    pub fn add_table(&self, database: &str, table: &str, metadata: TableMetadata) {
        lock(&self.databases).insert(database.to_string());
        lock(&self.tables).insert(table_key(database, table), metadata);
    }

    pub fn add_sample(&self, database: &str, table: &str, rows: Vec<Vec<String>>) {
        lock(&self.samples).insert(table_key(database, table), rows);
    }

    pub fn add_database(&self, database: &str) {
        lock(&self.databases).insert(database.to_string());
    }

    pub fn drop_table(&self, database: &str, table: &str) {
        lock(&self.tables).remove(&table_key(database, table));
    }

    pub fn drop_database(&self, database: &str) {
        lock(&self.databases).remove(database);
    }

    pub fn has_table(&self, database: &str, table: &str) -> bool {
        lock(&self.tables).contains_key(&table_key(database, table))
    }

    pub fn has_database(&self, database: &str) -> bool {
        lock(&self.databases).contains(database)
    }
}

impl Catalog for FakeCatalog {
    fn get_table(&self, database: &str, table: &str) -> ServiceResult<TableMetadata> {
        self.log
            .record("catalog.get_table", format!("{}.{}", database, table))?;
        lock(&self.tables)
            .get(&table_key(database, table))
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("{}.{}", database, table)))
    }

    fn sample_rows(
        &self,
        database: &str,
        table: &str,
        limit: usize,
    ) -> ServiceResult<Vec<Vec<String>>> {
        self.log
            .record("catalog.sample_rows", format!("{}.{}, {}", database, table, limit))?;
        let mut rows = lock(&self.samples)
            .get(&table_key(database, table))
            .cloned()
            .unwrap_or_default();
        rows.truncate(limit);
        Ok(rows)
    }

    fn get_database(&self, database: &str) -> ServiceResult<DatabaseMetadata> {
        self.log.record("catalog.get_database", database)?;
        if self.has_database(database) {
            Ok(DatabaseMetadata {
                name: database.to_string(),
                location: None,
            })
        } else {
            Err(ServiceError::NotFound(database.to_string()))
        }
    }
}

// ============================================================================
// Index server
// ============================================================================

pub struct FakeIndexServer {
    log: Arc<CallLog>,
    endpoint: String,
    collections: Mutex<BTreeMap<String, IndexSpec>>,
    documents: Mutex<BTreeMap<String, Vec<u8>>>,
    rejected: Mutex<Vec<String>>,
    tolerant: AtomicBool,
}

impl FakeIndexServer {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            endpoint: "http://localhost:8983/solr/".to_string(),
            collections: Mutex::new(BTreeMap::new()),
            documents: Mutex::new(BTreeMap::new()),
            rejected: Mutex::new(Vec::new()),
            tolerant: AtomicBool::new(true),
        }
    }

    /// Behave like a server without the tolerant update processor.
    pub fn without_tolerant_processor(&self) {
        self.tolerant.store(false, Ordering::SeqCst);
    }

    /// Per-record errors every later `index` call reports.
    pub fn reject_records(&self, errors: Vec<String>) {
        *lock(&self.rejected) = errors;
    }

    pub fn add_collection(&self, spec: IndexSpec) {
        lock(&self.collections).insert(spec.name.clone(), spec);
    }

    pub fn collection(&self, name: &str) -> Option<IndexSpec> {
        lock(&self.collections).get(name).cloned()
    }

    pub fn collection_names(&self) -> Vec<String> {
        lock(&self.collections).keys().cloned().collect()
    }

    pub fn indexed(&self, name: &str) -> Option<Vec<u8>> {
        lock(&self.documents).get(name).cloned()
    }
}

impl IndexServer for FakeIndexServer {
    fn endpoint(&self) -> ServiceResult<String> {
        self.log.record("index_server.endpoint", "")?;
        Ok(self.endpoint.clone())
    }

    fn exists(&self, name: &str) -> ServiceResult<bool> {
        self.log.record("index_server.exists", name)?;
        Ok(lock(&self.collections).contains_key(name))
    }

    fn create_index(&self, spec: &IndexSpec) -> ServiceResult<()> {
        self.log.record("index_server.create_index", &spec.name)?;
        let mut collections = lock(&self.collections);
        if collections.contains_key(&spec.name) {
            return Err(ServiceError::Failed(format!(
                "collection {} already exists",
                spec.name
            )));
        }
        collections.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    fn delete_index(&self, name: &str) -> ServiceResult<()> {
        self.log.record("index_server.delete_index", name)?;
        lock(&self.collections)
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))
    }

    fn index(
        &self,
        name: &str,
        data: &[u8],
        options: &BTreeMap<String, String>,
    ) -> ServiceResult<IndexResponse> {
        let rendered: Vec<String> = options.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        self.log
            .record("index_server.index", format!("{}, {}", name, rendered.join("&")))?;
        if !lock(&self.collections).contains_key(name) {
            return Err(ServiceError::NotFound(name.to_string()));
        }
        lock(&self.documents).insert(name.to_string(), data.to_vec());
        Ok(IndexResponse {
            errors: lock(&self.rejected).clone(),
        })
    }

    fn supports_tolerant_processor(&self) -> ServiceResult<bool> {
        self.log.record("index_server.supports_tolerant_processor", "")?;
        Ok(self.tolerant.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Cluster registry, CRM, query and RDBMS services
// ============================================================================

pub struct StaticCluster {
    log: Arc<CallLog>,
    pub brokers: Option<String>,
    pub kudu_master: Option<String>,
    pub topics: Vec<String>,
}

impl StaticCluster {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            brokers: Some("broker1:9092,broker2:9092".to_string()),
            kudu_master: Some("kudu-master:7051".to_string()),
            topics: vec!["t1".to_string(), "t2".to_string()],
        }
    }

    pub fn without_kudu(mut self) -> Self {
        self.kudu_master = None;
        self
    }

    pub fn without_brokers(mut self) -> Self {
        self.brokers = None;
        self
    }
}

impl ClusterRegistry for StaticCluster {
    fn broker_list(&self) -> ServiceResult<String> {
        self.log.record("cluster.broker_list", "")?;
        self.brokers
            .clone()
            .ok_or_else(|| ServiceError::NotFound("kafka brokers".to_string()))
    }

    fn kudu_master(&self) -> ServiceResult<String> {
        self.log.record("cluster.kudu_master", "")?;
        self.kudu_master
            .clone()
            .ok_or_else(|| ServiceError::NotFound("kudu master".to_string()))
    }

    fn topics(&self) -> ServiceResult<Vec<String>> {
        self.log.record("cluster.topics", "")?;
        Ok(self.topics.clone())
    }
}

pub struct FakeCrm {
    log: Arc<CallLog>,
    pub objects: Vec<String>,
    pub records: BTreeMap<String, Vec<u8>>,
}

impl FakeCrm {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            objects: vec!["Account".to_string(), "Contact".to_string()],
            records: BTreeMap::new(),
        }
    }
}

impl CrmClient for FakeCrm {
    fn list_objects(&self) -> ServiceResult<Vec<String>> {
        self.log.record("crm.list_objects", "")?;
        Ok(self.objects.clone())
    }

    fn sample_records(&self, object: &str) -> ServiceResult<Vec<u8>> {
        self.log.record("crm.sample_records", object)?;
        self.records
            .get(object)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(object.to_string()))
    }
}

/// Answers every query with the same columns and rows.
pub struct FakeQueryService {
    log: Arc<CallLog>,
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<String>>,
}

impl FakeQueryService {
    pub fn new(log: Arc<CallLog>, columns: Vec<ColumnInfo>, rows: Vec<Vec<String>>) -> Self {
        Self { log, columns, rows }
    }
}

impl QueryService for FakeQueryService {
    fn columns(&self, query: &str) -> ServiceResult<Vec<ColumnInfo>> {
        self.log.record("query.columns", query)?;
        Ok(self.columns.clone())
    }

    fn fetch_sample(&self, query: &str, limit: usize) -> ServiceResult<Vec<Vec<String>>> {
        self.log
            .record("query.fetch_sample", format!("{}, {}", query, limit))?;
        Ok(self.rows.iter().take(limit).cloned().collect())
    }
}

pub struct FakeRdbms {
    log: Arc<CallLog>,
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<String>>,
}

impl FakeRdbms {
    pub fn new(log: Arc<CallLog>, columns: Vec<ColumnInfo>, rows: Vec<Vec<String>>) -> Self {
        Self { log, columns, rows }
    }
}

impl RdbmsService for FakeRdbms {
    fn columns(
        &self,
        rdbms_type: &str,
        database: &str,
        table: &str,
    ) -> ServiceResult<Vec<ColumnInfo>> {
        self.log
            .record("rdbms.columns", format!("{}:{}.{}", rdbms_type, database, table))?;
        Ok(self.columns.clone())
    }

    fn sample_rows(
        &self,
        rdbms_type: &str,
        database: &str,
        table: &str,
        limit: usize,
    ) -> ServiceResult<Vec<Vec<String>>> {
        self.log.record(
            "rdbms.sample_rows",
            format!("{}:{}.{}, {}", rdbms_type, database, table, limit),
        )?;
        Ok(self.rows.iter().take(limit).cloned().collect())
    }
}

// ============================================================================
// Execution engine
// ============================================================================

/// Records statements and tasks. When linked to a [`FakeCatalog`], DDL
/// statements create and drop the objects they name.
pub struct FakeEngine {
    log: Arc<CallLog>,
    catalog: Option<Arc<FakeCatalog>>,
    statements: Mutex<Vec<String>>,
    tasks: Mutex<Vec<BatchTask>>,
    next_id: AtomicU64,
}

impl FakeEngine {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            catalog: None,
            statements: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn linked_to(mut self, catalog: Arc<FakeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn statements(&self) -> Vec<String> {
        lock(&self.statements).clone()
    }

    pub fn tasks(&self) -> Vec<BatchTask> {
        lock(&self.tasks).clone()
    }

    fn handle(&self, prefix: &str) -> TaskHandle {
        TaskHandle::new(format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn apply_ddl(&self, sql: &str) {
        let Some(catalog) = &self.catalog else {
            return;
        };
        let names = quoted_identifiers(sql);
        let upper = sql.trim_start().to_ascii_uppercase();
        if upper.starts_with("CREATE DATABASE") {
            if let Some(db) = names.first() {
                catalog.add_database(db);
            }
        } else if upper.starts_with("DROP DATABASE") {
            if let Some(db) = names.first() {
                catalog.drop_database(db);
            }
        } else if upper.starts_with("CREATE") && upper.contains(" TABLE ") {
            if let [db, table, ..] = names.as_slice() {
                catalog.add_table(db, table, TableMetadata::default());
            }
        } else if upper.starts_with("DROP TABLE") {
            if let [db, table, ..] = names.as_slice() {
                catalog.drop_table(db, table);
            }
        }
    }
}

/// Back-quoted identifiers in order of appearance.
fn quoted_identifiers(sql: &str) -> Vec<String> {
    sql.split('`')
        .skip(1)
        .step_by(2)
        .map(str::to_string)
        .collect()
}

impl ExecutionEngine for FakeEngine {
    fn execute_statement(&self, sql: &str) -> ServiceResult<TaskHandle> {
        self.log.record("engine.execute_statement", sql)?;
        lock(&self.statements).push(sql.to_string());
        self.apply_ddl(sql);
        Ok(self.handle("stmt"))
    }

    fn submit_batch_task(&self, task: &BatchTask) -> ServiceResult<TaskHandle> {
        self.log
            .record("engine.submit_batch_task", task.artifacts.join(","))?;
        lock(&self.tasks).push(task.clone());
        Ok(self.handle("task"))
    }
}
