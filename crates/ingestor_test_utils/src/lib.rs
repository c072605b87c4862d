//! Ingestor test utilities
//!
//! In-memory fakes for every collaborator trait. All fakes share one
//! [`CallLog`], so a test can assert the exact sequence of external calls,
//! or that none happened.
//!
//! ```rust,ignore
//! let cluster = FakeCluster::new();
//! cluster.filesystem.put("/x.csv", "id,name\n1,a\n");
//! let pipeline = Pipeline::new(cluster.collaborators(), IngestConfig::default());
//! pipeline.run(&source, &sink)?;
//! assert_eq!(cluster.log.count("index_server.create_index"), 1);
//! ```

pub mod fakes;
pub mod log;

use std::sync::Arc;

use ingestor_protocol::Collaborators;

pub use fakes::{
    FakeCatalog, FakeCrm, FakeEngine, FakeIndexServer, FakeQueryService, FakeRdbms,
    MemoryFilesystem, StaticCluster,
};
pub use log::CallLog;

/// One of each fake, wired to a shared log.
pub struct FakeCluster {
    pub log: Arc<CallLog>,
    pub filesystem: Arc<MemoryFilesystem>,
    pub catalog: Arc<FakeCatalog>,
    pub index_server: Arc<FakeIndexServer>,
    pub cluster: Arc<StaticCluster>,
    pub crm: Arc<FakeCrm>,
    pub engine: Arc<FakeEngine>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::with_registry(StaticCluster::new)
    }

    /// Same as [`FakeCluster::new`] with a customised registry.
    pub fn with_registry(build: impl FnOnce(Arc<CallLog>) -> StaticCluster) -> Self {
        let log = CallLog::new();
        let catalog = Arc::new(FakeCatalog::new(log.clone()));
        Self {
            filesystem: Arc::new(MemoryFilesystem::new(log.clone())),
            index_server: Arc::new(FakeIndexServer::new(log.clone())),
            cluster: Arc::new(build(log.clone())),
            crm: Arc::new(FakeCrm::new(log.clone())),
            engine: Arc::new(FakeEngine::new(log.clone()).linked_to(catalog.clone())),
            catalog,
            log,
        }
    }

    /// Bundle with every fake installed.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new()
            .with_filesystem(self.filesystem.clone())
            .with_catalog(self.catalog.clone())
            .with_index_server(self.index_server.clone())
            .with_cluster_registry(self.cluster.clone())
            .with_crm(self.crm.clone())
            .with_execution_engine(self.engine.clone())
    }
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestor_protocol::{ExecutionEngine, IndexServer, ServiceError};

    #[test]
    fn test_log_records_in_order() {
        let cluster = FakeCluster::new();
        cluster.index_server.exists("a").unwrap();
        cluster.engine.execute_statement("SELECT 1").unwrap();
        assert_eq!(
            cluster.log.calls(),
            vec!["index_server.exists(a)", "engine.execute_statement(SELECT 1)"]
        );
        assert_eq!(cluster.log.mutations(), vec!["engine.execute_statement(SELECT 1)"]);
    }

    #[test]
    fn test_failure_injection() {
        let cluster = FakeCluster::new();
        cluster.log.fail_on("index_server.exists");
        let err = cluster.index_server.exists("a").unwrap_err();
        assert!(matches!(err, ServiceError::Failed(_)));
        cluster.log.clear_failure("index_server.exists");
        assert!(!cluster.index_server.exists("a").unwrap());
    }

    #[test]
    fn test_engine_applies_ddl_to_catalog() {
        let cluster = FakeCluster::new();
        cluster
            .engine
            .execute_statement("CREATE DATABASE IF NOT EXISTS `sales`")
            .unwrap();
        cluster
            .engine
            .execute_statement("CREATE TABLE `sales`.`orders` (`id` BIGINT)")
            .unwrap();
        assert!(cluster.catalog.has_database("sales"));
        assert!(cluster.catalog.has_table("sales", "orders"));

        cluster
            .engine
            .execute_statement("DROP TABLE IF EXISTS `sales`.`orders`")
            .unwrap();
        assert!(!cluster.catalog.has_table("sales", "orders"));
    }
}
