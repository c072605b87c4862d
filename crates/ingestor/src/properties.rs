//! Cluster properties a document needs beyond its descriptors.

use ingestor_protocol::services::{CLUSTER_REGISTRY, INDEX_SERVER};
use ingestor_protocol::{
    ClusterConfig, Collaborators, IngestResult, ServiceContext, ServiceError, SinkKind, SourceKind,
};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterProperties {
    pub brokers: Option<String>,
    pub kudu_master: Option<String>,
    pub index_endpoint: Option<String>,
}

impl ClusterProperties {
    /// Values fixed by configuration; they win over collaborator lookups.
    pub fn from_config(cluster: &ClusterConfig) -> Self {
        Self {
            brokers: non_empty(cluster.brokers.clone()),
            kudu_master: non_empty(cluster.kudu_master.clone()),
            index_endpoint: non_empty(cluster.index_endpoint.clone()),
        }
    }

    /// Look up whatever the source/sink pair needs and `self` does not
    /// already hold. A value the registry cannot produce is an external
    /// service error.
    pub fn resolve(
        &self,
        collaborators: &Collaborators,
        source: SourceKind,
        sink: SinkKind,
    ) -> IngestResult<Self> {
        let mut resolved = self.clone();
        if source == SourceKind::Kafka && resolved.brokers.is_none() {
            let brokers = collaborators
                .cluster_registry()?
                .broker_list()
                .and_then(|value| present(value, "broker list"))
                .service(CLUSTER_REGISTRY)?;
            debug!("Resolved brokers {}", brokers);
            resolved.brokers = Some(brokers);
        }
        if sink == SinkKind::Table && resolved.kudu_master.is_none() {
            let master = collaborators
                .cluster_registry()?
                .kudu_master()
                .and_then(|value| present(value, "kudu master"))
                .service(CLUSTER_REGISTRY)?;
            debug!("Resolved kudu master {}", master);
            resolved.kudu_master = Some(master);
        }
        if sink == SinkKind::Index && resolved.index_endpoint.is_none() {
            let endpoint = collaborators
                .index_server()?
                .endpoint()
                .and_then(|value| present(value, "index endpoint"))
                .service(INDEX_SERVER)?;
            resolved.index_endpoint = Some(endpoint);
        }
        Ok(resolved)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn present(value: String, what: &str) -> Result<String, ServiceError> {
    if value.trim().is_empty() {
        Err(ServiceError::NotFound(what.to_string()))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestor_protocol::IngestError;
    use ingestor_test_utils::{FakeCluster, StaticCluster};

    #[test]
    fn test_only_needed_values_are_looked_up() {
        let cluster = FakeCluster::new();
        let props = ClusterProperties::default()
            .resolve(&cluster.collaborators(), SourceKind::File, SinkKind::File)
            .unwrap();
        assert_eq!(props, ClusterProperties::default());
        assert!(cluster.log.is_empty());
    }

    #[test]
    fn test_kafka_to_table() {
        let cluster = FakeCluster::new();
        let props = ClusterProperties::default()
            .resolve(&cluster.collaborators(), SourceKind::Kafka, SinkKind::Table)
            .unwrap();
        assert!(props.brokers.is_some());
        assert!(props.kudu_master.is_some());
        assert_eq!(
            cluster.log.calls(),
            vec!["cluster.broker_list()", "cluster.kudu_master()"]
        );
    }

    #[test]
    fn test_configured_values_skip_lookup() {
        let cluster = FakeCluster::new();
        let config = ClusterConfig {
            kudu_master: Some("km:7051".to_string()),
            ..Default::default()
        };
        let props = ClusterProperties::from_config(&config)
            .resolve(&cluster.collaborators(), SourceKind::Crm, SinkKind::Table)
            .unwrap();
        assert_eq!(props.kudu_master.as_deref(), Some("km:7051"));
        assert!(cluster.log.is_empty());
    }

    #[test]
    fn test_missing_kudu_master_is_external() {
        let cluster = FakeCluster::with_registry(|log| StaticCluster::new(log).without_kudu());
        let err = ClusterProperties::default()
            .resolve(&cluster.collaborators(), SourceKind::Crm, SinkKind::Table)
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::ExternalService { service: "cluster registry", .. }
        ));
    }
}
