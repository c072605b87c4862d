//! Canonical default values shared by assembly, preparation and submission.

pub const DEFAULT_APP_NAME: &str = "Data Ingest";
pub const DEFAULT_BATCH_MILLISECONDS: u64 = 5000;
pub const DEFAULT_EXECUTORS: u32 = 1;
pub const DEFAULT_EXECUTOR_CORES: u32 = 1;
pub const DEFAULT_EXECUTOR_MEMORY: &str = "1G";

/// Streaming window applied to every Kafka input block.
pub const KAFKA_WINDOW_MILLISECONDS: u64 = 60_000;

/// Name of the synthesised row identifier when a sink declares no key.
pub const GENERATED_UNIQUE_KEY: &str = "hue_id";
pub const DEFAULT_SPLIT_SEPARATOR: &str = ",";

pub const FORMAT_SNIFF_BYTES: usize = 10_000;
pub const FIELD_SAMPLE_BYTES: usize = 64 * 1024;
pub const MAX_SAMPLE_ROWS: usize = 4;

pub const DEFAULT_WORKSPACE_ROOT: &str = "/user/ingestor/workspace";
pub const DEFAULT_ARTIFACT_NAME: &str = "pipeline.conf";
pub const DEFAULT_ENGINE_LIB_PATH: &str = "/tmp/envelope-0.5.0.jar";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

pub const COLLECTIONS_PUB_SUB_TOPIC: &str = "assist.collections.refresh";
pub const KUDU_TABLE_PREFIX: &str = "impala::";
