//! Configuration for the ingestor
//!
//! Every field has a default, so a missing file or a missing section is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::defaults::{
    DEFAULT_APP_NAME, DEFAULT_ARTIFACT_NAME, DEFAULT_BATCH_MILLISECONDS, DEFAULT_ENGINE_LIB_PATH,
    DEFAULT_EXECUTORS, DEFAULT_EXECUTOR_CORES, DEFAULT_EXECUTOR_MEMORY, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_WORKSPACE_ROOT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {message}")]
    Parse { path: String, message: String },
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// Skeleton sizing of every rendered document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_batch_milliseconds")]
    pub batch_milliseconds: u64,
    #[serde(default = "default_executors")]
    pub executors: u32,
    #[serde(default = "default_executor_cores")]
    pub executor_cores: u32,
    #[serde(default = "default_executor_memory")]
    pub executor_memory: String,
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_batch_milliseconds() -> u64 {
    DEFAULT_BATCH_MILLISECONDS
}

fn default_executors() -> u32 {
    DEFAULT_EXECUTORS
}

fn default_executor_cores() -> u32 {
    DEFAULT_EXECUTOR_CORES
}

fn default_executor_memory() -> String {
    DEFAULT_EXECUTOR_MEMORY.to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            batch_milliseconds: default_batch_milliseconds(),
            executors: default_executors(),
            executor_cores: default_executor_cores(),
            executor_memory: default_executor_memory(),
        }
    }
}

/// Where staged artifacts go and how large a direct upload may be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionConfig {
    #[serde(default = "default_workspace_root")]
    pub workspace_root: String,
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,
    #[serde(default = "default_engine_lib_path")]
    pub engine_lib_path: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_workspace_root() -> String {
    DEFAULT_WORKSPACE_ROOT.to_string()
}

fn default_artifact_name() -> String {
    DEFAULT_ARTIFACT_NAME.to_string()
}

fn default_engine_lib_path() -> String {
    DEFAULT_ENGINE_LIB_PATH.to_string()
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            artifact_name: default_artifact_name(),
            engine_lib_path: default_engine_lib_path(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl SubmissionConfig {
    /// Directory owned by one staged run: `<workspace_root>/<target>-<run_id>`.
    ///
    /// Characters outside `[A-Za-z0-9_.-]` in the target name become `_`.
    pub fn run_dir(&self, target: &str, run_id: &str) -> String {
        let target: String = target
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "{}/{}-{}",
            self.workspace_root.trim_end_matches('/'),
            target,
            run_id
        )
    }

    /// Full path of the staged artifact inside a run directory.
    pub fn artifact_path(&self, run_dir: &str) -> String {
        format!("{}/{}", run_dir.trim_end_matches('/'), self.artifact_name)
    }
}

/// Static cluster endpoints, for running without a live registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClusterConfig {
    #[serde(default)]
    pub brokers: Option<String>,
    #[serde(default)]
    pub kudu_master: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Index server base URL written into index output blocks.
    #[serde(default)]
    pub index_endpoint: Option<String>,
}

impl IngestConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.application.name, "Data Ingest");
        assert_eq!(config.application.batch_milliseconds, 5000);
        assert_eq!(config.application.executor_memory, "1G");
        let run_dir = config.submission.run_dir("traffic", "r1");
        assert_eq!(run_dir, "/user/ingestor/workspace/traffic-r1");
        assert_eq!(
            config.submission.artifact_path(&run_dir),
            "/user/ingestor/workspace/traffic-r1/pipeline.conf"
        );
        assert!(config.cluster.kudu_master.is_none());
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let parsed: IngestConfig = toml::from_str(
            r#"
            [application]
            executors = 4

            [cluster]
            kudu_master = "km:7051"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.application.executors, 4);
        assert_eq!(parsed.application.executor_cores, 1);
        assert_eq!(parsed.cluster.kudu_master.as_deref(), Some("km:7051"));
        assert_eq!(parsed.submission.max_upload_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = IngestConfig::default();
        config.submission.workspace_root = "/tmp/ws/".to_string();
        config.cluster.brokers = Some("b1:9092,b2:9092".to_string());
        config.save(&path).unwrap();

        let loaded = IngestConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.submission.run_dir("t", "1"), "/tmp/ws/t-1");
    }

    #[test]
    fn test_run_dir_sanitizes_target() {
        let submission = SubmissionConfig::default();
        assert_eq!(
            submission.run_dir(" sales.orders/../x y ", "ab"),
            "/user/ingestor/workspace/sales.orders_.._x_y-ab"
        );
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = IngestConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, IngestConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[application\nname = 1").unwrap();
        assert!(matches!(
            IngestConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
