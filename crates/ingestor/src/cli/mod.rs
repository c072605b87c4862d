//! CLI commands for the ingestor binary.
//!
//! Descriptors are passed as JSON, either inline or as `@path` to a file.

pub mod guess;
pub mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ingestor::{LocalFilesystem, StaticClusterRegistry};
use ingestor_protocol::paths::default_config_path;
use ingestor_protocol::{Collaborators, IngestConfig};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Load `--config`, or the default config when present.
pub fn load_config(path: Option<&Path>) -> Result<IngestConfig> {
    match path {
        Some(path) => IngestConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let default_path: PathBuf = default_config_path();
            debug!("Using config {}", default_path.display());
            Ok(IngestConfig::load_or_default(&default_path)?)
        }
    }
}

/// Collaborators available without a cluster.
pub fn local_collaborators(config: &IngestConfig) -> Collaborators {
    Collaborators::new()
        .with_filesystem(Arc::new(LocalFilesystem))
        .with_cluster_registry(Arc::new(StaticClusterRegistry::new(config.cluster.clone())))
}

/// Parse a JSON argument; `@path` reads the JSON from a file.
pub fn parse_json_arg<T: DeserializeOwned>(name: &str, value: &str) -> Result<T> {
    let text = match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read --{} from {}", name, path))?,
        None => value.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid --{} JSON", name))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
