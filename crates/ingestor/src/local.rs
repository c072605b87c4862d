//! Collaborators for running without a cluster: the local disk and a
//! registry backed by the `[cluster]` config section.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use ingestor_protocol::{
    ClusterConfig, ClusterRegistry, FileStat, Filesystem, ServiceError, ServiceResult,
};

fn io_error(path: &str, err: io::Error) -> ServiceError {
    match err.kind() {
        io::ErrorKind::NotFound => ServiceError::NotFound(path.to_string()),
        _ => ServiceError::Failed(format!("{}: {}", path, err)),
    }
}

/// [`Filesystem`] over `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn stat(&self, path: &str) -> ServiceResult<FileStat> {
        let meta = fs::metadata(path).map_err(|e| io_error(path, e))?;
        Ok(FileStat {
            size: meta.len(),
            is_dir: meta.is_dir(),
        })
    }

    fn open(&self, path: &str) -> ServiceResult<Box<dyn Read + Send>> {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        Ok(Box::new(file))
    }

    fn read(&self, path: &str, offset: u64, max_bytes: usize) -> ServiceResult<Vec<u8>> {
        let mut file = File::open(path).map_err(|e| io_error(path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| io_error(path, e))?;
        let mut buf = Vec::with_capacity(max_bytes.min(1 << 20));
        file.take(max_bytes as u64)
            .read_to_end(&mut buf)
            .map_err(|e| io_error(path, e))?;
        Ok(buf)
    }

    fn mkdir(&self, path: &str) -> ServiceResult<()> {
        fs::create_dir_all(path).map_err(|e| io_error(path, e))
    }

    fn write_file(&self, path: &str, data: &[u8]) -> ServiceResult<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ServiceError::NotFound(parent.display().to_string()));
            }
        }
        fs::write(path, data).map_err(|e| io_error(path, e))
    }
}

/// [`ClusterRegistry`] answering from configuration.
#[derive(Debug, Clone)]
pub struct StaticClusterRegistry {
    cluster: ClusterConfig,
}

impl StaticClusterRegistry {
    pub fn new(cluster: ClusterConfig) -> Self {
        Self { cluster }
    }

    fn configured(value: &Option<String>, key: &str) -> ServiceResult<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::NotFound(format!("[cluster] {} is not configured", key)))
    }
}

impl ClusterRegistry for StaticClusterRegistry {
    fn broker_list(&self) -> ServiceResult<String> {
        Self::configured(&self.cluster.brokers, "brokers")
    }

    fn kudu_master(&self) -> ServiceResult<String> {
        Self::configured(&self.cluster.kudu_master, "kudu_master")
    }

    fn topics(&self) -> ServiceResult<Vec<String>> {
        Ok(self.cluster.topics.clone())
    }
}
