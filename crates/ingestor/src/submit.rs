//! Submission adapter.
//!
//! Small index loads go straight to the index server; everything else is
//! staged as an artifact in the shared workspace and handed to the execution
//! engine as a batch task. Neither path waits for the job to finish.

use ingestor_protocol::defaults::COLLECTIONS_PUB_SUB_TOPIC;
use ingestor_protocol::services::{EXECUTION_ENGINE, FILESYSTEM, INDEX_SERVER};
use ingestor_protocol::{
    BatchTask, Collaborators, IngestError, IngestResult, JobHandle, ServiceContext,
    SubmissionConfig,
};
use ingestor_schema::{with_tolerant_processor, SinkOptions};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::templates::ConfigDocument;

pub fn index_success_url(collection: &str) -> String {
    format!("/indexer/indexes/{}", collection)
}

pub fn database_success_url(database: &str) -> String {
    format!("/metastore/tables/{}", database)
}

/// Handle returned for an index sink, before any task id is attached.
pub fn index_handle(collection: &str) -> JobHandle {
    JobHandle::success()
        .with_success_url(index_success_url(collection))
        .with_pub_sub(COLLECTIONS_PUB_SUB_TOPIC)
}

pub struct Submitter {
    collaborators: Collaborators,
    config: SubmissionConfig,
}

impl Submitter {
    pub fn new(collaborators: Collaborators, config: SubmissionConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Size of `path`, or a validation error when it cannot be uploaded
    /// directly.
    pub fn check_upload(&self, path: &str) -> IngestResult<u64> {
        let stat = self.collaborators.filesystem()?.stat(path).service(FILESYSTEM)?;
        if stat.is_dir {
            return Err(IngestError::validation(
                "path",
                format!("Path {} is not a file", path),
            ));
        }
        if stat.size > self.config.max_upload_bytes {
            return Err(IngestError::validation(
                "path",
                format!(
                    "{} is {} bytes, over the {} byte direct upload limit",
                    path, stat.size, self.config.max_upload_bytes
                ),
            ));
        }
        Ok(stat.size)
    }

    /// Post a file to the index server. Rejected records come back in
    /// `errors`; they do not fail the call. Servers with the tolerant update
    /// processor get it requested so one bad record cannot abort the load.
    pub fn ingest_direct(
        &self,
        path: &str,
        size: u64,
        collection: &str,
        options: &SinkOptions,
    ) -> IngestResult<JobHandle> {
        let max_bytes = usize::try_from(size).map_err(|_| {
            IngestError::validation("path", format!("{} is too large to read", path))
        })?;
        let data = self
            .collaborators
            .filesystem()?
            .read(path, 0, max_bytes)
            .service(FILESYSTEM)?;
        let index_server = self.collaborators.index_server()?;
        let options = if index_server.supports_tolerant_processor().service(INDEX_SERVER)? {
            with_tolerant_processor(options.clone())
        } else {
            debug!("Index server has no tolerant processor; bad records fail the load");
            options.clone()
        };
        info!("Indexing {} bytes of {} into {}", data.len(), path, collection);
        let response = index_server
            .index(collection, &data, &options)
            .service(INDEX_SERVER)?;
        if !response.errors.is_empty() {
            warn!(
                "{} record(s) rejected while indexing into {}",
                response.errors.len(),
                collection
            );
        }
        Ok(index_handle(collection).with_errors(response.errors))
    }

    /// Write the document to a run directory of its own and submit a batch
    /// task that runs it. Returns as soon as the task is accepted.
    pub fn stage(
        &self,
        document: &ConfigDocument,
        target: &str,
        task_name: &str,
        lib_path: &str,
    ) -> IngestResult<JobHandle> {
        let filesystem = self.collaborators.filesystem()?;
        let engine = self.collaborators.execution_engine()?;

        let run_id = Uuid::new_v4().simple().to_string();
        let run_dir = self.config.run_dir(target, &run_id[..12]);
        let artifact = self.config.artifact_path(&run_dir);
        filesystem.mkdir(&run_dir).service(FILESYSTEM)?;
        filesystem
            .write_file(&artifact, document.as_str().as_bytes())
            .service(FILESYSTEM)?;

        let task = BatchTask {
            name: task_name.to_string(),
            artifacts: vec![artifact.clone()],
            arguments: vec![self.config.artifact_name.clone()],
            lib_path: lib_path.to_string(),
        };
        let handle = engine.submit_batch_task(&task).service(EXECUTION_ENGINE)?;
        info!("Submitted task {} for {} ({})", handle.id, task_name, artifact);
        Ok(JobHandle::success().with_task(handle.id))
    }
}
