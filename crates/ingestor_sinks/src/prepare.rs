//! Sink preparation.
//!
//! `ensure_*` creates a sink resource unless it already exists; the existence
//! check is the idempotency boundary. Anything created here is recorded in a
//! [`Prepared`] so that [`SinkPreparer::finish_with_guard`] can delete it
//! again if the run is cancelled or submission fails.
//!
//! Concurrent runs targeting the same new name are not synchronised: the
//! loser of the race gets the collaborator's duplicate-create error.

use ingestor_protocol::services::{CATALOG, EXECUTION_ENGINE, INDEX_SERVER};
use ingestor_protocol::{Collaborators, IndexSpec, IngestResult, ServiceContext, TaskHandle};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::ddl::{DatabaseDdl, TableDdl};

/// A resource this run created and must delete on rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedResource {
    Collection(String),
    Table { drop_statement: String, name: String },
    Database { drop_statement: String, name: String },
}

impl CreatedResource {
    pub fn describe(&self) -> String {
        match self {
            CreatedResource::Collection(name) => format!("collection {}", name),
            CreatedResource::Table { name, .. } => format!("table {}", name),
            CreatedResource::Database { name, .. } => format!("database {}", name),
        }
    }
}

/// Resources created so far, plus the statement handle of the last DDL run.
#[derive(Debug, Default)]
pub struct Prepared {
    created: Vec<CreatedResource>,
    last_task: Option<TaskHandle>,
}

impl Prepared {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> &[CreatedResource] {
        &self.created
    }

    pub fn last_task(&self) -> Option<&TaskHandle> {
        self.last_task.as_ref()
    }

    fn record(&mut self, resource: CreatedResource, task: Option<TaskHandle>) {
        self.created.push(resource);
        if task.is_some() {
            self.last_task = task;
        }
    }
}

pub struct SinkPreparer {
    collaborators: Collaborators,
}

impl SinkPreparer {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Create the search collection unless it exists. Returns whether it was
    /// created.
    pub fn ensure_collection(&self, spec: &IndexSpec, prepared: &mut Prepared) -> IngestResult<bool> {
        let server = self.collaborators.index_server()?;
        if server.exists(&spec.name).service(INDEX_SERVER)? {
            debug!("Collection {} already exists", spec.name);
            return Ok(false);
        }
        info!(
            "Creating collection {} ({} fields, unique key {}, {} shards x {})",
            spec.name,
            spec.fields.len(),
            spec.unique_key,
            spec.shards,
            spec.replication
        );
        server.create_index(spec).service(INDEX_SERVER)?;
        prepared.record(CreatedResource::Collection(spec.name.clone()), None);
        Ok(true)
    }

    /// Create the table unless the catalog already knows it.
    pub fn ensure_table(&self, table: &TableDdl, prepared: &mut Prepared) -> IngestResult<bool> {
        let catalog = self.collaborators.catalog()?;
        match catalog.get_table(&table.database, &table.name) {
            Ok(_) => {
                debug!("Table {}.{} already exists", table.database, table.name);
                return Ok(false);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err).service(CATALOG),
        }
        let sql = table.render()?;
        let engine = self.collaborators.execution_engine()?;
        info!("Creating table {}.{}", table.database, table.name);
        let task = engine.execute_statement(&sql).service(EXECUTION_ENGINE)?;
        prepared.record(
            CreatedResource::Table {
                drop_statement: table.render_drop(),
                name: format!("{}.{}", table.database, table.name),
            },
            Some(task),
        );
        Ok(true)
    }

    /// Create the database unless the catalog already knows it.
    pub fn ensure_database(&self, database: &DatabaseDdl, prepared: &mut Prepared) -> IngestResult<bool> {
        let catalog = self.collaborators.catalog()?;
        match catalog.get_database(&database.name) {
            Ok(_) => {
                debug!("Database {} already exists", database.name);
                return Ok(false);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err).service(CATALOG),
        }
        let engine = self.collaborators.execution_engine()?;
        info!("Creating database {}", database.name);
        let task = engine
            .execute_statement(&database.render())
            .service(EXECUTION_ENGINE)?;
        prepared.record(
            CreatedResource::Database {
                drop_statement: database.render_drop(),
                name: database.name.clone(),
            },
            Some(task),
        );
        Ok(true)
    }

    /// Best-effort delete of everything in `prepared`, newest first.
    /// Failures are logged and never returned.
    pub fn rollback(&self, prepared: &Prepared) {
        for resource in prepared.created.iter().rev() {
            let result = match resource {
                CreatedResource::Collection(name) => self
                    .collaborators
                    .index_server()
                    .and_then(|server| server.delete_index(name).service(INDEX_SERVER)),
                CreatedResource::Table { drop_statement, .. }
                | CreatedResource::Database { drop_statement, .. } => self
                    .collaborators
                    .execution_engine()
                    .and_then(|engine| {
                        engine
                            .execute_statement(drop_statement)
                            .map(|_| ())
                            .service(EXECUTION_ENGINE)
                    }),
            };
            match result {
                Ok(()) => info!("Rolled back {}", resource.describe()),
                Err(err) => warn!(
                    "Error while cleaning up {} after a failed run: {}",
                    resource.describe(),
                    err
                ),
            }
        }
    }

    /// Run `submit` unless the run was cancelled; roll back created resources
    /// if it was, or if `submit` fails. The original error is returned.
    pub fn finish_with_guard<T>(
        &self,
        prepared: &Prepared,
        cancel: &CancellationToken,
        submit: impl FnOnce() -> IngestResult<T>,
    ) -> IngestResult<T> {
        if let Err(err) = cancel.check("submission") {
            warn!("Run cancelled after sink preparation; rolling back");
            self.rollback(prepared);
            return Err(err);
        }
        match submit() {
            Ok(value) => Ok(value),
            Err(err) => {
                if !prepared.created.is_empty() {
                    warn!("Submission failed, rolling back: {}", err);
                    self.rollback(prepared);
                }
                Err(err)
            }
        }
    }
}
