//! Shared call log with failure injection.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use ingestor_protocol::{ServiceError, ServiceResult};

/// Every fake appends `service.method(args)` here before doing anything.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashSet<String>>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl CallLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later call to `operation` (e.g. `"index_server.index"`) fail.
    pub fn fail_on(&self, operation: &str) {
        lock(&self.failures).insert(operation.to_string());
    }

    pub fn clear_failure(&self, operation: &str) {
        lock(&self.failures).remove(operation);
    }

    /// Record a call and return the injected failure, if any.
    pub fn record(&self, operation: &str, args: impl AsRef<str>) -> ServiceResult<()> {
        lock(&self.calls).push(format!("{}({})", operation, args.as_ref()));
        if lock(&self.failures).contains(operation) {
            return Err(ServiceError::Failed(format!("injected failure in {}", operation)));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Calls whose operation is exactly `operation`.
    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{}(", operation);
        lock(&self.calls)
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .cloned()
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls_to(operation).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.calls).is_empty()
    }

    /// Calls that may change external state.
    pub fn mutations(&self) -> Vec<String> {
        const MUTATING: [&str; 7] = [
            "filesystem.mkdir",
            "filesystem.write_file",
            "index_server.create_index",
            "index_server.delete_index",
            "index_server.index",
            "engine.execute_statement",
            "engine.submit_batch_task",
        ];
        lock(&self.calls)
            .iter()
            .filter(|call| MUTATING.iter().any(|op| call.starts_with(&format!("{}(", op))))
            .cloned()
            .collect()
    }
}
