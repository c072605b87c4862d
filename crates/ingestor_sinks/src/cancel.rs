//! Cancelling a run between sink preparation and submission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ingestor_protocol::{IngestError, IngestResult};

/// Shared flag a caller sets to stop a pipeline run.
///
/// The run looks at it once, after its sink resources exist and before the
/// job is handed over. A cancelled run deletes the resources it created.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// `Cancelled` naming the step that was skipped, once cancelled.
    pub fn check(&self, skipped: &str) -> IngestResult<()> {
        if self.is_cancelled() {
            return Err(IngestError::Cancelled(format!("run cancelled before {}", skipped)));
        }
        Ok(())
    }
}
