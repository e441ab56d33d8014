//! Persists check results.

use crate::db::{ProbeResult, RecordStore};

use std::sync::Arc;

/// Appends each check result to the record store.
///
/// Storage failures are logged and swallowed; the result for that check is
/// lost and the cycle carries on.
#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn RecordStore>,
}

impl Recorder {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn record(&self, result: &ProbeResult) {
        if let Err(e) = self.store.append(result) {
            tracing::error!("Failed to record result for {}: {}", result.target_name, e);
        }
    }
}
