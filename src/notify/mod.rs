//! Transition notifications.

mod webhook;

pub use webhook::*;

use crate::config::MonitorTarget;
use crate::db::ProbeResult;

use async_trait::async_trait;
use thiserror::Error;

/// Notification error types.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("webhook transport error: {0}")]
    Transport(String),
    #[error("webhook rejected with status {0}")]
    Rejected(u16),
}

/// Delivers an up/down transition for a monitor.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: &MonitorTarget, result: &ProbeResult) -> Result<(), NotifyError>;
}
