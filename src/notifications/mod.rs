//! # Notifications
//!
//! Delivery of newly created suggestions to operators. Delivery is
//! best-effort: a failure is logged and never reaches the cycle.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::suggestions::Suggestion;

pub mod webhook;

pub use webhook::WebhookNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid notification target: {0}")]
    InvalidTarget(String),
    #[error("failed to build notification client: {0}")]
    Client(String),
    #[error("notification not delivered after {attempts} attempts: {reason}")]
    Delivery { attempts: u32, reason: String },
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, suggestions: &[Suggestion]) -> Result<(), NotifyError>;
}

/// Used when no notification target is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, suggestions: &[Suggestion]) -> Result<(), NotifyError> {
        debug!(count = suggestions.len(), "No notifier configured; skipping");
        Ok(())
    }
}

/// Notify and swallow any failure. Empty batches are not sent.
pub async fn notify_best_effort(sink: &dyn NotificationSink, suggestions: &[Suggestion]) {
    if suggestions.is_empty() {
        return;
    }
    if let Err(err) = sink.notify(suggestions).await {
        warn!(error = %err, count = suggestions.len(), "Suggestion notification failed");
    }
}
