//! # Ad Platform
//!
//! Capability interface to the external ad platform: asynchronous insight
//! report runs and budget updates.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::PlatformError;
use crate::insights::ReportGrain;
use crate::models::TargetType;

pub mod graph;

pub use graph::GraphApiClient;

/// Identifier of an asynchronous report run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportRunId(pub String);

impl fmt::Display for ReportRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportRunStatus {
    Running { percent: u8 },
    Completed,
    Failed { reason: String },
}

/// An ad set or campaign as the platform reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntity {
    pub id: String,
    pub entity_type: TargetType,
    pub campaign_id: Option<String>,
    pub name: String,
    /// `None` when the entity runs on a lifetime or parent budget
    pub daily_budget: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub active: bool,
}

#[async_trait]
pub trait AdPlatformClient: Send + Sync {
    /// Ad sets and campaigns of an account.
    async fn list_entities(&self, account_id: &str) -> Result<Vec<PlatformEntity>, PlatformError>;

    /// Kick off an asynchronous ad-set level insights report.
    async fn start_insights_report(
        &self,
        account_id: &str,
        grain: ReportGrain,
    ) -> Result<ReportRunId, PlatformError>;

    async fn report_run_status(&self, run: &ReportRunId) -> Result<ReportRunStatus, PlatformError>;

    /// Location of the finished report file.
    async fn report_download_url(&self, run: &ReportRunId) -> Result<Url, PlatformError>;

    /// Set a new daily budget on an ad set or campaign.
    async fn update_budget(
        &self,
        target_type: TargetType,
        entity_id: &str,
        new_budget: f64,
    ) -> Result<(), PlatformError>;
}

/// Poll a report run until it completes, waiting `poll_interval` between polls.
///
/// A run still in progress after `max_attempts` polls yields
/// [`PlatformError::ReportTimedOut`], which callers may retry later.
pub async fn wait_for_report(
    client: &dyn AdPlatformClient,
    run: &ReportRunId,
    poll_interval: Duration,
    max_attempts: u32,
) -> Result<(), PlatformError> {
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        tokio::time::sleep(poll_interval).await;

        match client.report_run_status(run).await? {
            ReportRunStatus::Completed => {
                debug!(run_id = %run, attempt, "Report run completed");
                return Ok(());
            }
            ReportRunStatus::Failed { reason } => {
                warn!(run_id = %run, reason = %reason, "Report run failed");
                return Err(PlatformError::ReportFailed {
                    run_id: run.0.clone(),
                    reason,
                });
            }
            ReportRunStatus::Running { percent } => {
                debug!(run_id = %run, attempt, percent, "Report run in progress");
            }
        }
    }

    Err(PlatformError::ReportTimedOut {
        run_id: run.0.clone(),
        attempts: max_attempts,
    })
}
