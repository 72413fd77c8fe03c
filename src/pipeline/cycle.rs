//! # Sync Cycle
//!
//! One full pass over the active accounts: insight sync, then analysis. An
//! account whose sync fails is still analyzed on the data already stored.

use std::sync::Arc;

use chrono::Utc;
use metrics::histogram;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, instrument};

use super::{AnalysisReport, SkipCounts, SuggestionPipeline};
use crate::insights::InsightSync;
use crate::notifications::{NotificationSink, notify_best_effort};
use crate::repositories::AdAccountStore;
use crate::suggestions::Suggestion;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleError {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub message: String,
}

/// Outcome of a cycle. The cycle always completes; failures are listed here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub success: bool,
    pub accounts: u64,
    pub records_saved: u64,
    pub parse_errors: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped: SkipCounts,
    pub duplicates_deleted: u64,
    pub errors: Vec<CycleError>,
}

impl CycleReport {
    fn absorb(&mut self, analysis: AnalysisReport, new_suggestions: &mut Vec<Suggestion>) {
        self.created += analysis.created.len() as u64;
        self.updated += analysis.updated;
        self.skipped.merge(&analysis.skipped);
        self.duplicates_deleted += analysis.duplicates_deleted;
        self.errors
            .extend(analysis.errors.into_iter().map(|failure| CycleError {
                account_id: analysis.account_id.clone(),
                entity_id: Some(failure.entity_id),
                message: failure.message,
            }));
        new_suggestions.extend(analysis.created);
    }

    fn account_error(&mut self, account_id: &str, message: String) {
        self.errors.push(CycleError {
            account_id: account_id.to_string(),
            entity_id: None,
            message,
        });
    }
}

pub struct SyncCycle {
    accounts: Arc<dyn AdAccountStore>,
    sync: InsightSync,
    pipeline: SuggestionPipeline,
    notifier: Arc<dyn NotificationSink>,
}

impl SyncCycle {
    pub fn new(
        accounts: Arc<dyn AdAccountStore>,
        sync: InsightSync,
        pipeline: SuggestionPipeline,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            accounts,
            sync,
            pipeline,
            notifier,
        }
    }

    pub fn insight_sync(&self) -> &InsightSync {
        &self.sync
    }

    pub fn pipeline(&self) -> &SuggestionPipeline {
        &self.pipeline
    }

    #[instrument(skip_all)]
    pub async fn run_once(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();
        let mut new_suggestions = Vec::new();

        let accounts = match self.accounts.list_active().await {
            Ok(accounts) => accounts,
            Err(err) => {
                error!(error = %err, "Failed to load active accounts");
                report.account_error("*", err.to_string());
                return report;
            }
        };
        report.accounts = accounts.len() as u64;

        for account in &accounts {
            match self.sync.sync_account(&account.id).await {
                Ok(summary) => {
                    report.records_saved += summary.saved;
                    report.parse_errors += summary.parse_errors;
                }
                Err(err) => {
                    error!(account_id = %account.id, error = %err, "Insight sync failed");
                    report.account_error(&account.id, format!("sync failed: {err}"));
                }
            }

            match self.pipeline.analyze_account(&account.id, Utc::now()).await {
                Ok(analysis) => report.absorb(analysis, &mut new_suggestions),
                Err(err) => {
                    error!(account_id = %account.id, error = %err, "Analysis failed");
                    report.account_error(&account.id, format!("analysis failed: {err}"));
                }
            }
        }

        notify_best_effort(self.notifier.as_ref(), &new_suggestions).await;

        report.success = report.errors.is_empty();
        histogram!("sync_cycle_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
        info!(
            success = report.success,
            accounts = report.accounts,
            records_saved = report.records_saved,
            created = report.created,
            updated = report.updated,
            errors = report.errors.len(),
            "Sync cycle completed"
        );
        report
    }
}
