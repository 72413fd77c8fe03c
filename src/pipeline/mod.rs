//! # Suggestion Pipeline
//!
//! Walks an account's scalable entities and drives each through the same
//! sequence: threshold config, scale-timing gate, metric aggregation,
//! threshold analysis, then create or refresh its pending suggestion. A
//! failing entity is recorded and the walk continues.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::analysis::{aggregate, analyze, scale_window};
use crate::error::PipelineError;
use crate::insights::MetricValues;
use crate::models::ad_entity::Model as AdEntityModel;
use crate::models::{TargetType, ThresholdConfig};
use crate::repositories::{
    AdEntityStore, PerformanceRecordStore, SuggestionStore, ThresholdConfigStore,
};
use crate::suggestions::{
    ScaleProposal, Suggestion, create_suggestion, plan_dedup, update_pending_suggestion,
};

pub mod cycle;

pub use cycle::{CycleError, CycleReport, SyncCycle};

/// Where an entity's pass through the pipeline ended.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityOutcome {
    SkippedNoConfig,
    SkippedTiming,
    SkippedNoData,
    SkippedNotQualifying,
    Created(Suggestion),
    Updated {
        suggestion: Suggestion,
        duplicates_deleted: u64,
    },
}

/// Entities that stopped before producing a suggestion, per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub no_config: u64,
    pub timing: u64,
    pub no_data: u64,
    pub not_qualifying: u64,
}

impl SkipCounts {
    pub fn total(&self) -> u64 {
        self.no_config + self.timing + self.no_data + self.not_qualifying
    }

    pub fn merge(&mut self, other: &SkipCounts) {
        self.no_config += other.no_config;
        self.timing += other.timing;
        self.no_data += other.no_data;
        self.not_qualifying += other.not_qualifying;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFailure {
    pub entity_id: String,
    pub message: String,
}

/// Result of analyzing one account.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub account_id: String,
    pub entities: u64,
    pub created: Vec<Suggestion>,
    pub updated: u64,
    pub skipped: SkipCounts,
    pub duplicates_deleted: u64,
    pub errors: Vec<EntityFailure>,
}

impl AnalysisReport {
    fn record(&mut self, outcome: EntityOutcome) {
        match outcome {
            EntityOutcome::SkippedNoConfig => self.skipped.no_config += 1,
            EntityOutcome::SkippedTiming => self.skipped.timing += 1,
            EntityOutcome::SkippedNoData => self.skipped.no_data += 1,
            EntityOutcome::SkippedNotQualifying => self.skipped.not_qualifying += 1,
            EntityOutcome::Created(suggestion) => self.created.push(suggestion),
            EntityOutcome::Updated {
                duplicates_deleted, ..
            } => {
                self.updated += 1;
                self.duplicates_deleted += duplicates_deleted;
            }
        }
    }
}

pub struct SuggestionPipeline {
    thresholds: Arc<dyn ThresholdConfigStore>,
    entities: Arc<dyn AdEntityStore>,
    records: Arc<dyn PerformanceRecordStore>,
    suggestions: Arc<dyn SuggestionStore>,
}

impl SuggestionPipeline {
    pub fn new(
        thresholds: Arc<dyn ThresholdConfigStore>,
        entities: Arc<dyn AdEntityStore>,
        records: Arc<dyn PerformanceRecordStore>,
        suggestions: Arc<dyn SuggestionStore>,
    ) -> Self {
        Self {
            thresholds,
            entities,
            records,
            suggestions,
        }
    }

    /// Analyze every scalable entity of an account.
    ///
    /// Fails only when the entity list or threshold config cannot be read;
    /// per-entity failures land in [`AnalysisReport::errors`].
    #[instrument(skip(self, now), fields(account_id = %account_id))]
    pub async fn analyze_account(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport, PipelineError> {
        let entities = self.entities.list_scalable(account_id).await?;
        let config = self
            .thresholds
            .find_by_account(account_id)
            .await?
            .filter(ThresholdConfig::has_any_threshold);

        let mut report = AnalysisReport {
            account_id: account_id.to_string(),
            entities: entities.len() as u64,
            ..Default::default()
        };

        let Some(config) = config else {
            debug!(entities = entities.len(), "No thresholds configured; skipping account");
            report.skipped.no_config = report.entities;
            return Ok(report);
        };

        for entity in &entities {
            match self.process_entity(entity, &config, now).await {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    error!(entity_id = %entity.id, error = %err, "Entity analysis failed");
                    report.errors.push(EntityFailure {
                        entity_id: entity.id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        counter!("suggestions_created_total").increment(report.created.len() as u64);
        counter!("suggestions_updated_total").increment(report.updated);

        info!(
            entities = report.entities,
            created = report.created.len(),
            updated = report.updated,
            skipped = report.skipped.total(),
            errors = report.errors.len(),
            "Account analysis completed"
        );
        Ok(report)
    }

    async fn process_entity(
        &self,
        entity: &AdEntityModel,
        config: &ThresholdConfig,
        now: DateTime<Utc>,
    ) -> Result<EntityOutcome, PipelineError> {
        if scale_window(entity, config, now).is_none() {
            return Ok(EntityOutcome::SkippedTiming);
        }

        let Some(metrics) = self.aggregate_metrics(entity).await? else {
            return Ok(EntityOutcome::SkippedNoData);
        };

        let analysis = analyze(&metrics, config);
        if !analysis.all_conditions_met() {
            debug!(
                entity_id = %entity.id,
                configured = analysis.configured,
                met = analysis.met,
                "Entity does not qualify"
            );
            return Ok(EntityOutcome::SkippedNotQualifying);
        }

        let proposal = ScaleProposal::new(entity, config, analysis.qualifying);
        self.upsert_suggestion(entity, proposal, now).await
    }

    async fn aggregate_metrics(
        &self,
        entity: &AdEntityModel,
    ) -> Result<Option<MetricValues>, PipelineError> {
        let metrics = match entity.entity_type {
            TargetType::Adset => self
                .records
                .find_latest_for_ad_set(&entity.account_id, &entity.id)
                .await?
                .map(|record| record.metrics),
            TargetType::Campaign => {
                let records = self
                    .records
                    .find_all_for_campaign(&entity.account_id, &entity.id)
                    .await?;
                aggregate::roll_up(&records)
            }
        };

        Ok(metrics.filter(|metrics| !metrics.is_empty()))
    }

    /// Create the entity's pending suggestion, or refresh the existing one
    /// after collapsing any duplicates onto the most recent.
    async fn upsert_suggestion(
        &self,
        entity: &AdEntityModel,
        proposal: ScaleProposal,
        now: DateTime<Utc>,
    ) -> Result<EntityOutcome, PipelineError> {
        let pending = self.suggestions.find_pending_by_target(&entity.id).await?;

        let Some(plan) = plan_dedup(pending) else {
            let suggestion = create_suggestion(entity, proposal, now)?;
            self.suggestions.insert(&suggestion).await?;
            debug!(entity_id = %entity.id, suggestion_id = %suggestion.id, "Created suggestion");
            return Ok(EntityOutcome::Created(suggestion));
        };

        let mut duplicates_deleted = 0;
        if !plan.duplicates.is_empty() {
            duplicates_deleted = self.suggestions.delete_bulk(&plan.duplicates).await?;
            warn!(
                entity_id = %entity.id,
                kept = %plan.canonical.id,
                deleted = duplicates_deleted,
                "Removed duplicate pending suggestions"
            );
            counter!("suggestion_duplicates_deleted_total").increment(duplicates_deleted);
        }

        let suggestion = update_pending_suggestion(&plan.canonical, proposal, now)?;
        self.suggestions.update(&suggestion).await?;
        debug!(entity_id = %entity.id, suggestion_id = %suggestion.id, "Updated suggestion");

        Ok(EntityOutcome::Updated {
            suggestion,
            duplicates_deleted,
        })
    }
}
