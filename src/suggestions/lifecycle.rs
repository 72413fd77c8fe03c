//! # Suggestion Lifecycle
//!
//! Construction, in-place refresh and terminal transitions of a suggestion.
//! Only a `pending` suggestion may be refreshed, approved or rejected; once
//! terminal, a later qualifying cycle produces a new suggestion.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Suggestion;
use crate::analysis::{MetricName, QualifyingMetric};
use crate::error::SuggestionError;
use crate::models::ad_entity::Model as AdEntityModel;
use crate::models::{SuggestionStatus, ThresholdConfig};

/// Values an analysis pass proposes for an entity's suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleProposal {
    pub budget: f64,
    pub scale_percent: f64,
    pub metrics: Vec<QualifyingMetric>,
    pub note: Option<String>,
    pub recent_scale_at: Option<DateTime<Utc>>,
}

impl ScaleProposal {
    pub fn new(
        entity: &AdEntityModel,
        config: &ThresholdConfig,
        metrics: Vec<QualifyingMetric>,
    ) -> Self {
        Self {
            budget: entity.daily_budget,
            scale_percent: config.scale_percent,
            metrics,
            note: config.note.clone(),
            recent_scale_at: entity.last_scaled_at_utc(),
        }
    }

    fn validate(&self) -> Result<(), SuggestionError> {
        if !(self.budget.is_finite() && self.budget > 0.0) {
            return Err(SuggestionError::InvalidBudget(self.budget));
        }
        if let Some(unknown) = self
            .metrics
            .iter()
            .find(|metric| MetricName::parse(&metric.name).is_none())
        {
            return Err(SuggestionError::InvalidMetricName(unknown.name.clone()));
        }
        Ok(())
    }
}

/// `budget * (1 + percent / 100)`, rounded to cents.
pub fn compute_budget_after_scale(budget: f64, scale_percent: f64) -> f64 {
    let scaled = budget * (1.0 + scale_percent / 100.0);
    (scaled * 100.0).round() / 100.0
}

pub fn create_suggestion(
    entity: &AdEntityModel,
    proposal: ScaleProposal,
    now: DateTime<Utc>,
) -> Result<Suggestion, SuggestionError> {
    proposal.validate()?;

    Ok(Suggestion {
        id: Uuid::new_v4(),
        account_id: entity.account_id.clone(),
        target_type: entity.entity_type,
        target_id: entity.id.clone(),
        target_name: entity.name.clone(),
        campaign_id: entity.campaign_id.clone(),
        budget: proposal.budget,
        budget_after_scale: compute_budget_after_scale(proposal.budget, proposal.scale_percent),
        scale_percent: proposal.scale_percent,
        metrics_exceeded_count: proposal.metrics.len() as u32,
        metrics: proposal.metrics,
        status: SuggestionStatus::Pending,
        note: proposal.note,
        recent_scale_at: proposal.recent_scale_at,
        created_at: now,
        updated_at: now,
    })
}

/// Refresh a pending suggestion with a newer analysis, keeping its identity.
pub fn update_pending_suggestion(
    existing: &Suggestion,
    proposal: ScaleProposal,
    now: DateTime<Utc>,
) -> Result<Suggestion, SuggestionError> {
    ensure_pending(existing, "update")?;
    proposal.validate()?;

    Ok(Suggestion {
        budget: proposal.budget,
        budget_after_scale: compute_budget_after_scale(proposal.budget, proposal.scale_percent),
        scale_percent: proposal.scale_percent,
        metrics_exceeded_count: proposal.metrics.len() as u32,
        metrics: proposal.metrics,
        note: proposal.note,
        recent_scale_at: proposal.recent_scale_at,
        updated_at: now.max(existing.updated_at),
        ..existing.clone()
    })
}

pub fn approve_suggestion(
    suggestion: &mut Suggestion,
    now: DateTime<Utc>,
) -> Result<(), SuggestionError> {
    transition(suggestion, SuggestionStatus::Approved, "approve", now)
}

pub fn reject_suggestion(
    suggestion: &mut Suggestion,
    now: DateTime<Utc>,
) -> Result<(), SuggestionError> {
    transition(suggestion, SuggestionStatus::Rejected, "reject", now)
}

fn transition(
    suggestion: &mut Suggestion,
    to: SuggestionStatus,
    action: &'static str,
    now: DateTime<Utc>,
) -> Result<(), SuggestionError> {
    ensure_pending(suggestion, action)?;
    suggestion.status = to;
    suggestion.updated_at = now;
    Ok(())
}

fn ensure_pending(suggestion: &Suggestion, action: &'static str) -> Result<(), SuggestionError> {
    if suggestion.is_pending() {
        Ok(())
    } else {
        Err(SuggestionError::InvalidTransition {
            from: suggestion.status.to_string(),
            action,
        })
    }
}

/// Canonical pending suggestion plus the surplus ones to delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupPlan {
    pub canonical: Suggestion,
    pub duplicates: Vec<Uuid>,
}

/// Keep the most recently touched pending suggestion; the rest are duplicates.
///
/// Returns `None` when there is nothing pending.
pub fn plan_dedup(pending: Vec<Suggestion>) -> Option<DedupPlan> {
    let mut pending = pending;
    pending.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    let mut iter = pending.into_iter();
    let canonical = iter.next()?;
    Some(DedupPlan {
        canonical,
        duplicates: iter.map(|suggestion| suggestion.id).collect(),
    })
}
