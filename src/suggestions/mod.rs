//! # Suggestions
//!
//! The scale recommendation an operator approves or rejects, its lifecycle
//! rules and the actions that apply an approved scale on the ad platform.

use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::QualifyingMetric;
use crate::error::RepositoryError;
use crate::models::suggestion::{ActiveModel, Model};
use crate::models::{SuggestionStatus, TargetType};

pub mod lifecycle;
pub mod service;

pub use lifecycle::{
    DedupPlan, ScaleProposal, approve_suggestion, compute_budget_after_scale, create_suggestion,
    plan_dedup, reject_suggestion, update_pending_suggestion,
};
pub use service::SuggestionService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub account_id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub target_name: String,
    pub campaign_id: Option<String>,
    pub budget: f64,
    pub budget_after_scale: f64,
    pub scale_percent: f64,
    pub metrics: Vec<QualifyingMetric>,
    pub metrics_exceeded_count: u32,
    pub status: SuggestionStatus,
    pub note: Option<String>,
    /// Last scale of the target at the time of analysis
    pub recent_scale_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn is_pending(&self) -> bool {
        self.status == SuggestionStatus::Pending
    }

    pub fn to_active_model(&self) -> Result<ActiveModel, RepositoryError> {
        let metrics = serde_json::to_value(&self.metrics).map_err(|err| {
            RepositoryError::validation_error(format!("failed to encode metrics: {err}"))
        })?;

        Ok(ActiveModel {
            id: Set(self.id),
            account_id: Set(self.account_id.clone()),
            target_type: Set(self.target_type),
            target_id: Set(self.target_id.clone()),
            target_name: Set(self.target_name.clone()),
            campaign_id: Set(self.campaign_id.clone()),
            budget: Set(self.budget),
            budget_after_scale: Set(self.budget_after_scale),
            scale_percent: Set(self.scale_percent),
            metrics: Set(metrics),
            metrics_exceeded_count: Set(self.metrics_exceeded_count as i32),
            status: Set(self.status),
            note: Set(self.note.clone()),
            recent_scale_at: Set(self.recent_scale_at.map(Into::into)),
            created_at: Set(self.created_at.into()),
            updated_at: Set(self.updated_at.into()),
        })
    }
}

impl TryFrom<Model> for Suggestion {
    type Error = RepositoryError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let metrics: Vec<QualifyingMetric> =
            serde_json::from_value(model.metrics).map_err(|err| {
                RepositoryError::validation_error(format!(
                    "suggestion {} has malformed metrics: {err}",
                    model.id
                ))
            })?;

        Ok(Self {
            id: model.id,
            account_id: model.account_id,
            target_type: model.target_type,
            target_id: model.target_id,
            target_name: model.target_name,
            campaign_id: model.campaign_id,
            budget: model.budget,
            budget_after_scale: model.budget_after_scale,
            scale_percent: model.scale_percent,
            metrics,
            metrics_exceeded_count: model.metrics_exceeded_count.max(0) as u32,
            status: model.status,
            note: model.note,
            recent_scale_at: model.recent_scale_at.map(|at| at.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}
