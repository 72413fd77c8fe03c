//! Operator actions on suggestions.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{Suggestion, approve_suggestion, reject_suggestion};
use crate::error::{PipelineError, RepositoryError};
use crate::platform::AdPlatformClient;
use crate::repositories::SuggestionStore;

pub struct SuggestionService {
    suggestions: Arc<dyn SuggestionStore>,
    platform: Arc<dyn AdPlatformClient>,
}

impl SuggestionService {
    pub fn new(
        suggestions: Arc<dyn SuggestionStore>,
        platform: Arc<dyn AdPlatformClient>,
    ) -> Self {
        Self {
            suggestions,
            platform,
        }
    }

    /// Apply the scaled budget on the platform, then mark the suggestion approved.
    ///
    /// A platform failure leaves the suggestion pending. The suggestion and the
    /// entity's new budget are then stored in one transaction; if that fails
    /// the platform already carries the new budget and the error is logged
    /// with it.
    #[instrument(skip(self), fields(suggestion_id = %id))]
    pub async fn approve(&self, id: Uuid) -> Result<Suggestion, PipelineError> {
        let now = Utc::now();
        let mut suggestion = self.load(id).await?;
        approve_suggestion(&mut suggestion, now)?;

        if let Err(err) = self
            .platform
            .update_budget(
                suggestion.target_type,
                &suggestion.target_id,
                suggestion.budget_after_scale,
            )
            .await
        {
            warn!(
                target_id = %suggestion.target_id,
                retryable = err.is_retryable(),
                error = %err,
                "Budget update rejected; suggestion stays pending"
            );
            return Err(err.into());
        }

        if let Err(err) = self.suggestions.record_approval(&suggestion, now).await {
            error!(
                target_id = %suggestion.target_id,
                applied_budget = suggestion.budget_after_scale,
                error = %err,
                "Budget applied on platform but approval was not stored"
            );
            return Err(err.into());
        }

        counter!("suggestions_approved_total").increment(1);
        info!(
            target_id = %suggestion.target_id,
            budget = suggestion.budget,
            budget_after_scale = suggestion.budget_after_scale,
            "Suggestion approved"
        );
        Ok(suggestion)
    }

    #[instrument(skip(self), fields(suggestion_id = %id))]
    pub async fn reject(&self, id: Uuid) -> Result<Suggestion, PipelineError> {
        let mut suggestion = self.load(id).await?;
        reject_suggestion(&mut suggestion, Utc::now())?;
        self.suggestions.update(&suggestion).await?;

        counter!("suggestions_rejected_total").increment(1);
        info!(target_id = %suggestion.target_id, "Suggestion rejected");
        Ok(suggestion)
    }

    async fn load(&self, id: Uuid) -> Result<Suggestion, RepositoryError> {
        self.suggestions
            .find(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("suggestion {id}")))
    }
}
