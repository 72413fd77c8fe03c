//! # Suggestion Repository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::SuggestionStore;
use super::ad_entity::mark_scaled_on;
use crate::error::RepositoryError;
use crate::models::SuggestionStatus;
use crate::models::suggestion::{Column, Entity as SuggestionEntity, Model as SuggestionModel};
use crate::suggestions::Suggestion;

#[derive(Debug, Clone)]
pub struct SuggestionRepository {
    db: Arc<DatabaseConnection>,
}

impl SuggestionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn decode_all(models: Vec<SuggestionModel>) -> Result<Vec<Suggestion>, RepositoryError> {
    models.into_iter().map(Suggestion::try_from).collect()
}

#[async_trait]
impl SuggestionStore for SuggestionRepository {
    async fn find_pending_by_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        let models = SuggestionEntity::find()
            .filter(Column::TargetId.eq(target_id))
            .filter(Column::Status.eq(SuggestionStatus::Pending))
            .order_by_desc(Column::UpdatedAt)
            .order_by_desc(Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        decode_all(models)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Suggestion>, RepositoryError> {
        SuggestionEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .map(Suggestion::try_from)
            .transpose()
    }

    async fn insert(&self, suggestion: &Suggestion) -> Result<(), RepositoryError> {
        suggestion
            .to_active_model()?
            .insert(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    async fn update(&self, suggestion: &Suggestion) -> Result<(), RepositoryError> {
        suggestion
            .to_active_model()?
            .update(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    async fn record_approval(
        &self,
        suggestion: &Suggestion,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        suggestion
            .to_active_model()?
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        mark_scaled_on(&txn, &suggestion.target_id, suggestion.budget_after_scale, at).await?;

        txn.commit().await.map_err(RepositoryError::database_error)?;
        debug!(suggestion_id = %suggestion.id, "Recorded approval");
        Ok(())
    }

    async fn delete_bulk(&self, ids: &[Uuid]) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = SuggestionEntity::delete_many()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .exec(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }

    async fn list(
        &self,
        account_id: &str,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        let mut query = SuggestionEntity::find().filter(Column::AccountId.eq(account_id));
        if let Some(status) = status {
            query = query.filter(Column::Status.eq(status));
        }

        let models = query
            .order_by_desc(Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        decode_all(models)
    }
}
