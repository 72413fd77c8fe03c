//! # Threshold Configuration Repository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel};

use super::ThresholdConfigStore;
use crate::error::RepositoryError;
use crate::models::ThresholdConfig;
use crate::models::threshold_config::Entity as ThresholdConfigEntity;

#[derive(Debug, Clone)]
pub struct ThresholdConfigRepository {
    db: Arc<DatabaseConnection>,
}

impl ThresholdConfigRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ThresholdConfigStore for ThresholdConfigRepository {
    async fn find_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<ThresholdConfig>, RepositoryError> {
        ThresholdConfigEntity::find_by_id(account_id.to_string())
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn upsert(&self, config: ThresholdConfig) -> Result<ThresholdConfig, RepositoryError> {
        if config.account_id.trim().is_empty() {
            return Err(RepositoryError::validation_error(
                "threshold config requires an account id",
            ));
        }
        if !(config.scale_percent.is_finite() && config.scale_percent >= 0.0) {
            return Err(RepositoryError::validation_error(format!(
                "scale_percent must be a non-negative number, got {}",
                config.scale_percent
            )));
        }

        let now = Utc::now();
        let existing = self.find_by_account(&config.account_id).await?;

        let mut config = config;
        config.updated_at = Some(now.into());
        config.created_at = existing
            .as_ref()
            .and_then(|existing| existing.created_at)
            .or(Some(now.into()));

        // Every column set, so the update touches the full row.
        let active = config.into_active_model().reset_all();
        let saved = if existing.is_some() {
            active.update(&*self.db).await
        } else {
            active.insert(&*self.db).await
        };

        saved.map_err(RepositoryError::database_error)
    }
}
