//! # Ad Entity Repository
//!
//! Ad sets and campaigns eligible for scaling, and the write-back after an
//! approved scale.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use super::AdEntityStore;
use crate::error::RepositoryError;
use crate::models::ad_entity::{
    ActiveModel as AdEntityActiveModel, Column, Entity as AdEntity, EntityStatus,
    Model as AdEntityModel,
};
use crate::platform::PlatformEntity;

#[derive(Debug, Clone)]
pub struct AdEntityRepository {
    db: Arc<DatabaseConnection>,
}

impl AdEntityRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        entity: AdEntityActiveModel,
    ) -> Result<AdEntityModel, RepositoryError> {
        entity
            .insert(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

fn platform_active_model(
    account_id: &str,
    entity: PlatformEntity,
    now: DateTime<Utc>,
) -> AdEntityActiveModel {
    AdEntityActiveModel {
        id: Set(entity.id),
        account_id: Set(account_id.to_string()),
        entity_type: Set(entity.entity_type),
        campaign_id: Set(entity.campaign_id),
        name: Set(entity.name),
        daily_budget: Set(entity.daily_budget.unwrap_or(0.0)),
        start_time: Set(entity.start_time.map(Into::into)),
        last_scaled_at: Set(None),
        status: Set(if entity.active {
            EntityStatus::Active
        } else {
            EntityStatus::Paused
        }),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

#[async_trait]
impl AdEntityStore for AdEntityRepository {
    async fn list_scalable(&self, account_id: &str) -> Result<Vec<AdEntityModel>, RepositoryError> {
        AdEntity::find()
            .filter(Column::AccountId.eq(account_id))
            .filter(Column::Status.eq(EntityStatus::Active))
            .filter(Column::DailyBudget.gt(0.0))
            .order_by_asc(Column::EntityType)
            .order_by_asc(Column::Id)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn find(&self, id: &str) -> Result<Option<AdEntityModel>, RepositoryError> {
        AdEntity::find_by_id(id.to_string())
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn sync_from_platform(
        &self,
        account_id: &str,
        entities: Vec<PlatformEntity>,
    ) -> Result<u64, RepositoryError> {
        if entities.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let count = entities.len() as u64;
        let models = entities
            .into_iter()
            .map(|entity| platform_active_model(account_id, entity, now));

        // last_scaled_at and created_at are ours; never overwritten.
        AdEntity::insert_many(models)
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_columns([
                        Column::CampaignId,
                        Column::Name,
                        Column::DailyBudget,
                        Column::StartTime,
                        Column::Status,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        debug!(account_id, count, "Synced ad entities from platform");
        Ok(count)
    }

    async fn mark_scaled(
        &self,
        id: &str,
        new_budget: f64,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        mark_scaled_on(&*self.db, id, new_budget, at).await
    }
}

/// Write an applied scale through `conn`, which may be an open transaction.
pub(crate) async fn mark_scaled_on<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    new_budget: f64,
    at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let entity = AdEntity::find_by_id(id.to_string())
        .one(conn)
        .await
        .map_err(RepositoryError::database_error)?
        .ok_or_else(|| RepositoryError::not_found(format!("ad entity {id}")))?;

    let mut active: AdEntityActiveModel = entity.into();
    active.daily_budget = Set(new_budget);
    active.last_scaled_at = Set(Some(at.into()));
    active.updated_at = Set(Utc::now().into());
    active
        .update(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    debug!(entity_id = %id, new_budget, "Marked entity as scaled");
    Ok(())
}
