//! Shared fixtures for integration tests: an in-memory SQLite database with
//! every migration applied, plus seed helpers for accounts, entities and
//! threshold configs.

#![allow(dead_code)]

use std::sync::Arc;

use adscale::models::ThresholdConfig;
use adscale::models::ad_account::{AccountStatus, ActiveModel as AdAccountActiveModel};
use adscale::models::ad_entity::{
    ActiveModel as AdEntityActiveModel, EntityStatus, Model as AdEntityModel,
};
use adscale::models::TargetType;
use adscale::repositories::{
    AdAccountRepository, AdEntityRepository, ThresholdConfigRepository, ThresholdConfigStore,
};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, Set};

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

pub async fn insert_account(db: &Arc<DatabaseConnection>, id: &str) -> Result<()> {
    let now = Utc::now();
    AdAccountRepository::new(db.clone())
        .create(AdAccountActiveModel {
            id: Set(id.to_string()),
            name: Set(format!("Account {id}")),
            currency: Set("USD".to_string()),
            status: Set(AccountStatus::Active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .await?;
    Ok(())
}

/// Seed fixture for an ad set or campaign.
pub struct EntitySeed<'a> {
    pub id: &'a str,
    pub account_id: &'a str,
    pub entity_type: TargetType,
    pub campaign_id: Option<&'a str>,
    pub daily_budget: f64,
    pub age_days: Option<i64>,
    pub last_scaled_at: Option<DateTime<Utc>>,
}

impl<'a> EntitySeed<'a> {
    pub fn ad_set(id: &'a str, account_id: &'a str, campaign_id: &'a str) -> Self {
        Self {
            id,
            account_id,
            entity_type: TargetType::Adset,
            campaign_id: Some(campaign_id),
            daily_budget: 100.0,
            age_days: Some(30),
            last_scaled_at: None,
        }
    }

    pub fn campaign(id: &'a str, account_id: &'a str) -> Self {
        Self {
            id,
            account_id,
            entity_type: TargetType::Campaign,
            campaign_id: None,
            daily_budget: 500.0,
            age_days: Some(30),
            last_scaled_at: None,
        }
    }
}

pub async fn insert_entity(
    db: &Arc<DatabaseConnection>,
    seed: EntitySeed<'_>,
) -> Result<AdEntityModel> {
    let now = Utc::now();
    let model = AdEntityRepository::new(db.clone())
        .create(AdEntityActiveModel {
            id: Set(seed.id.to_string()),
            account_id: Set(seed.account_id.to_string()),
            entity_type: Set(seed.entity_type),
            campaign_id: Set(seed.campaign_id.map(str::to_string)),
            name: Set(format!("Entity {}", seed.id)),
            daily_budget: Set(seed.daily_budget),
            start_time: Set(seed.age_days.map(|days| (now - Duration::days(days)).into())),
            last_scaled_at: Set(seed.last_scaled_at.map(Into::into)),
            status: Set(EntityStatus::Active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .await?;
    Ok(model)
}

/// Threshold config with `ctr > 0.02`, +20% scale and a one day initial wait.
pub fn ctr_config(account_id: &str) -> ThresholdConfig {
    ThresholdConfig {
        account_id: account_id.to_string(),
        ctr: Some(0.02),
        scale_percent: 20.0,
        init_scale_day: Some(1),
        recur_scale_day: Some(7),
        ..Default::default()
    }
}

pub async fn insert_config(
    db: &Arc<DatabaseConnection>,
    config: ThresholdConfig,
) -> Result<ThresholdConfig> {
    Ok(ThresholdConfigRepository::new(db.clone())
        .upsert(config)
        .await?)
}
