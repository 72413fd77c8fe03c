//! # Repository Layer
//!
//! Storage capabilities consumed by ingestion, analysis and the suggestion
//! actions, expressed as async traits, plus their SeaORM implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::insights::PerformanceRecord;
use crate::models::ad_account::Model as AdAccountModel;
use crate::models::ad_entity::Model as AdEntityModel;
use crate::models::{SuggestionStatus, ThresholdConfig};
use crate::platform::PlatformEntity;
use crate::suggestions::Suggestion;

pub mod ad_account;
pub mod ad_entity;
pub mod performance_record;
pub mod suggestion;
pub mod threshold_config;

pub use ad_account::AdAccountRepository;
pub use ad_entity::AdEntityRepository;
pub use performance_record::PerformanceRecordRepository;
pub use suggestion::SuggestionRepository;
pub use threshold_config::ThresholdConfigRepository;

/// Sink and lookup for imported performance records.
#[async_trait]
pub trait PerformanceRecordStore: Send + Sync {
    /// Upsert a batch keyed by (account, ad set, grain). Returns rows written.
    async fn save_batch(&self, records: Vec<PerformanceRecord>) -> Result<u64, RepositoryError>;

    /// Most recently stored record for an ad set.
    async fn find_latest_for_ad_set(
        &self,
        account_id: &str,
        ad_set_id: &str,
    ) -> Result<Option<PerformanceRecord>, RepositoryError>;

    /// Every stored record of the ad sets under a campaign.
    async fn find_all_for_campaign(
        &self,
        account_id: &str,
        campaign_id: &str,
    ) -> Result<Vec<PerformanceRecord>, RepositoryError>;
}

#[async_trait]
pub trait ThresholdConfigStore: Send + Sync {
    async fn find_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<ThresholdConfig>, RepositoryError>;

    async fn upsert(&self, config: ThresholdConfig) -> Result<ThresholdConfig, RepositoryError>;
}

#[async_trait]
pub trait AdEntityStore: Send + Sync {
    /// Active entities of an account with a positive budget.
    async fn list_scalable(
        &self,
        account_id: &str,
    ) -> Result<Vec<AdEntityModel>, RepositoryError>;

    async fn find(&self, id: &str) -> Result<Option<AdEntityModel>, RepositoryError>;

    /// Upsert the platform's view of an account's entities, keeping scale history.
    async fn sync_from_platform(
        &self,
        account_id: &str,
        entities: Vec<PlatformEntity>,
    ) -> Result<u64, RepositoryError>;

    /// Record an applied scale: new budget and scale time.
    async fn mark_scaled(
        &self,
        id: &str,
        new_budget: f64,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AdAccountStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<AdAccountModel>, RepositoryError>;
}

#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// Pending suggestions for a target, newest first.
    async fn find_pending_by_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<Suggestion>, RepositoryError>;

    async fn find(&self, id: Uuid) -> Result<Option<Suggestion>, RepositoryError>;

    async fn insert(&self, suggestion: &Suggestion) -> Result<(), RepositoryError>;

    async fn update(&self, suggestion: &Suggestion) -> Result<(), RepositoryError>;

    /// Persist an approved suggestion and mark its target scaled to
    /// `budget_after_scale` at `at`. Both writes commit together or not at all.
    async fn record_approval(
        &self,
        suggestion: &Suggestion,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Delete by id. Returns the number of rows removed.
    async fn delete_bulk(&self, ids: &[Uuid]) -> Result<u64, RepositoryError>;

    async fn list(
        &self,
        account_id: &str,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Suggestion>, RepositoryError>;
}
