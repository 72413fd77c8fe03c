//! # Performance Record Repository
//!
//! Idempotent batch upsert of imported records keyed by
//! (account, ad set, grain key).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::debug;

use super::PerformanceRecordStore;
use crate::error::RepositoryError;
use crate::insights::PerformanceRecord;
use crate::models::performance_record::{Column, Entity as PerformanceRecordEntity};

/// Rows per INSERT statement. Each row binds one parameter per column, and
/// SQLite caps a statement at 32766 parameters.
const INSERT_CHUNK_ROWS: usize = 500;

/// Columns overwritten when a re-import hits an existing key.
const UPSERT_COLUMNS: [Column; 26] = [
    Column::CampaignId,
    Column::AdSetName,
    Column::CampaignName,
    Column::ReportingStarts,
    Column::ReportingEnds,
    Column::Impressions,
    Column::Clicks,
    Column::LinkClicks,
    Column::Spend,
    Column::Reach,
    Column::Frequency,
    Column::Ctr,
    Column::UniqueCtr,
    Column::LinkCtr,
    Column::Cpc,
    Column::Cpm,
    Column::CostPerLinkClick,
    Column::CostPerUniqueClick,
    Column::PurchaseRoas,
    Column::Purchases,
    Column::PurchasesConversionValue,
    Column::PostEngagement,
    Column::VideoPlays,
    Column::CostPerPurchase,
    Column::CostPerInteraction,
    Column::UpdatedAt,
];

#[derive(Debug, Clone)]
pub struct PerformanceRecordRepository {
    db: Arc<DatabaseConnection>,
}

impl PerformanceRecordRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

/// Collapse records sharing a key, keeping the last one in input order.
fn dedupe_by_key(records: Vec<PerformanceRecord>) -> Vec<PerformanceRecord> {
    let mut positions: HashMap<(String, String, String), usize> = HashMap::new();
    let mut unique: Vec<PerformanceRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = (
            record.account_id.clone(),
            record.ad_set_id.clone(),
            record.grain_key.clone(),
        );
        match positions.get(&key) {
            Some(&index) => unique[index] = record,
            None => {
                positions.insert(key, unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

#[async_trait]
impl PerformanceRecordStore for PerformanceRecordRepository {
    async fn save_batch(&self, records: Vec<PerformanceRecord>) -> Result<u64, RepositoryError> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let records = dedupe_by_key(records);
        let count = records.len() as u64;
        let models: Vec<_> = records
            .into_iter()
            .map(|record| record.into_active_model(now))
            .collect();
        let on_conflict = OnConflict::columns([Column::AccountId, Column::AdSetId, Column::GrainKey])
            .update_columns(UPSERT_COLUMNS)
            .to_owned();

        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;
        for chunk in models.chunks(INSERT_CHUNK_ROWS) {
            PerformanceRecordEntity::insert_many(chunk.to_vec())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(&txn)
                .await
                .map_err(RepositoryError::database_error)?;
        }
        txn.commit().await.map_err(RepositoryError::database_error)?;

        debug!(
            count,
            statements = models.len().div_ceil(INSERT_CHUNK_ROWS),
            "Upserted performance records"
        );
        Ok(count)
    }

    async fn find_latest_for_ad_set(
        &self,
        account_id: &str,
        ad_set_id: &str,
    ) -> Result<Option<PerformanceRecord>, RepositoryError> {
        let model = PerformanceRecordEntity::find()
            .filter(Column::AccountId.eq(account_id))
            .filter(Column::AdSetId.eq(ad_set_id))
            .order_by_desc(Column::UpdatedAt)
            .order_by_desc(Column::GrainKey)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(model.map(PerformanceRecord::from))
    }

    async fn find_all_for_campaign(
        &self,
        account_id: &str,
        campaign_id: &str,
    ) -> Result<Vec<PerformanceRecord>, RepositoryError> {
        let models = PerformanceRecordEntity::find()
            .filter(Column::AccountId.eq(account_id))
            .filter(Column::CampaignId.eq(campaign_id))
            .order_by_asc(Column::AdSetId)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(models.into_iter().map(PerformanceRecord::from).collect())
    }
}
