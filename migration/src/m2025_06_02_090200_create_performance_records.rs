//! Migration to create performance_records table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PerformanceRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PerformanceRecords::Id).uuid().primary_key())
                    .col(ColumnDef::new(PerformanceRecords::AccountId).string().not_null())
                    .col(ColumnDef::new(PerformanceRecords::CampaignId).string().not_null())
                    .col(ColumnDef::new(PerformanceRecords::AdSetId).string().not_null())
                    .col(ColumnDef::new(PerformanceRecords::GrainKey).string().not_null())
                    .col(ColumnDef::new(PerformanceRecords::AdSetName).string())
                    .col(ColumnDef::new(PerformanceRecords::CampaignName).string())
                    .col(ColumnDef::new(PerformanceRecords::ReportingStarts).string())
                    .col(ColumnDef::new(PerformanceRecords::ReportingEnds).string())
                    .col(ColumnDef::new(PerformanceRecords::Impressions).double())
                    .col(ColumnDef::new(PerformanceRecords::Clicks).double())
                    .col(ColumnDef::new(PerformanceRecords::LinkClicks).double())
                    .col(ColumnDef::new(PerformanceRecords::Spend).double())
                    .col(ColumnDef::new(PerformanceRecords::Reach).double())
                    .col(ColumnDef::new(PerformanceRecords::Frequency).double())
                    .col(ColumnDef::new(PerformanceRecords::Ctr).double())
                    .col(ColumnDef::new(PerformanceRecords::UniqueCtr).double())
                    .col(ColumnDef::new(PerformanceRecords::LinkCtr).double())
                    .col(ColumnDef::new(PerformanceRecords::Cpc).double())
                    .col(ColumnDef::new(PerformanceRecords::Cpm).double())
                    .col(ColumnDef::new(PerformanceRecords::CostPerLinkClick).double())
                    .col(ColumnDef::new(PerformanceRecords::CostPerUniqueClick).double())
                    .col(ColumnDef::new(PerformanceRecords::PurchaseRoas).double())
                    .col(ColumnDef::new(PerformanceRecords::Purchases).double())
                    .col(ColumnDef::new(PerformanceRecords::PurchasesConversionValue).double())
                    .col(ColumnDef::new(PerformanceRecords::PostEngagement).double())
                    .col(ColumnDef::new(PerformanceRecords::VideoPlays).double())
                    .col(ColumnDef::new(PerformanceRecords::CostPerPurchase).double())
                    .col(ColumnDef::new(PerformanceRecords::CostPerInteraction).double())
                    .col(
                        ColumnDef::new(PerformanceRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PerformanceRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (account, ad set, grain); ingestion upserts against this key.
        manager
            .create_index(
                Index::create()
                    .name("uidx-performance_records-account-ad_set-grain")
                    .table(PerformanceRecords::Table)
                    .col(PerformanceRecords::AccountId)
                    .col(PerformanceRecords::AdSetId)
                    .col(PerformanceRecords::GrainKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-performance_records-campaign_id")
                    .table(PerformanceRecords::Table)
                    .col(PerformanceRecords::CampaignId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PerformanceRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PerformanceRecords {
    Table,
    Id,
    AccountId,
    CampaignId,
    AdSetId,
    GrainKey,
    AdSetName,
    CampaignName,
    ReportingStarts,
    ReportingEnds,
    Impressions,
    Clicks,
    LinkClicks,
    Spend,
    Reach,
    Frequency,
    Ctr,
    UniqueCtr,
    LinkCtr,
    Cpc,
    Cpm,
    CostPerLinkClick,
    CostPerUniqueClick,
    PurchaseRoas,
    Purchases,
    PurchasesConversionValue,
    PostEngagement,
    VideoPlays,
    CostPerPurchase,
    CostPerInteraction,
    CreatedAt,
    UpdatedAt,
}
