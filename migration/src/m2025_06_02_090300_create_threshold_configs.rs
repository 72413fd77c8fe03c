//! Migration to create threshold_configs table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ThresholdConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ThresholdConfigs::AccountId)
                            .string()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ThresholdConfigs::Ctr).double())
                    .col(ColumnDef::new(ThresholdConfigs::Cpc).double())
                    .col(ColumnDef::new(ThresholdConfigs::Cpm).double())
                    .col(ColumnDef::new(ThresholdConfigs::CostPerPurchase).double())
                    .col(ColumnDef::new(ThresholdConfigs::CostPerInteraction).double())
                    .col(ColumnDef::new(ThresholdConfigs::PurchaseRoas).double())
                    .col(
                        ColumnDef::new(ThresholdConfigs::ScalePercent)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(ThresholdConfigs::InitScaleDay).integer())
                    .col(ColumnDef::new(ThresholdConfigs::RecurScaleDay).integer())
                    .col(ColumnDef::new(ThresholdConfigs::Note).string())
                    .col(
                        ColumnDef::new(ThresholdConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ThresholdConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ThresholdConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ThresholdConfigs {
    Table,
    AccountId,
    Ctr,
    Cpc,
    Cpm,
    CostPerPurchase,
    CostPerInteraction,
    PurchaseRoas,
    ScalePercent,
    InitScaleDay,
    RecurScaleDay,
    Note,
    CreatedAt,
    UpdatedAt,
}
