//! Migration to create suggestions table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Suggestions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Suggestions::Id).uuid().primary_key())
                    .col(ColumnDef::new(Suggestions::AccountId).string().not_null())
                    .col(ColumnDef::new(Suggestions::TargetType).string().not_null())
                    .col(ColumnDef::new(Suggestions::TargetId).string().not_null())
                    .col(ColumnDef::new(Suggestions::TargetName).string().not_null())
                    .col(ColumnDef::new(Suggestions::CampaignId).string())
                    .col(ColumnDef::new(Suggestions::Budget).double().not_null())
                    .col(
                        ColumnDef::new(Suggestions::BudgetAfterScale)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Suggestions::ScalePercent).double().not_null())
                    .col(ColumnDef::new(Suggestions::Metrics).json_binary().not_null())
                    .col(
                        ColumnDef::new(Suggestions::MetricsExceededCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Suggestions::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Suggestions::Note).string())
                    .col(ColumnDef::new(Suggestions::RecentScaleAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Suggestions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Suggestions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-suggestions-target_id-status")
                    .table(Suggestions::Table)
                    .col(Suggestions::TargetId)
                    .col(Suggestions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-suggestions-account_id-status")
                    .table(Suggestions::Table)
                    .col(Suggestions::AccountId)
                    .col(Suggestions::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Suggestions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Suggestions {
    Table,
    Id,
    AccountId,
    TargetType,
    TargetId,
    TargetName,
    CampaignId,
    Budget,
    BudgetAfterScale,
    ScalePercent,
    Metrics,
    MetricsExceededCount,
    Status,
    Note,
    RecentScaleAt,
    CreatedAt,
    UpdatedAt,
}
