//! Migration to create ad_entities table (ad sets and campaigns)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdEntities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AdEntities::Id).string().primary_key())
                    .col(ColumnDef::new(AdEntities::AccountId).string().not_null())
                    .col(ColumnDef::new(AdEntities::EntityType).string().not_null())
                    .col(ColumnDef::new(AdEntities::CampaignId).string())
                    .col(ColumnDef::new(AdEntities::Name).string().not_null())
                    .col(ColumnDef::new(AdEntities::DailyBudget).double().not_null())
                    .col(ColumnDef::new(AdEntities::StartTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(AdEntities::LastScaledAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(AdEntities::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(AdEntities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AdEntities::UpdatedAt)
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
                    .name("idx-ad_entities-account_id-status")
                    .table(AdEntities::Table)
                    .col(AdEntities::AccountId)
                    .col(AdEntities::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdEntities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AdEntities {
    Table,
    Id,
    AccountId,
    EntityType,
    CampaignId,
    Name,
    DailyBudget,
    StartTime,
    LastScaledAt,
    Status,
    CreatedAt,
    UpdatedAt,
}
