//! Migration to create ad_accounts table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AdAccounts::Id).string().primary_key())
                    .col(ColumnDef::new(AdAccounts::Name).string().not_null())
                    .col(ColumnDef::new(AdAccounts::Currency).string().not_null().default("USD"))
                    .col(
                        ColumnDef::new(AdAccounts::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(AdAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AdAccounts::UpdatedAt)
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
            .drop_table(Table::drop().table(AdAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AdAccounts {
    Table,
    Id,
    Name,
    Currency,
    Status,
    CreatedAt,
    UpdatedAt,
}
