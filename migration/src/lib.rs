//! Database migrations for the ad budget scaling service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_02_090000_create_ad_accounts;
mod m2025_06_02_090100_create_ad_entities;
mod m2025_06_02_090200_create_performance_records;
mod m2025_06_02_090300_create_threshold_configs;
mod m2025_06_02_090400_create_suggestions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_02_090000_create_ad_accounts::Migration),
            Box::new(m2025_06_02_090100_create_ad_entities::Migration),
            Box::new(m2025_06_02_090200_create_performance_records::Migration),
            Box::new(m2025_06_02_090300_create_threshold_configs::Migration),
            Box::new(m2025_06_02_090400_create_suggestions::Migration),
        ]
    }
}
