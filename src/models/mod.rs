//! # Data Models
//!
//! SeaORM entities for accounts, ad entities, imported performance records,
//! threshold configuration and suggestions.

pub mod ad_account;
pub mod ad_entity;
pub mod performance_record;
pub mod suggestion;
pub mod threshold_config;

pub use ad_account::Entity as AdAccount;
pub use ad_entity::Entity as AdEntity;
pub use performance_record::Entity as PerformanceRecordEntity;
pub use suggestion::Entity as SuggestionEntity;
pub use threshold_config::Entity as ThresholdConfigEntity;

pub use ad_entity::TargetType;
pub use suggestion::SuggestionStatus;

/// Per-account threshold configuration.
pub type ThresholdConfig = threshold_config::Model;
