//! # Ad Account Model
//!
//! An advertising account on the external platform. Sync cycles iterate the
//! active accounts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ad_accounts")]
pub struct Model {
    /// Platform identifier, e.g. `act_1234567890`
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    pub currency: String,

    pub status: AccountStatus,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AccountStatus {
    #[sea_orm(string_value = "active")]
    #[serde(rename = "active")]
    #[default]
    Active,

    #[sea_orm(string_value = "paused")]
    #[serde(rename = "paused")]
    Paused,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Account id without the `act_` prefix the platform adds in some payloads.
    pub fn bare_id(&self) -> &str {
        strip_account_prefix(&self.id)
    }
}

/// Strip the platform's `act_` prefix from an account identifier.
pub fn strip_account_prefix(id: &str) -> &str {
    id.strip_prefix("act_").unwrap_or(id)
}
