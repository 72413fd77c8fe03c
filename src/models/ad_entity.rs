//! # Ad Entity Model
//!
//! Ad sets and campaigns: the units a suggestion targets. Carries the current
//! daily budget and the scale history consulted by the timing gate.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ad_entities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub account_id: String,

    pub entity_type: TargetType,

    /// Parent campaign; `None` for campaigns themselves
    pub campaign_id: Option<String>,

    pub name: String,

    pub daily_budget: f64,

    pub start_time: Option<DateTimeWithTimeZone>,

    pub last_scaled_at: Option<DateTimeWithTimeZone>,

    pub status: EntityStatus,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// Kind of entity a suggestion targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TargetType {
    #[sea_orm(string_value = "adset")]
    #[serde(rename = "adset")]
    Adset,

    #[sea_orm(string_value = "campaign")]
    #[serde(rename = "campaign")]
    Campaign,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Adset => "adset",
            TargetType::Campaign => "campaign",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum EntityStatus {
    #[sea_orm(string_value = "active")]
    #[serde(rename = "active")]
    #[default]
    Active,

    #[sea_orm(string_value = "paused")]
    #[serde(rename = "paused")]
    Paused,

    #[sea_orm(string_value = "archived")]
    #[serde(rename = "archived")]
    Archived,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whole days since the entity started delivering, or `None` without a start time.
    pub fn age_in_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.start_time
            .map(|start| (now - start.with_timezone(&Utc)).num_days())
    }

    pub fn last_scaled_at_utc(&self) -> Option<DateTime<Utc>> {
        self.last_scaled_at.map(|at| at.with_timezone(&Utc))
    }
}
