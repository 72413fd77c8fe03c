//! # Suggestion Model
//!
//! Persisted scale recommendation awaiting operator approval.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::ad_entity::TargetType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suggestions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub account_id: String,

    pub target_type: TargetType,
    pub target_id: String,
    pub target_name: String,
    pub campaign_id: Option<String>,

    pub budget: f64,
    pub budget_after_scale: f64,
    pub scale_percent: f64,

    /// Qualifying metrics as `[{name, value, threshold}]`
    #[sea_orm(column_type = "JsonBinary")]
    pub metrics: Json,

    pub metrics_exceeded_count: i32,

    pub status: SuggestionStatus,

    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,

    pub recent_scale_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SuggestionStatus {
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    #[default]
    Pending,

    #[sea_orm(string_value = "approved")]
    #[serde(rename = "approved")]
    Approved,

    #[sea_orm(string_value = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Approved => "approved",
            SuggestionStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
