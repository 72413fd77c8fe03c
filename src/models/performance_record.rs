//! # Performance Record Model
//!
//! Stored form of one imported report row. Metrics are nullable: a missing
//! column stays `NULL`, distinct from a measured zero.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "performance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub account_id: String,
    pub campaign_id: String,
    pub ad_set_id: String,

    /// `lifetime` or the reporting day, part of the upsert key
    pub grain_key: String,

    pub ad_set_name: Option<String>,
    pub campaign_name: Option<String>,
    pub reporting_starts: Option<String>,
    pub reporting_ends: Option<String>,

    // Raw report metrics
    pub impressions: Option<f64>,
    pub clicks: Option<f64>,
    pub link_clicks: Option<f64>,
    pub spend: Option<f64>,
    pub reach: Option<f64>,
    pub frequency: Option<f64>,
    pub ctr: Option<f64>,
    pub unique_ctr: Option<f64>,
    pub link_ctr: Option<f64>,
    pub cpc: Option<f64>,
    pub cpm: Option<f64>,
    pub cost_per_link_click: Option<f64>,
    pub cost_per_unique_click: Option<f64>,
    pub purchase_roas: Option<f64>,
    pub purchases: Option<f64>,
    pub purchases_conversion_value: Option<f64>,
    pub post_engagement: Option<f64>,
    pub video_plays: Option<f64>,

    // Derived at mapping time
    pub cost_per_purchase: Option<f64>,
    pub cost_per_interaction: Option<f64>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
