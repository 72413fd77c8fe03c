//! Canonical performance record produced by the mapper and consumed by analysis.

use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::MetricName;
use crate::models::performance_record::{ActiveModel, Model};

/// Numeric metrics of one record or one aggregate. `None` means "not reported".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
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
    pub cost_per_purchase: Option<f64>,
    pub cost_per_interaction: Option<f64>,
}

impl MetricValues {
    /// Measured value for a threshold metric.
    pub fn value(&self, metric: MetricName) -> Option<f64> {
        match metric {
            MetricName::Ctr => self.ctr,
            MetricName::Cpc => self.cpc,
            MetricName::Cpm => self.cpm,
            MetricName::CostPerPurchase => self.cost_per_purchase,
            MetricName::CostPerInteraction => self.cost_per_interaction,
            MetricName::PurchaseRoas => self.purchase_roas,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == MetricValues::default()
    }
}

/// One imported report row for an ad set on a given grain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub account_id: String,
    pub campaign_id: String,
    pub ad_set_id: String,
    pub grain_key: String,
    pub ad_set_name: Option<String>,
    pub campaign_name: Option<String>,
    pub reporting_starts: Option<String>,
    pub reporting_ends: Option<String>,
    pub metrics: MetricValues,
    /// Set when loaded from storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PerformanceRecord {
    /// Upsert key used by storage.
    pub fn natural_key(&self) -> (&str, &str, &str) {
        (&self.account_id, &self.ad_set_id, &self.grain_key)
    }

    pub fn into_active_model(self, now: DateTime<Utc>) -> ActiveModel {
        let m = self.metrics;
        ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(self.account_id),
            campaign_id: Set(self.campaign_id),
            ad_set_id: Set(self.ad_set_id),
            grain_key: Set(self.grain_key),
            ad_set_name: Set(self.ad_set_name),
            campaign_name: Set(self.campaign_name),
            reporting_starts: Set(self.reporting_starts),
            reporting_ends: Set(self.reporting_ends),
            impressions: Set(m.impressions),
            clicks: Set(m.clicks),
            link_clicks: Set(m.link_clicks),
            spend: Set(m.spend),
            reach: Set(m.reach),
            frequency: Set(m.frequency),
            ctr: Set(m.ctr),
            unique_ctr: Set(m.unique_ctr),
            link_ctr: Set(m.link_ctr),
            cpc: Set(m.cpc),
            cpm: Set(m.cpm),
            cost_per_link_click: Set(m.cost_per_link_click),
            cost_per_unique_click: Set(m.cost_per_unique_click),
            purchase_roas: Set(m.purchase_roas),
            purchases: Set(m.purchases),
            purchases_conversion_value: Set(m.purchases_conversion_value),
            post_engagement: Set(m.post_engagement),
            video_plays: Set(m.video_plays),
            cost_per_purchase: Set(m.cost_per_purchase),
            cost_per_interaction: Set(m.cost_per_interaction),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }
}

impl From<Model> for PerformanceRecord {
    fn from(model: Model) -> Self {
        Self {
            account_id: model.account_id,
            campaign_id: model.campaign_id,
            ad_set_id: model.ad_set_id,
            grain_key: model.grain_key,
            ad_set_name: model.ad_set_name,
            campaign_name: model.campaign_name,
            reporting_starts: model.reporting_starts,
            reporting_ends: model.reporting_ends,
            metrics: MetricValues {
                impressions: model.impressions,
                clicks: model.clicks,
                link_clicks: model.link_clicks,
                spend: model.spend,
                reach: model.reach,
                frequency: model.frequency,
                ctr: model.ctr,
                unique_ctr: model.unique_ctr,
                link_ctr: model.link_ctr,
                cpc: model.cpc,
                cpm: model.cpm,
                cost_per_link_click: model.cost_per_link_click,
                cost_per_unique_click: model.cost_per_unique_click,
                purchase_roas: model.purchase_roas,
                purchases: model.purchases,
                purchases_conversion_value: model.purchases_conversion_value,
                post_engagement: model.post_engagement,
                video_plays: model.video_plays,
                cost_per_purchase: model.cost_per_purchase,
                cost_per_interaction: model.cost_per_interaction,
            },
            updated_at: Some(model.updated_at.with_timezone(&Utc)),
        }
    }
}
