//! # Threshold Configuration Model
//!
//! Per-account thresholds for the six scaling metrics plus scale parameters.
//! A threshold that is `NULL` or `0` is treated as not configured.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::MetricName;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "threshold_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: String,

    pub ctr: Option<f64>,
    pub cpc: Option<f64>,
    pub cpm: Option<f64>,
    pub cost_per_purchase: Option<f64>,
    pub cost_per_interaction: Option<f64>,
    pub purchase_roas: Option<f64>,

    /// Budget increase in percent, e.g. `20.0` scales 100 to 120
    pub scale_percent: f64,

    /// Minimum entity age in days before the first scale
    pub init_scale_day: Option<i32>,

    /// Minimum days since the last scale before scaling again
    pub recur_scale_day: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTimeWithTimeZone>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Default for Model {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            ctr: None,
            cpc: None,
            cpm: None,
            cost_per_purchase: None,
            cost_per_interaction: None,
            purchase_roas: None,
            scale_percent: 0.0,
            init_scale_day: None,
            recur_scale_day: None,
            note: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Model {
    /// Configured threshold for `metric`, `None` when absent or zero.
    pub fn threshold_for(&self, metric: MetricName) -> Option<f64> {
        let raw = match metric {
            MetricName::Ctr => self.ctr,
            MetricName::Cpc => self.cpc,
            MetricName::Cpm => self.cpm,
            MetricName::CostPerPurchase => self.cost_per_purchase,
            MetricName::CostPerInteraction => self.cost_per_interaction,
            MetricName::PurchaseRoas => self.purchase_roas,
        };
        raw.filter(|value| *value != 0.0 && value.is_finite())
    }

    pub fn has_any_threshold(&self) -> bool {
        MetricName::ALL
            .iter()
            .any(|metric| self.threshold_for(*metric).is_some())
    }

    pub fn init_scale_days(&self) -> Option<i64> {
        self.init_scale_day.filter(|days| *days > 0).map(i64::from)
    }

    pub fn recur_scale_days(&self) -> Option<i64> {
        self.recur_scale_day.filter(|days| *days > 0).map(i64::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_threshold_is_unconfigured() {
        let config = Model {
            ctr: Some(0.0),
            cpc: Some(1.5),
            ..Default::default()
        };

        assert_eq!(config.threshold_for(MetricName::Ctr), None);
        assert_eq!(config.threshold_for(MetricName::Cpc), Some(1.5));
        assert_eq!(config.threshold_for(MetricName::Cpm), None);
        assert!(config.has_any_threshold());
    }

    #[test]
    fn test_empty_config_has_no_thresholds() {
        let config = Model {
            ctr: Some(0.0),
            ..Default::default()
        };
        assert!(!config.has_any_threshold());
    }

    #[test]
    fn test_scale_days_treat_zero_as_unset() {
        let config = Model {
            init_scale_day: Some(0),
            recur_scale_day: Some(7),
            ..Default::default()
        };
        assert_eq!(config.init_scale_days(), None);
        assert_eq!(config.recur_scale_days(), Some(7));
    }
}
