//! Threshold metric vocabulary and its cost/performance classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SuggestionError;

/// Whether a lower or a higher measurement is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Qualifies when the measured value is below the threshold.
    Cost,
    /// Qualifies when the measured value is above the threshold.
    Performance,
}

/// The metrics a threshold can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Ctr,
    Cpc,
    Cpm,
    CostPerPurchase,
    CostPerInteraction,
    PurchaseRoas,
}

impl MetricName {
    pub const ALL: [MetricName; 6] = [
        MetricName::Ctr,
        MetricName::Cpc,
        MetricName::Cpm,
        MetricName::CostPerPurchase,
        MetricName::CostPerInteraction,
        MetricName::PurchaseRoas,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MetricName::Ctr => "ctr",
            MetricName::Cpc => "cpc",
            MetricName::Cpm => "cpm",
            MetricName::CostPerPurchase => "cost_per_purchase",
            MetricName::CostPerInteraction => "cost_per_interaction",
            MetricName::PurchaseRoas => "purchase_roas",
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            MetricName::Ctr | MetricName::PurchaseRoas => MetricKind::Performance,
            MetricName::Cpc
            | MetricName::Cpm
            | MetricName::CostPerPurchase
            | MetricName::CostPerInteraction => MetricKind::Cost,
        }
    }

    /// Look up a metric by its canonical key. Only exact keys are accepted.
    pub fn parse(key: &str) -> Option<MetricName> {
        MetricName::ALL.into_iter().find(|metric| metric.key() == key)
    }

    /// Apply the static comparison for this metric.
    pub fn qualifies(self, measured: f64, threshold: f64) -> bool {
        match self.kind() {
            MetricKind::Cost => measured < threshold,
            MetricKind::Performance => measured > threshold,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MetricName {
    type Err = SuggestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricName::parse(s).ok_or_else(|| SuggestionError::InvalidMetricName(s.to_string()))
    }
}
