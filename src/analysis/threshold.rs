//! # Threshold Analyzer
//!
//! Every configured threshold must hold at once for an entity to qualify;
//! a partial match never does.

use serde::{Deserialize, Serialize};

use super::MetricName;
use crate::insights::MetricValues;
use crate::models::ThresholdConfig;

/// A metric that satisfied its threshold, as stored on a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifyingMetric {
    pub name: String,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThresholdAnalysis {
    pub qualifying: Vec<QualifyingMetric>,
    /// Thresholds that are set and non-zero
    pub configured: usize,
    /// Configured thresholds whose measurement satisfied them
    pub met: usize,
}

impl ThresholdAnalysis {
    pub fn all_conditions_met(&self) -> bool {
        self.configured > 0 && self.met == self.configured
    }
}

/// Compare a metric set against an account's thresholds.
///
/// Unconfigured metrics are ignored. A configured metric without a
/// measurement counts as configured but not met.
pub fn analyze(metrics: &MetricValues, config: &ThresholdConfig) -> ThresholdAnalysis {
    let mut analysis = ThresholdAnalysis::default();

    for metric in MetricName::ALL {
        let Some(threshold) = config.threshold_for(metric) else {
            continue;
        };
        analysis.configured += 1;

        let Some(value) = metrics.value(metric) else {
            continue;
        };
        if metric.qualifies(value, threshold) {
            analysis.met += 1;
            analysis.qualifying.push(QualifyingMetric {
                name: metric.key().to_string(),
                value,
                threshold,
            });
        }
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ctr: Option<f64>, cpc: Option<f64>) -> ThresholdConfig {
        ThresholdConfig {
            account_id: "act_1".into(),
            ctr,
            cpc,
            scale_percent: 20.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_configured_metric_qualifies() {
        let metrics = MetricValues {
            ctr: Some(0.03),
            ..Default::default()
        };

        let analysis = analyze(&metrics, &config(Some(0.02), None));

        assert!(analysis.all_conditions_met());
        assert_eq!(analysis.configured, 1);
        assert_eq!(
            analysis.qualifying,
            vec![QualifyingMetric {
                name: "ctr".into(),
                value: 0.03,
                threshold: 0.02,
            }]
        );
    }

    #[test]
    fn test_partial_match_never_qualifies() {
        // ctr satisfied, cpc above its ceiling
        let metrics = MetricValues {
            ctr: Some(0.03),
            cpc: Some(1.5),
            ..Default::default()
        };

        let analysis = analyze(&metrics, &config(Some(0.02), Some(1.0)));

        assert!(!analysis.all_conditions_met());
        assert_eq!(analysis.configured, 2);
        assert_eq!(analysis.met, 1);
        assert_eq!(analysis.qualifying.len(), 1);
        assert_eq!(analysis.qualifying[0].name, "ctr");
    }

    #[test]
    fn test_both_conditions_met() {
        let metrics = MetricValues {
            ctr: Some(0.03),
            cpc: Some(0.5),
            ..Default::default()
        };

        let analysis = analyze(&metrics, &config(Some(0.02), Some(1.0)));

        assert!(analysis.all_conditions_met());
        assert_eq!(analysis.qualifying.len(), 2);
    }

    #[test]
    fn test_missing_measurement_blocks_qualification() {
        let metrics = MetricValues {
            ctr: Some(0.03),
            ..Default::default()
        };

        let analysis = analyze(&metrics, &config(Some(0.02), Some(1.0)));

        assert_eq!(analysis.configured, 2);
        assert_eq!(analysis.met, 1);
        assert!(!analysis.all_conditions_met());
    }

    #[test]
    fn test_zero_thresholds_are_unconfigured() {
        let metrics = MetricValues {
            ctr: Some(0.03),
            cpc: Some(5.0),
            ..Default::default()
        };

        let analysis = analyze(&metrics, &config(Some(0.02), Some(0.0)));
        assert_eq!(analysis.configured, 1);
        assert!(analysis.all_conditions_met());

        let nothing = analyze(&metrics, &config(Some(0.0), None));
        assert_eq!(nothing.configured, 0);
        assert!(!nothing.all_conditions_met());
    }

    #[test]
    fn test_equal_to_threshold_does_not_qualify() {
        let metrics = MetricValues {
            ctr: Some(0.02),
            ..Default::default()
        };
        assert!(!analyze(&metrics, &config(Some(0.02), None)).all_conditions_met());
    }
}
