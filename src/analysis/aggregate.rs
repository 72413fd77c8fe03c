//! # Aggregation Engine
//!
//! Collapses stored records into the metric set that is compared against
//! thresholds. Ad sets use their latest record as-is; campaigns roll up the
//! records of their ad sets.

use crate::insights::{MetricValues, PerformanceRecord};
use crate::insights::mapper::ratio;

/// Latest-record mode: the most recent record, used directly.
pub fn latest(records: &[PerformanceRecord]) -> Option<MetricValues> {
    records
        .iter()
        .max_by_key(|record| record.updated_at)
        .map(|record| record.metrics.clone())
}

/// Roll-up mode: combine child records into one parent-level metric set.
///
/// Volume metrics are summed; rate metrics are impression-weighted over the
/// records with positive impressions; ratios are recomputed from the sums.
/// Returns `None` when no record has positive impressions.
pub fn roll_up(records: &[PerformanceRecord]) -> Option<MetricValues> {
    let weighted: Vec<&MetricValues> = records
        .iter()
        .map(|record| &record.metrics)
        .filter(|metrics| metrics.impressions.is_some_and(|imp| imp > 0.0))
        .collect();
    if weighted.is_empty() {
        return None;
    }

    let all = || records.iter().map(|record| &record.metrics);
    let sum = |field: fn(&MetricValues) -> Option<f64>| sum_present(all().map(field));
    let weighted_avg = |field: fn(&MetricValues) -> Option<f64>| {
        impression_weighted(weighted.iter().copied(), field)
    };

    let impressions = sum(|m| m.impressions);
    let clicks = sum(|m| m.clicks);
    let link_clicks = sum(|m| m.link_clicks);
    let spend = sum(|m| m.spend);
    let reach = sum(|m| m.reach);
    let purchases = sum(|m| m.purchases);
    let conversion_value = sum(|m| m.purchases_conversion_value);
    let post_engagement = sum(|m| m.post_engagement);

    let click_base = link_clicks.filter(|c| *c > 0.0).or(clicks);

    Some(MetricValues {
        impressions,
        clicks,
        link_clicks,
        spend,
        reach,
        frequency: ratio(impressions, reach).or_else(|| weighted_avg(|m| m.frequency)),
        ctr: weighted_avg(|m| m.ctr),
        unique_ctr: weighted_avg(|m| m.unique_ctr),
        link_ctr: weighted_avg(|m| m.link_ctr),
        cpc: ratio(spend, click_base).or_else(|| weighted_avg(|m| m.cpc)),
        cpm: ratio(spend, impressions)
            .map(|per_impression| per_impression * 1000.0)
            .or_else(|| weighted_avg(|m| m.cpm)),
        cost_per_link_click: ratio(spend, link_clicks)
            .or_else(|| weighted_avg(|m| m.cost_per_link_click)),
        cost_per_unique_click: weighted_avg(|m| m.cost_per_unique_click),
        purchase_roas: ratio(conversion_value, spend)
            .or_else(|| weighted_avg(|m| m.purchase_roas)),
        purchases,
        purchases_conversion_value: conversion_value,
        post_engagement,
        video_plays: sum(|m| m.video_plays),
        cost_per_purchase: ratio(spend, purchases),
        cost_per_interaction: ratio(spend, post_engagement),
    })
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, value| Some(acc.unwrap_or(0.0) + value))
}

/// `Σ(metric × impressions) / Σ impressions` over records reporting the metric.
fn impression_weighted<'a>(
    records: impl Iterator<Item = &'a MetricValues>,
    field: fn(&MetricValues) -> Option<f64>,
) -> Option<f64> {
    let (weighted_sum, weight) = records
        .filter_map(|metrics| Some((field(metrics)?, metrics.impressions?)))
        .filter(|(_, impressions)| *impressions > 0.0)
        .fold((0.0, 0.0), |(sum, weight), (value, impressions)| {
            (sum + value * impressions, weight + impressions)
        });
    (weight > 0.0).then(|| weighted_sum / weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(ad_set: &str, metrics: MetricValues) -> PerformanceRecord {
        PerformanceRecord {
            account_id: "act_1".into(),
            campaign_id: "c-1".into(),
            ad_set_id: ad_set.into(),
            grain_key: "lifetime".into(),
            ad_set_name: None,
            campaign_name: None,
            reporting_starts: None,
            reporting_ends: None,
            metrics,
            updated_at: None,
        }
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value present");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_ctr_is_impression_weighted() {
        let records = vec![
            record(
                "a",
                MetricValues {
                    impressions: Some(100.0),
                    ctr: Some(0.02),
                    ..Default::default()
                },
            ),
            record(
                "b",
                MetricValues {
                    impressions: Some(300.0),
                    ctr: Some(0.04),
                    ..Default::default()
                },
            ),
        ];

        let rolled = roll_up(&records).unwrap();

        approx(rolled.ctr, 0.035);
        approx(rolled.impressions, 400.0);
    }

    #[test]
    fn test_records_without_impressions_carry_no_weight() {
        let records = vec![
            record(
                "a",
                MetricValues {
                    impressions: Some(200.0),
                    ctr: Some(0.05),
                    spend: Some(10.0),
                    ..Default::default()
                },
            ),
            record(
                "b",
                MetricValues {
                    impressions: Some(0.0),
                    ctr: Some(0.9),
                    spend: Some(5.0),
                    ..Default::default()
                },
            ),
            record(
                "c",
                MetricValues {
                    ctr: Some(0.9),
                    ..Default::default()
                },
            ),
        ];

        let rolled = roll_up(&records).unwrap();

        approx(rolled.ctr, 0.05);
        approx(rolled.spend, 15.0);
    }

    #[test]
    fn test_derived_ratios_come_from_sums() {
        let records = vec![
            record(
                "a",
                MetricValues {
                    impressions: Some(1000.0),
                    reach: Some(400.0),
                    spend: Some(20.0),
                    clicks: Some(30.0),
                    link_clicks: Some(10.0),
                    purchases: Some(2.0),
                    purchases_conversion_value: Some(60.0),
                    ..Default::default()
                },
            ),
            record(
                "b",
                MetricValues {
                    impressions: Some(3000.0),
                    reach: Some(1600.0),
                    spend: Some(60.0),
                    clicks: Some(50.0),
                    link_clicks: Some(30.0),
                    purchases: Some(2.0),
                    purchases_conversion_value: Some(100.0),
                    ..Default::default()
                },
            ),
        ];

        let rolled = roll_up(&records).unwrap();

        approx(rolled.frequency, 2.0);
        approx(rolled.cpc, 2.0);
        approx(rolled.cpm, 20.0);
        approx(rolled.cost_per_purchase, 20.0);
        approx(rolled.purchase_roas, 2.0);
        assert_eq!(rolled.cost_per_interaction, None);
    }

    #[test]
    fn test_cpc_falls_back_to_all_clicks() {
        let records = vec![record(
            "a",
            MetricValues {
                impressions: Some(100.0),
                spend: Some(9.0),
                clicks: Some(3.0),
                ..Default::default()
            },
        )];

        approx(roll_up(&records).unwrap().cpc, 3.0);
    }

    #[test]
    fn test_roll_up_without_impressions_is_none() {
        let records = vec![record(
            "a",
            MetricValues {
                impressions: Some(0.0),
                spend: Some(4.0),
                ..Default::default()
            },
        )];
        assert_eq!(roll_up(&records), None);
        assert_eq!(roll_up(&[]), None);
    }

    #[test]
    fn test_latest_picks_most_recent_record() {
        let now = Utc::now();
        let mut older = record(
            "a",
            MetricValues {
                ctr: Some(0.01),
                ..Default::default()
            },
        );
        older.updated_at = Some(now - Duration::days(1));
        let mut newer = record(
            "a",
            MetricValues {
                ctr: Some(0.03),
                ..Default::default()
            },
        );
        newer.updated_at = Some(now);

        let picked = latest(&[newer, older]).unwrap();
        assert_eq!(picked.ctr, Some(0.03));
        assert_eq!(latest(&[]), None);
    }
}
