//! Maps one normalized report row into a [`PerformanceRecord`].

use std::collections::HashMap;

use super::ReportGrain;
use super::record::{MetricValues, PerformanceRecord};
use crate::error::MappingError;
use crate::models::ad_account::strip_account_prefix;

/// Build a record from a row keyed by canonical header keys.
///
/// `account_id`, `campaign_id` and `ad_set_id` must be present and non-empty.
/// Numeric columns are parsed permissively; anything missing or unparseable
/// stays `None`. The record is attributed to `owner_account_id`, and a row
/// reporting a different account is rejected.
pub fn map_row(
    row: &HashMap<String, String>,
    owner_account_id: &str,
    grain: ReportGrain,
) -> Result<PerformanceRecord, MappingError> {
    let row_account = required(row, "account_id")?;
    let campaign_id = required(row, "campaign_id")?;
    let ad_set_id = required(row, "ad_set_id")?;

    if strip_account_prefix(row_account) != strip_account_prefix(owner_account_id) {
        return Err(MappingError::AccountMismatch {
            expected: owner_account_id.to_string(),
            row: row_account.to_string(),
        });
    }

    let reporting_starts = text(row, "reporting_starts");
    let grain_key = match grain {
        ReportGrain::Lifetime => ReportGrain::LIFETIME_KEY.to_string(),
        ReportGrain::Daily => text(row, "day")
            .or_else(|| reporting_starts.clone())
            .ok_or(MappingError::MissingRequiredField("day"))?,
    };

    let number = |key: &str| row.get(key).and_then(|raw| parse_number(raw));

    let mut metrics = MetricValues {
        impressions: number("impressions"),
        clicks: number("clicks"),
        link_clicks: number("link_clicks"),
        spend: number("spend"),
        reach: number("reach"),
        frequency: number("frequency"),
        ctr: number("ctr"),
        unique_ctr: number("unique_ctr"),
        link_ctr: number("link_ctr"),
        cpc: number("cpc"),
        cpm: number("cpm"),
        cost_per_link_click: number("cost_per_link_click"),
        cost_per_unique_click: number("cost_per_unique_click"),
        purchase_roas: number("purchase_roas"),
        purchases: number("purchases"),
        purchases_conversion_value: number("purchases_conversion_value"),
        post_engagement: number("post_engagement"),
        video_plays: number("video_plays"),
        cost_per_purchase: None,
        cost_per_interaction: None,
    };
    metrics.cost_per_purchase = ratio(metrics.spend, metrics.purchases);
    metrics.cost_per_interaction = ratio(metrics.spend, metrics.post_engagement);

    Ok(PerformanceRecord {
        account_id: owner_account_id.to_string(),
        campaign_id: campaign_id.to_string(),
        ad_set_id: ad_set_id.to_string(),
        grain_key,
        ad_set_name: text(row, "ad_set_name"),
        campaign_name: text(row, "campaign_name"),
        reporting_starts,
        reporting_ends: text(row, "reporting_ends"),
        metrics,
        updated_at: None,
    })
}

/// Parse a report cell, tolerating currency symbols, thousands separators and
/// percent signs. Empty cells, `-` and garbage yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !ch.is_whitespace() && !matches!(ch, '$' | '€' | '£' | '¥' | '₫' | ',' | '%'))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// `numerator / denominator` when both are reported and the divisor is non-zero.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

fn required<'a>(
    row: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, MappingError> {
    row.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(MappingError::MissingRequiredField(key))
}

fn text(row: &HashMap<String, String>, key: &str) -> Option<String> {
    row.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
