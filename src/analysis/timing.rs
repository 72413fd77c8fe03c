//! # Scale-Timing Gate
//!
//! Decides whether an entity is due for a scale before its metrics are looked
//! at: a first scale waits for the entity to age, a repeat scale waits out a
//! cool-down since the previous one.

use chrono::{DateTime, Utc};

use crate::models::ThresholdConfig;
use crate::models::ad_entity::Model as AdEntityModel;

/// Which timing rule admitted the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleWindow {
    Initial,
    Recurring,
}

/// Never scaled, age known, `init_scale_day` configured and reached.
pub fn meets_initial_scale_threshold(
    age_in_days: Option<i64>,
    last_scaled_at: Option<DateTime<Utc>>,
    config: &ThresholdConfig,
) -> bool {
    if last_scaled_at.is_some() {
        return false;
    }
    match (age_in_days, config.init_scale_days()) {
        (Some(age), Some(required)) => age >= required,
        _ => false,
    }
}

/// Scaled before, `recur_scale_day` configured and elapsed since that scale.
pub fn meets_recurring_scale_threshold(
    last_scaled_at: Option<DateTime<Utc>>,
    config: &ThresholdConfig,
    now: DateTime<Utc>,
) -> bool {
    match (last_scaled_at, config.recur_scale_days()) {
        (Some(at), Some(required)) => days_since(at, now) >= required,
        _ => false,
    }
}

/// Whole days elapsed between `at` and `now`.
pub fn days_since(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - at).num_days()
}

/// Apply the rule matching the entity's scale history.
pub fn scale_window(
    entity: &AdEntityModel,
    config: &ThresholdConfig,
    now: DateTime<Utc>,
) -> Option<ScaleWindow> {
    match entity.last_scaled_at_utc() {
        None => meets_initial_scale_threshold(entity.age_in_days(now), None, config)
            .then_some(ScaleWindow::Initial),
        Some(at) => {
            meets_recurring_scale_threshold(Some(at), config, now).then_some(ScaleWindow::Recurring)
        }
    }
}
