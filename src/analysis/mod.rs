//! # Analysis
//!
//! Aggregation of stored performance records, the threshold rule and the
//! scale-timing gate. Everything here is pure.

pub mod aggregate;
pub mod metric;
pub mod threshold;
pub mod timing;

pub use metric::{MetricKind, MetricName};
pub use threshold::{QualifyingMetric, ThresholdAnalysis, analyze};
pub use timing::{
    ScaleWindow, meets_initial_scale_threshold, meets_recurring_scale_threshold, scale_window,
};
