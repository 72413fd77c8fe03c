//! # Insights Ingestion
//!
//! Turns bulk performance reports from the ad platform into stored
//! [`PerformanceRecord`]s: header normalization, row mapping, streaming batch
//! ingestion and the per-account sync that drives them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod csv;
pub mod header;
pub mod ingest;
pub mod mapper;
pub mod record;
pub mod source;
pub mod sync;

pub use header::{HeaderLayout, normalize_header};
pub use ingest::{IngestSummary, ReportIngestor};
pub use mapper::map_row;
pub use record::{MetricValues, PerformanceRecord};
pub use source::{HttpReportSource, ReportSource};
pub use sync::InsightSync;

/// Time granularity of imported reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportGrain {
    /// One row per ad set per day
    Daily,
    /// One all-time aggregate row per ad set
    #[default]
    Lifetime,
}

impl ReportGrain {
    pub const LIFETIME_KEY: &'static str = "lifetime";

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportGrain::Daily => "daily",
            ReportGrain::Lifetime => "lifetime",
        }
    }
}

impl fmt::Display for ReportGrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportGrain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportGrain::Daily),
            "lifetime" => Ok(ReportGrain::Lifetime),
            other => Err(format!("unknown report grain `{other}`")),
        }
    }
}
