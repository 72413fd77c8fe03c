//! # adscale
//!
//! Budget-scaling suggestion service: imports ad performance reports,
//! compares them against per-account thresholds and keeps one pending scale
//! suggestion per qualifying ad set or campaign for an operator to approve.

pub mod analysis;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod insights;
pub mod models;
pub mod notifications;
pub mod pipeline;
pub mod platform;
pub mod repositories;
pub mod scheduler;
pub mod suggestions;
pub mod telemetry;
pub use migration;
