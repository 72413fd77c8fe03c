//! Configuration loading for the budget scaling service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `ADSCALE_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::insights::ReportGrain;

const ENV_PREFIX: &str = "ADSCALE_";
const REDACTED: &str = "[REDACTED]";

/// Application configuration derived from `ADSCALE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Report ingestion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct IngestConfig {
    /// Records per storage write
    #[serde(default = "default_ingest_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub grain: ReportGrain,
    /// Fixed wait between report status polls
    #[serde(default = "default_report_poll_interval_seconds")]
    pub report_poll_interval_seconds: u64,
    /// Polls before a still-running report counts as timed out
    #[serde(default = "default_report_poll_max_attempts")]
    pub report_poll_max_attempts: u32,
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
}

/// Ad platform API endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PlatformConfig {
    #[serde(default = "default_platform_api_base")]
    pub api_base: String,
    #[serde(default = "default_platform_api_version")]
    pub api_version: String,
    /// Host serving finished report exports
    #[serde(default = "default_platform_export_base")]
    pub export_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Recurring job parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SchedulerConfig {
    #[serde(default = "default_sync_interval_seconds")]
    pub sync_interval_seconds: u64,
    /// Upper bound of the random start offset, as a fraction of the interval
    #[serde(default = "default_jitter_pct_max")]
    pub jitter_pct_max: f64,
}

/// Chat webhook for new-suggestion notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NotificationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default = "default_notification_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            ingest: IngestConfig::default(),
            platform: PlatformConfig::default(),
            scheduler: SchedulerConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_ingest_batch_size(),
            grain: ReportGrain::default(),
            report_poll_interval_seconds: default_report_poll_interval_seconds(),
            report_poll_max_attempts: default_report_poll_max_attempts(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: default_platform_api_base(),
            api_version: default_platform_api_version(),
            export_base: default_platform_export_base(),
            access_token: None,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval_seconds: default_sync_interval_seconds(),
            jitter_pct_max: default_jitter_pct_max(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_seconds: default_notification_timeout_seconds(),
        }
    }
}

impl AppConfig {
    fn is_local_or_test(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.platform.access_token.is_some() {
            config.platform.access_token = Some(REDACTED.to_string());
        }
        // Chat webhook URLs embed their credential in the path
        if config.notifications.webhook_url.is_some() {
            config.notifications.webhook_url = Some(REDACTED.to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if settings are missing or out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_local_or_test() && self.platform.access_token.is_none() {
            return Err(ConfigError::MissingAccessToken);
        }

        self.ingest.validate()?;
        self.scheduler.validate(self.is_local_or_test())?;

        if let Some(url) = &self.notifications.webhook_url
            && !url.to_lowercase().starts_with("https://")
        {
            return Err(ConfigError::InvalidWebhookUrl);
        }
        if self.notifications.timeout_seconds == 0 {
            return Err(ConfigError::InvalidNotificationTimeout {
                value: self.notifications.timeout_seconds,
            });
        }

        Ok(())
    }
}

impl IngestConfig {
    /// Validate ingestion bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50_000).contains(&self.batch_size) {
            return Err(ConfigError::InvalidBatchSize {
                value: self.batch_size,
            });
        }
        if self.report_poll_max_attempts == 0 {
            return Err(ConfigError::InvalidPollAttempts {
                value: self.report_poll_max_attempts,
            });
        }
        if self.report_poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidPollInterval {
                value: self.report_poll_interval_seconds,
            });
        }
        if self.fetch_timeout_seconds == 0 {
            return Err(ConfigError::InvalidFetchTimeout {
                value: self.fetch_timeout_seconds,
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.report_poll_interval_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

impl SchedulerConfig {
    /// Validate scheduler configuration bounds.
    pub fn validate(&self, allow_short_intervals: bool) -> Result<(), ConfigError> {
        let minimum = if allow_short_intervals { 1 } else { 60 };
        if self.sync_interval_seconds < minimum {
            return Err(ConfigError::InvalidSyncInterval {
                value: self.sync_interval_seconds,
                minimum,
            });
        }

        if !(0.0..=1.0).contains(&self.jitter_pct_max) {
            return Err(ConfigError::InvalidSchedulerJitter {
                value: self.jitter_pct_max,
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgresql://localhost:5432/adscale".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_ingest_batch_size() -> usize {
    1000
}

fn default_report_poll_interval_seconds() -> u64 {
    10
}

fn default_report_poll_max_attempts() -> u32 {
    30
}

fn default_fetch_timeout_seconds() -> u64 {
    300
}

fn default_platform_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_platform_api_version() -> String {
    "v21.0".to_string()
}

fn default_platform_export_base() -> String {
    "https://www.facebook.com".to_string()
}

fn default_sync_interval_seconds() -> u64 {
    3600 // hourly
}

fn default_jitter_pct_max() -> f64 {
    0.1
}

fn default_notification_timeout_seconds() -> u64 {
    10
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("platform access token is missing; set ADSCALE_PLATFORM_ACCESS_TOKEN")]
    MissingAccessToken,
    #[error("invalid report grain '{value}'; expected 'daily' or 'lifetime'")]
    InvalidGrain { value: String },
    #[error("ingest batch size must be between 1 and 50000, got {value}")]
    InvalidBatchSize { value: usize },
    #[error("report poll attempts must be at least 1, got {value}")]
    InvalidPollAttempts { value: u32 },
    #[error("report poll interval must be at least 1 second, got {value}")]
    InvalidPollInterval { value: u64 },
    #[error("report fetch timeout must be positive, got {value}")]
    InvalidFetchTimeout { value: u64 },
    #[error("sync interval must be at least {minimum} seconds, got {value}")]
    InvalidSyncInterval { value: u64, minimum: u64 },
    #[error("scheduler jitter percentage must be between 0.0 and 1.0, got {value}")]
    InvalidSchedulerJitter { value: f64 },
    #[error("notification webhook URL must use https")]
    InvalidWebhookUrl,
    #[error("notification timeout must be positive, got {value}")]
    InvalidNotificationTimeout { value: u64 },
}

/// Loads configuration using layered `.env` files and `ADSCALE_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration. Process environment wins over files.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let mut text = |key: &str| layered.remove(key).filter(|v| !v.trim().is_empty());

        let profile = text("PROFILE").unwrap_or(profile_hint);
        let log_level = text("LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = text("LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url = text("DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = text("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = text("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        let grain = match text("INGEST_GRAIN") {
            Some(value) => value
                .parse::<ReportGrain>()
                .map_err(|_| ConfigError::InvalidGrain { value })?,
            None => ReportGrain::default(),
        };
        let ingest = IngestConfig {
            batch_size: text("INGEST_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ingest_batch_size),
            grain,
            report_poll_interval_seconds: text("INGEST_REPORT_POLL_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_report_poll_interval_seconds),
            report_poll_max_attempts: text("INGEST_REPORT_POLL_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_report_poll_max_attempts),
            fetch_timeout_seconds: text("INGEST_FETCH_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_fetch_timeout_seconds),
        };

        let platform = PlatformConfig {
            api_base: text("PLATFORM_API_BASE").unwrap_or_else(default_platform_api_base),
            api_version: text("PLATFORM_API_VERSION").unwrap_or_else(default_platform_api_version),
            export_base: text("PLATFORM_EXPORT_BASE")
                .unwrap_or_else(default_platform_export_base),
            access_token: text("PLATFORM_ACCESS_TOKEN").map(|v| v.trim().to_string()),
        };

        let scheduler = SchedulerConfig {
            sync_interval_seconds: text("SCHEDULER_SYNC_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_sync_interval_seconds),
            jitter_pct_max: text("SCHEDULER_JITTER_PCT_MAX")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_jitter_pct_max),
        };

        let notifications = NotificationConfig {
            webhook_url: text("NOTIFICATIONS_WEBHOOK_URL").map(|v| v.trim().to_string()),
            timeout_seconds: text("NOTIFICATIONS_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_notification_timeout_seconds),
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            ingest,
            platform,
            scheduler,
            notifications,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
