//! Global tracing subscriber setup.

use std::any::type_name_of_val;
use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tracing::{Subscriber, warn};
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    filter::ParseError,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("invalid log level directive: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Output encoding for log lines. Anything other than `pretty` is JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    fn from_config(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("pretty") {
            OutputFormat::Pretty
        } else {
            OutputFormat::Json
        }
    }

    fn layer<S>(self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        match self {
            OutputFormat::Pretty => fmt::layer().pretty().boxed(),
            OutputFormat::Json => fmt::layer().json().boxed(),
        }
    }
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber once per process. Later calls are no-ops.
///
/// `RUST_LOG` takes precedence over `log_level`. Records emitted through the
/// `log` facade (sqlx, dotenvy) are forwarded into tracing.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    install(config).inspect_err(|_| TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst))
}

fn install(config: &AppConfig) -> Result<(), TelemetryInitError> {
    let bridge = forward_log_records();
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.log_level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(OutputFormat::from_config(&config.log_format).layer())
        .try_init()?;

    if let Err(err) = bridge {
        warn!(error = %err, "log facade records are not forwarded to tracing");
    }
    Ok(())
}

fn level_filter(directives: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(directives)
}

/// Route `log::` records into tracing. A bridge that is already in place counts
/// as success.
fn forward_log_records() -> Result<(), log::SetLoggerError> {
    match LogTracer::builder().with_max_level(LevelFilter::Trace).init() {
        Ok(()) => Ok(()),
        Err(_) if type_name_of_val(log::logger()).contains("LogTracer") => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = AppConfig {
            log_format: "pretty".into(),
            ..Default::default()
        };
        init_tracing(&config).unwrap();
        init_tracing(&config).unwrap();
    }

    #[test]
    fn test_unknown_format_falls_back_to_json() {
        assert_eq!(OutputFormat::from_config("Pretty "), OutputFormat::Pretty);
        assert_eq!(OutputFormat::from_config("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config("logfmt"), OutputFormat::Json);
    }

    #[test]
    fn test_level_directives_are_validated() {
        assert!(level_filter("info,sqlx=warn,adscale=debug").is_ok());
        assert!(level_filter("sqlx=loud").is_err());
    }
}
