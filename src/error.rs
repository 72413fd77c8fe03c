//! # Error Handling
//!
//! Error taxonomy for the scaling pipeline. Each layer owns a `thiserror` enum;
//! [`PipelineError`] wraps them at the orchestration boundary so that a failure
//! can be attributed to one account or entity and recorded in a cycle report.

use thiserror::Error;

/// Failures turning one normalized report row into a performance record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("missing required field `{0}`")]
    MissingRequiredField(&'static str),
    #[error("row belongs to account `{row}` but report was requested for `{expected}`")]
    AccountMismatch { expected: String, row: String },
}

/// Stream-level ingestion failures. Row-level problems are counted, not raised.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("report fetch failed: {0}")]
    Fetch(String),
    #[error("report stream read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("report header row is malformed: {0}")]
    MalformedHeader(String),
    #[error("failed to persist record batch: {0}")]
    Storage(#[from] RepositoryError),
}

/// Validation failures raised by the suggestion lifecycle operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SuggestionError {
    #[error("budget must be positive, got {0}")]
    InvalidBudget(f64),
    #[error("unknown metric name `{0}`")]
    InvalidMetricName(String),
    #[error("cannot {action} a suggestion in status `{from}`")]
    InvalidTransition { from: String, action: &'static str },
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[source] sea_orm::DbErr),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl RepositoryError {
    /// Map a raw SeaORM error, classifying unique violations as conflicts.
    pub fn database_error(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            return Self::Conflict(error.to_string());
        }
        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::NotFound(record),
            sea_orm::DbErr::RecordNotUpdated => Self::NotFound("no row matched update".into()),
            other => Self::Database(other),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Errors from the external ad platform API.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform returned HTTP {status}: {body_snippet}")]
    Http { status: u16, body_snippet: String },
    #[error("platform transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid platform response: {0}")]
    InvalidResponse(String),
    #[error("report run {run_id} failed: {reason}")]
    ReportFailed { run_id: String, reason: String },
    #[error("report run {run_id} still running after {attempts} polls")]
    ReportTimedOut { run_id: String, attempts: u32 },
}

impl PlatformError {
    /// Whether retrying the same call later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformError::Http { status, .. } => *status == 429 || *status >= 500,
            PlatformError::Transport(err) => err.is_timeout() || err.is_connect(),
            PlatformError::ReportTimedOut { .. } => true,
            PlatformError::InvalidResponse(_) | PlatformError::ReportFailed { .. } => false,
        }
    }
}

/// Orchestration-level error; every per-account or per-entity failure becomes one of these.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error
        .code()
        .is_some_and(|code| code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code.as_ref()))
}
