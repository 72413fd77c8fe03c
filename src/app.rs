//! Process wiring: builds the stores, platform client and services from the
//! loaded configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::AppConfig;
use crate::insights::{HttpReportSource, InsightSync, ReportIngestor};
use crate::notifications::{NoopNotifier, NotificationSink, WebhookNotifier};
use crate::pipeline::{SuggestionPipeline, SyncCycle};
use crate::platform::{AdPlatformClient, GraphApiClient};
use crate::repositories::{
    AdAccountRepository, AdEntityRepository, PerformanceRecordRepository, SuggestionRepository,
    ThresholdConfigRepository,
};
use crate::suggestions::SuggestionService;

/// Long-lived services shared by the CLI commands and the scheduler.
pub struct Services {
    pub cycle: Arc<SyncCycle>,
    pub suggestions: SuggestionService,
}

impl Services {
    pub fn build(config: &AppConfig, db: Arc<DatabaseConnection>) -> Result<Self> {
        let platform: Arc<dyn AdPlatformClient> = Arc::new(
            GraphApiClient::new(&config.platform, config.ingest.fetch_timeout())
                .context("failed to build platform client")?,
        );
        Self::with_platform(config, db, platform)
    }

    /// Same as [`Services::build`] with a caller-supplied platform client.
    pub fn with_platform(
        config: &AppConfig,
        db: Arc<DatabaseConnection>,
        platform: Arc<dyn AdPlatformClient>,
    ) -> Result<Self> {
        let accounts = Arc::new(AdAccountRepository::new(db.clone()));
        let entities = Arc::new(AdEntityRepository::new(db.clone()));
        let records = Arc::new(PerformanceRecordRepository::new(db.clone()));
        let thresholds = Arc::new(ThresholdConfigRepository::new(db.clone()));
        let suggestions = Arc::new(SuggestionRepository::new(db));

        let source = Arc::new(
            HttpReportSource::new(config.ingest.fetch_timeout())
                .context("failed to build report source")?,
        );
        let ingestor = ReportIngestor::new(
            records.clone(),
            config.ingest.batch_size,
            config.ingest.grain,
        );
        let sync = InsightSync::new(
            platform.clone(),
            source,
            entities.clone(),
            ingestor,
            &config.ingest,
        );
        let pipeline = SuggestionPipeline::new(
            thresholds,
            entities,
            records,
            suggestions.clone(),
        );

        let notifier = build_notifier(config)?;
        let cycle = Arc::new(SyncCycle::new(accounts, sync, pipeline, notifier));
        let suggestions = SuggestionService::new(suggestions, platform);

        Ok(Self { cycle, suggestions })
    }
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn NotificationSink>> {
    match &config.notifications.webhook_url {
        Some(url) => {
            let timeout = std::time::Duration::from_secs(config.notifications.timeout_seconds);
            let notifier =
                WebhookNotifier::new(url, timeout).context("invalid notification webhook")?;
            info!("Suggestion notifications enabled");
            Ok(Arc::new(notifier))
        }
        None => Ok(Arc::new(NoopNotifier)),
    }
}
