//! # Insight Sync
//!
//! Per-account refresh: pull the entity list, run an insights report on the
//! platform, wait for it and stream the export through the ingestor.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};
use url::Url;

use super::ingest::{IngestSummary, ReportIngestor};
use super::source::ReportSource;
use crate::config::IngestConfig;
use crate::error::PipelineError;
use crate::platform::{AdPlatformClient, wait_for_report};
use crate::repositories::AdEntityStore;

pub struct InsightSync {
    platform: Arc<dyn AdPlatformClient>,
    source: Arc<dyn ReportSource>,
    entities: Arc<dyn AdEntityStore>,
    ingestor: ReportIngestor,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl InsightSync {
    pub fn new(
        platform: Arc<dyn AdPlatformClient>,
        source: Arc<dyn ReportSource>,
        entities: Arc<dyn AdEntityStore>,
        ingestor: ReportIngestor,
        config: &IngestConfig,
    ) -> Self {
        Self {
            platform,
            source,
            entities,
            ingestor,
            poll_interval: config.poll_interval(),
            max_poll_attempts: config.report_poll_max_attempts,
        }
    }

    /// Refresh entities and performance records for one account.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn sync_account(&self, account_id: &str) -> Result<IngestSummary, PipelineError> {
        let entities = self.platform.list_entities(account_id).await?;
        let synced = self
            .entities
            .sync_from_platform(account_id, entities)
            .await?;

        let run = self
            .platform
            .start_insights_report(account_id, self.ingestor.grain())
            .await?;
        wait_for_report(
            self.platform.as_ref(),
            &run,
            self.poll_interval,
            self.max_poll_attempts,
        )
        .await?;
        let url = self.platform.report_download_url(&run).await?;

        let summary = self.ingest_url(account_id, &url).await?;
        info!(
            entities = synced,
            run_id = %run,
            saved = summary.saved,
            parse_errors = summary.parse_errors,
            "Account insights synced"
        );
        Ok(summary)
    }

    /// Stream an already generated report into storage.
    pub async fn ingest_url(
        &self,
        account_id: &str,
        url: &Url,
    ) -> Result<IngestSummary, PipelineError> {
        let reader = self.source.open(url).await?;
        Ok(self.ingestor.ingest(account_id, reader).await?)
    }
}
