//! Graph-style marketing API client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{AdPlatformClient, PlatformEntity, ReportRunId, ReportRunStatus};
use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::insights::ReportGrain;
use crate::models::TargetType;
use crate::models::ad_account::strip_account_prefix;

const INSIGHT_FIELDS: &str = "account_id,campaign_id,campaign_name,adset_id,adset_name,\
impressions,clicks,inline_link_clicks,spend,reach,frequency,ctr,unique_ctr,\
inline_link_click_ctr,cpc,cpm,cost_per_inline_link_click,cost_per_unique_click,\
purchase_roas,actions,action_values";

const ADSET_FIELDS: &str = "id,name,campaign_id,daily_budget,start_time,effective_status";
const CAMPAIGN_FIELDS: &str = "id,name,daily_budget,start_time,effective_status";

const BODY_SNIPPET_LIMIT: usize = 256;
const PAGE_LIMIT: &str = "500";
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct ReportRunResponse {
    report_run_id: String,
}

#[derive(Debug, Deserialize)]
struct ReportStatusResponse {
    async_status: String,
    #[serde(default)]
    async_percent_completion: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntityNode {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    campaign_id: Option<String>,
    /// Minor currency units, sent as a string
    #[serde(default)]
    daily_budget: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    effective_status: Option<String>,
}

impl EntityNode {
    fn into_entity(self, entity_type: TargetType) -> PlatformEntity {
        PlatformEntity {
            daily_budget: self
                .daily_budget
                .and_then(|budget| budget.trim().parse::<f64>().ok())
                .filter(|budget| *budget > 0.0),
            start_time: self.start_time.as_deref().and_then(parse_platform_time),
            active: self.effective_status.as_deref() == Some("ACTIVE"),
            campaign_id: match entity_type {
                TargetType::Adset => self.campaign_id,
                TargetType::Campaign => None,
            },
            id: self.id,
            name: self.name,
            entity_type,
        }
    }
}

pub struct GraphApiClient {
    client: Client,
    api_base: String,
    api_version: String,
    export_base: String,
    access_token: String,
}

impl GraphApiClient {
    pub fn new(config: &PlatformConfig, timeout: Duration) -> Result<Self, PlatformError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            export_base: config.export_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().unwrap_or_default(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.api_base, self.api_version, path)
    }

    async fn check(response: Response) -> Result<Value, PlatformError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PlatformError::Http {
                status: status.as_u16(),
                body_snippet: body.chars().take(BODY_SNIPPET_LIMIT).collect(),
            });
        }
        serde_json::from_str(&body)
            .map_err(|err| PlatformError::InvalidResponse(format!("malformed JSON body: {err}")))
    }

    fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, PlatformError> {
        serde_json::from_value(value).map_err(|err| PlatformError::InvalidResponse(err.to_string()))
    }

    /// Walk a paged edge, following `paging.next` up to [`MAX_PAGES`].
    async fn fetch_entities(
        &self,
        account_id: &str,
        edge: &str,
        fields: &str,
        entity_type: TargetType,
    ) -> Result<Vec<PlatformEntity>, PlatformError> {
        let path = format!("act_{}/{edge}", strip_account_prefix(account_id));
        let mut request: RequestBuilder = self
            .client
            .get(self.endpoint(&path))
            .query(&[("fields", fields), ("limit", PAGE_LIMIT)]);
        let mut entities = Vec::new();

        for _ in 0..MAX_PAGES {
            let response = request.bearer_auth(&self.access_token).send().await?;
            let page: Page<EntityNode> = Self::decode(Self::check(response).await?)?;
            entities.extend(page.data.into_iter().map(|node| node.into_entity(entity_type)));

            match page.paging.and_then(|paging| paging.next) {
                Some(next) => request = self.client.get(next),
                None => return Ok(entities),
            }
        }

        warn!(edge, pages = MAX_PAGES, "Entity listing truncated at page limit");
        Ok(entities)
    }
}

/// Platform timestamps look like `2024-05-01T10:00:00+0000`.
fn parse_platform_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Map the API's textual run state.
fn parse_run_status(status: &str, percent: Option<u8>) -> ReportRunStatus {
    match status {
        "Job Completed" => ReportRunStatus::Completed,
        "Job Failed" | "Job Skipped" => ReportRunStatus::Failed {
            reason: status.to_string(),
        },
        _ => ReportRunStatus::Running {
            percent: percent.unwrap_or(0).min(100),
        },
    }
}

/// Budgets are sent in minor currency units as integers.
fn budget_param(budget: f64) -> String {
    format!("{}", budget.round() as i64)
}

#[async_trait]
impl AdPlatformClient for GraphApiClient {
    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn list_entities(&self, account_id: &str) -> Result<Vec<PlatformEntity>, PlatformError> {
        let mut entities = self
            .fetch_entities(account_id, "campaigns", CAMPAIGN_FIELDS, TargetType::Campaign)
            .await?;
        entities.extend(
            self.fetch_entities(account_id, "adsets", ADSET_FIELDS, TargetType::Adset)
                .await?,
        );
        debug!(count = entities.len(), "Listed platform entities");
        Ok(entities)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn start_insights_report(
        &self,
        account_id: &str,
        grain: ReportGrain,
    ) -> Result<ReportRunId, PlatformError> {
        let url = self.endpoint(&format!("act_{}/insights", strip_account_prefix(account_id)));
        let (date_preset, time_increment) = match grain {
            ReportGrain::Lifetime => ("maximum", "all_days"),
            ReportGrain::Daily => ("last_30d", "1"),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("level", "adset"),
                ("fields", INSIGHT_FIELDS),
                ("date_preset", date_preset),
                ("time_increment", time_increment),
            ])
            .send()
            .await?;

        let run: ReportRunResponse = Self::decode(Self::check(response).await?)?;
        info!(run_id = %run.report_run_id, "Started insights report run");
        Ok(ReportRunId(run.report_run_id))
    }

    async fn report_run_status(&self, run: &ReportRunId) -> Result<ReportRunStatus, PlatformError> {
        let response = self
            .client
            .get(self.endpoint(&run.0))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "async_status,async_percent_completion")])
            .send()
            .await?;

        let status: ReportStatusResponse = Self::decode(Self::check(response).await?)?;
        Ok(parse_run_status(
            &status.async_status,
            status.async_percent_completion,
        ))
    }

    async fn report_download_url(&self, run: &ReportRunId) -> Result<Url, PlatformError> {
        let base = format!("{}/ads/ads_insights/export_report/", self.export_base);
        Url::parse_with_params(
            &base,
            &[
                ("report_run_id", run.0.as_str()),
                ("format", "csv"),
                ("access_token", self.access_token.as_str()),
            ],
        )
        .map_err(|err| PlatformError::InvalidResponse(format!("invalid export URL: {err}")))
    }

    #[instrument(skip(self), fields(target_type = %target_type, entity_id = %entity_id))]
    async fn update_budget(
        &self,
        target_type: TargetType,
        entity_id: &str,
        new_budget: f64,
    ) -> Result<(), PlatformError> {
        let response = self
            .client
            .post(self.endpoint(entity_id))
            .bearer_auth(&self.access_token)
            .query(&[("daily_budget", budget_param(new_budget))])
            .send()
            .await?;

        let body = Self::check(response).await?;
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(PlatformError::InvalidResponse(format!(
                "{target_type} {entity_id} budget update was not acknowledged"
            )));
        }

        debug!(%target_type, new_budget, "Budget updated on platform");
        Ok(())
    }
}
