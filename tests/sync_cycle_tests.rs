//! Full sync cycles against a mocked ad platform and an in-memory database.

#[path = "test_utils/mod.rs"]
mod test_utils;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use adscale::config::{IngestConfig, PlatformConfig};
use adscale::insights::{HttpReportSource, InsightSync, ReportGrain, ReportIngestor};
use adscale::models::SuggestionStatus;
use adscale::notifications::{NotificationSink, NotifyError};
use adscale::pipeline::{SuggestionPipeline, SyncCycle};
use adscale::platform::{AdPlatformClient, GraphApiClient};
use adscale::repositories::{
    AdAccountRepository, AdEntityRepository, AdEntityStore, PerformanceRecordRepository,
    SuggestionRepository, SuggestionStore, ThresholdConfigRepository,
};
use adscale::suggestions::Suggestion;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::json;
use test_utils::{ctr_config, insert_account, insert_config, setup_test_db_arc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORT_CSV: &str = "\u{feff}Account ID,Campaign ID,Ad Set ID,Ad Set Name,Impressions,CTR (all),Amount spent (USD)\n\
1,c-1,as-1,Prospecting,1000,0.03,25.50\n\
1,c-1,as-2,Retargeting,800,0.01,12.00\n\
1,c-1,,Broken row,10,0.5,1\n";

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<Vec<Suggestion>>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, suggestions: &[Suggestion]) -> Result<(), NotifyError> {
        self.batches.lock().unwrap().push(suggestions.to_vec());
        Ok(())
    }
}

async fn mount_platform(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v21.0/act_1/campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v21.0/act_1/adsets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "as-1",
                    "name": "Prospecting",
                    "campaign_id": "c-1",
                    "daily_budget": "10000",
                    "start_time": "2024-01-01T00:00:00+0000",
                    "effective_status": "ACTIVE"
                },
                {
                    "id": "as-2",
                    "name": "Retargeting",
                    "campaign_id": "c-1",
                    "daily_budget": "5000",
                    "start_time": "2024-01-01T00:00:00+0000",
                    "effective_status": "ACTIVE"
                }
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v21.0/act_1/insights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"report_run_id": "run-9"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v21.0/run-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "async_status": "Job Completed",
            "async_percent_completion": 100
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ads/ads_insights/export_report/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REPORT_CSV))
        .mount(server)
        .await;
}

fn build_cycle(
    db: &Arc<DatabaseConnection>,
    server: &MockServer,
    sink: Arc<RecordingSink>,
) -> anyhow::Result<SyncCycle> {
    let ingest = IngestConfig {
        batch_size: 1,
        grain: ReportGrain::Lifetime,
        report_poll_interval_seconds: 0,
        report_poll_max_attempts: 3,
        fetch_timeout_seconds: 5,
    };
    let platform_config = PlatformConfig {
        api_base: server.uri(),
        api_version: "v21.0".into(),
        export_base: server.uri(),
        access_token: Some("test-token".into()),
    };
    let platform: Arc<dyn AdPlatformClient> = Arc::new(GraphApiClient::new(
        &platform_config,
        Duration::from_secs(5),
    )?);

    let entities = Arc::new(AdEntityRepository::new(db.clone()));
    let records = Arc::new(PerformanceRecordRepository::new(db.clone()));
    let sync = InsightSync::new(
        platform,
        Arc::new(HttpReportSource::new(Duration::from_secs(5))?),
        entities.clone(),
        ReportIngestor::new(records.clone(), ingest.batch_size, ingest.grain),
        &ingest,
    );
    let pipeline = SuggestionPipeline::new(
        Arc::new(ThresholdConfigRepository::new(db.clone())),
        entities,
        records,
        Arc::new(SuggestionRepository::new(db.clone())),
    );

    Ok(SyncCycle::new(
        Arc::new(AdAccountRepository::new(db.clone())),
        sync,
        pipeline,
        sink,
    ))
}

#[tokio::test]
async fn test_cycle_syncs_analyzes_and_notifies() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_platform(&server).await;
    let db = setup_test_db_arc().await?;
    insert_account(&db, "act_1").await?;
    insert_config(&db, ctr_config("act_1")).await?;

    let sink = Arc::new(RecordingSink::default());
    let cycle = build_cycle(&db, &server, sink.clone())?;

    let report = cycle.run_once().await;

    assert!(report.success, "unexpected errors: {:?}", report.errors);
    assert_eq!(report.accounts, 1);
    assert_eq!(report.records_saved, 2);
    assert_eq!(report.parse_errors, 1);
    assert_eq!(report.created, 1);
    assert_eq!(report.skipped.not_qualifying, 1);

    let entity = AdEntityRepository::new(db.clone())
        .find("as-1")
        .await?
        .expect("entity synced from platform");
    assert_eq!(entity.daily_budget, 10000.0);
    assert_eq!(entity.name, "Prospecting");

    let pending = SuggestionRepository::new(db.clone())
        .list("act_1", Some(SuggestionStatus::Pending))
        .await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].target_id, "as-1");
    assert_eq!(pending[0].budget_after_scale, 12000.0);

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].id, pending[0].id);
    Ok(())
}

#[tokio::test]
async fn test_repeat_cycle_updates_without_notifying() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_platform(&server).await;
    let db = setup_test_db_arc().await?;
    insert_account(&db, "act_1").await?;
    insert_config(&db, ctr_config("act_1")).await?;

    let sink = Arc::new(RecordingSink::default());
    let cycle = build_cycle(&db, &server, sink.clone())?;

    cycle.run_once().await;
    let second = cycle.run_once().await;

    assert!(second.success);
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(sink.batches.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_sync_is_reported_and_cycle_continues() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_platform(&server).await;
    let db = setup_test_db_arc().await?;
    insert_account(&db, "act_1").await?;
    // No mocks for act_2: every platform call answers 404.
    insert_account(&db, "act_2").await?;
    insert_config(&db, ctr_config("act_1")).await?;

    let sink = Arc::new(RecordingSink::default());
    let cycle = build_cycle(&db, &server, sink.clone())?;

    let report = cycle.run_once().await;

    assert!(!report.success);
    assert_eq!(report.accounts, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].account_id, "act_2");
    assert!(report.errors[0].entity_id.is_none());
    assert!(report.errors[0].message.contains("sync failed"));
    assert_eq!(report.created, 1);
    Ok(())
}
