//! End-to-end analysis runs over seeded entities, records and suggestions.

#[path = "test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;

use adscale::analysis::QualifyingMetric;
use adscale::error::RepositoryError;
use adscale::insights::{MetricValues, PerformanceRecord};
use adscale::models::{SuggestionStatus, ThresholdConfig};
use adscale::pipeline::SuggestionPipeline;
use adscale::repositories::{
    AdEntityRepository, PerformanceRecordRepository, PerformanceRecordStore, SuggestionRepository,
    SuggestionStore, ThresholdConfigRepository,
};
use adscale::suggestions::{ScaleProposal, Suggestion, approve_suggestion, create_suggestion};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use test_utils::{EntitySeed, ctr_config, insert_config, insert_entity, setup_test_db_arc};
use uuid::Uuid;

fn ad_set_record(ad_set: &str, campaign: &str, impressions: f64, ctr: f64) -> PerformanceRecord {
    PerformanceRecord {
        account_id: "act_1".into(),
        campaign_id: campaign.into(),
        ad_set_id: ad_set.into(),
        grain_key: "lifetime".into(),
        ad_set_name: None,
        campaign_name: None,
        reporting_starts: None,
        reporting_ends: None,
        metrics: MetricValues {
            impressions: Some(impressions),
            ctr: Some(ctr),
            ..Default::default()
        },
        updated_at: None,
    }
}

fn pipeline_with(
    db: &Arc<DatabaseConnection>,
    suggestions: Arc<dyn SuggestionStore>,
) -> SuggestionPipeline {
    SuggestionPipeline::new(
        Arc::new(ThresholdConfigRepository::new(db.clone())),
        Arc::new(AdEntityRepository::new(db.clone())),
        Arc::new(PerformanceRecordRepository::new(db.clone())),
        suggestions,
    )
}

fn pipeline(db: &Arc<DatabaseConnection>) -> SuggestionPipeline {
    pipeline_with(db, Arc::new(SuggestionRepository::new(db.clone())))
}

async fn save_records(
    db: &Arc<DatabaseConnection>,
    records: Vec<PerformanceRecord>,
) -> anyhow::Result<()> {
    PerformanceRecordRepository::new(db.clone())
        .save_batch(records)
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_qualifying_ad_set_gets_one_pending_suggestion() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    insert_entity(&db, EntitySeed::ad_set("as-1", "act_1", "c-1")).await?;
    insert_config(&db, ctr_config("act_1")).await?;
    save_records(&db, vec![ad_set_record("as-1", "c-1", 1000.0, 0.03)]).await?;

    let report = pipeline(&db).analyze_account("act_1", Utc::now()).await?;

    assert_eq!(report.entities, 1);
    assert_eq!(report.created.len(), 1);
    assert!(report.errors.is_empty());

    let created = &report.created[0];
    assert_eq!(created.status, SuggestionStatus::Pending);
    assert_eq!(created.metrics_exceeded_count, 1);
    assert_eq!(created.budget, 100.0);
    assert_eq!(created.budget_after_scale, 120.0);
    assert_eq!(
        created.metrics,
        vec![QualifyingMetric {
            name: "ctr".into(),
            value: 0.03,
            threshold: 0.02,
        }]
    );

    let stored = SuggestionRepository::new(db.clone())
        .find_pending_by_target("as-1")
        .await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, created.id);
    Ok(())
}

#[tokio::test]
async fn test_second_run_refreshes_instead_of_duplicating() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    insert_entity(&db, EntitySeed::ad_set("as-1", "act_1", "c-1")).await?;
    insert_config(&db, ctr_config("act_1")).await?;
    save_records(&db, vec![ad_set_record("as-1", "c-1", 1000.0, 0.03)]).await?;

    let pipeline = pipeline(&db);
    let first = pipeline.analyze_account("act_1", Utc::now()).await?;
    let original_id = first.created[0].id;

    save_records(&db, vec![ad_set_record("as-1", "c-1", 2000.0, 0.05)]).await?;
    let second = pipeline.analyze_account("act_1", Utc::now()).await?;

    assert!(second.created.is_empty());
    assert_eq!(second.updated, 1);

    let pending = SuggestionRepository::new(db.clone())
        .find_pending_by_target("as-1")
        .await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, original_id);
    assert_eq!(pending[0].metrics[0].value, 0.05);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_pending_suggestions_collapse_to_newest() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    let entity = insert_entity(&db, EntitySeed::ad_set("as-1", "act_1", "c-1")).await?;
    let config = ctr_config("act_1");
    insert_config(&db, config.clone()).await?;
    save_records(&db, vec![ad_set_record("as-1", "c-1", 1000.0, 0.03)]).await?;

    let repo = SuggestionRepository::new(db.clone());
    let now = Utc::now();
    let mut ids = Vec::new();
    for hours_ago in [3, 1, 2] {
        let suggestion = create_suggestion(
            &entity,
            ScaleProposal::new(&entity, &config, Vec::new()),
            now - Duration::hours(hours_ago),
        )?;
        repo.insert(&suggestion).await?;
        ids.push(suggestion.id);
    }
    let newest = ids[1];

    let report = pipeline(&db).analyze_account("act_1", now).await?;

    assert_eq!(report.updated, 1);
    assert_eq!(report.duplicates_deleted, 2);
    let pending = repo.find_pending_by_target("as-1").await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, newest);
    assert_eq!(pending[0].metrics_exceeded_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_terminal_suggestion_is_never_refreshed() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    let entity = insert_entity(&db, EntitySeed::ad_set("as-1", "act_1", "c-1")).await?;
    let config = ctr_config("act_1");
    insert_config(&db, config.clone()).await?;
    save_records(&db, vec![ad_set_record("as-1", "c-1", 1000.0, 0.03)]).await?;

    let repo = SuggestionRepository::new(db.clone());
    let mut approved = create_suggestion(
        &entity,
        ScaleProposal::new(&entity, &config, Vec::new()),
        Utc::now() - Duration::days(1),
    )?;
    approve_suggestion(&mut approved, Utc::now())?;
    repo.insert(&approved).await?;

    let report = pipeline(&db).analyze_account("act_1", Utc::now()).await?;

    assert_eq!(report.created.len(), 1);
    assert_ne!(report.created[0].id, approved.id);
    let untouched = repo.find(approved.id).await?.unwrap();
    assert_eq!(untouched.status, SuggestionStatus::Approved);
    assert_eq!(untouched.metrics_exceeded_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_timing_gate_skips_recent_and_young_entities() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    let mut recently_scaled = EntitySeed::ad_set("as-1", "act_1", "c-1");
    recently_scaled.last_scaled_at = Some(Utc::now() - Duration::days(2));
    insert_entity(&db, recently_scaled).await?;
    let mut brand_new = EntitySeed::ad_set("as-2", "act_1", "c-1");
    brand_new.age_days = Some(0);
    insert_entity(&db, brand_new).await?;
    insert_config(&db, ctr_config("act_1")).await?;
    save_records(
        &db,
        vec![
            ad_set_record("as-1", "c-1", 1000.0, 0.03),
            ad_set_record("as-2", "c-1", 1000.0, 0.03),
        ],
    )
    .await?;

    let report = pipeline(&db).analyze_account("act_1", Utc::now()).await?;

    assert_eq!(report.skipped.timing, 2);
    assert!(report.created.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_account_without_thresholds_is_skipped() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    insert_entity(&db, EntitySeed::ad_set("as-1", "act_1", "c-1")).await?;
    insert_entity(&db, EntitySeed::ad_set("as-2", "act_1", "c-1")).await?;
    save_records(&db, vec![ad_set_record("as-1", "c-1", 1000.0, 0.03)]).await?;

    let pipeline = pipeline(&db);
    let report = pipeline.analyze_account("act_1", Utc::now()).await?;
    assert_eq!(report.skipped.no_config, 2);

    insert_config(
        &db,
        ThresholdConfig {
            account_id: "act_1".into(),
            ctr: Some(0.0),
            scale_percent: 20.0,
            ..Default::default()
        },
    )
    .await?;
    let report = pipeline.analyze_account("act_1", Utc::now()).await?;
    assert_eq!(report.skipped.no_config, 2);
    assert!(report.created.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_records_and_partial_matches_are_skipped() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    insert_entity(&db, EntitySeed::ad_set("as-1", "act_1", "c-1")).await?;
    insert_entity(&db, EntitySeed::ad_set("as-2", "act_1", "c-1")).await?;
    let mut config = ctr_config("act_1");
    config.cpc = Some(1.0);
    insert_config(&db, config).await?;
    // as-2 beats ctr but reports no cpc
    save_records(&db, vec![ad_set_record("as-2", "c-1", 1000.0, 0.03)]).await?;

    let report = pipeline(&db).analyze_account("act_1", Utc::now()).await?;

    assert_eq!(report.skipped.no_data, 1);
    assert_eq!(report.skipped.not_qualifying, 1);
    assert!(report.created.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_campaign_rolls_up_its_ad_sets() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    insert_entity(&db, EntitySeed::campaign("c-1", "act_1")).await?;
    insert_config(&db, ctr_config("act_1")).await?;
    // (100 * 0.01 + 300 * 0.03) / 400 = 0.025
    save_records(
        &db,
        vec![
            ad_set_record("as-1", "c-1", 100.0, 0.01),
            ad_set_record("as-2", "c-1", 300.0, 0.03),
        ],
    )
    .await?;

    let report = pipeline(&db).analyze_account("act_1", Utc::now()).await?;

    assert_eq!(report.created.len(), 1);
    let suggestion = &report.created[0];
    assert_eq!(suggestion.target_id, "c-1");
    assert_eq!(suggestion.budget_after_scale, 600.0);
    assert!((suggestion.metrics[0].value - 0.025).abs() < 1e-9);
    Ok(())
}

/// Suggestion store that fails every lookup for one target.
struct FailingForTarget {
    inner: SuggestionRepository,
    target_id: &'static str,
}

#[async_trait]
impl SuggestionStore for FailingForTarget {
    async fn find_pending_by_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        if target_id == self.target_id {
            return Err(RepositoryError::Conflict("simulated lock timeout".into()));
        }
        self.inner.find_pending_by_target(target_id).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Suggestion>, RepositoryError> {
        self.inner.find(id).await
    }

    async fn insert(&self, suggestion: &Suggestion) -> Result<(), RepositoryError> {
        self.inner.insert(suggestion).await
    }

    async fn update(&self, suggestion: &Suggestion) -> Result<(), RepositoryError> {
        self.inner.update(suggestion).await
    }

    async fn record_approval(
        &self,
        suggestion: &Suggestion,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.inner.record_approval(suggestion, at).await
    }

    async fn delete_bulk(&self, ids: &[Uuid]) -> Result<u64, RepositoryError> {
        self.inner.delete_bulk(ids).await
    }

    async fn list(
        &self,
        account_id: &str,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        self.inner.list(account_id, status).await
    }
}

#[tokio::test]
async fn test_one_failing_entity_does_not_stop_the_rest() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    insert_entity(&db, EntitySeed::ad_set("as-1", "act_1", "c-1")).await?;
    insert_entity(&db, EntitySeed::ad_set("as-2", "act_1", "c-1")).await?;
    insert_config(&db, ctr_config("act_1")).await?;
    save_records(
        &db,
        vec![
            ad_set_record("as-1", "c-1", 1000.0, 0.03),
            ad_set_record("as-2", "c-1", 1000.0, 0.04),
        ],
    )
    .await?;

    let failing = FailingForTarget {
        inner: SuggestionRepository::new(db.clone()),
        target_id: "as-1",
    };
    let report = pipeline_with(&db, Arc::new(failing))
        .analyze_account("act_1", Utc::now())
        .await?;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].entity_id, "as-1");
    assert!(report.errors[0].message.contains("simulated lock timeout"));
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].target_id, "as-2");
    Ok(())
}
