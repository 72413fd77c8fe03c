//! # adscale command-line entry point

use std::sync::Arc;
use std::time::Duration;

use adscale::app::Services;
use adscale::config::ConfigLoader;
use adscale::scheduler::Scheduler;
use adscale::{db, telemetry};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "adscale")]
#[command(about = "Performance-threshold budget scaling suggestions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Run the sync cycle on its schedule until Ctrl-C
    Run,
    /// Run one sync cycle and print its report
    SyncOnce,
    /// Ingest an already exported report for an account
    Ingest {
        #[arg(long)]
        account: String,
        #[arg(long)]
        url: Url,
    },
    /// Analyze stored data for an account without syncing
    Analyze {
        #[arg(long)]
        account: String,
    },
    /// Approve a pending suggestion and apply its budget
    Approve { suggestion_id: Uuid },
    /// Reject a pending suggestion
    Reject { suggestion_id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load()?;
    telemetry::init_tracing(&config)?;
    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let db = Arc::new(db::init_pool(&config).await?);
    let services = || Services::build(&config, db.clone());

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&db).await?;
            println!("migrations applied");
        }
        Commands::Run => {
            let services = services()?;
            let mut scheduler = Scheduler::new(config.scheduler.jitter_pct_max);
            let cycle = services.cycle.clone();
            scheduler.start(
                "sync_cycle",
                Duration::from_secs(config.scheduler.sync_interval_seconds),
                move || {
                    let cycle = cycle.clone();
                    async move {
                        cycle.run_once().await;
                    }
                },
            );

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            info!("Shutdown requested");
            scheduler.stop().await;
        }
        Commands::SyncOnce => {
            let services = services()?;
            let report = services.cycle.run_once().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Ingest { account, url } => {
            let services = services()?;
            let summary = services.cycle.insight_sync().ingest_url(&account, &url).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Analyze { account } => {
            let services = services()?;
            let report = services
                .cycle
                .pipeline()
                .analyze_account(&account, Utc::now())
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Approve { suggestion_id } => {
            let services = services()?;
            let suggestion = services.suggestions.approve(suggestion_id).await?;
            println!("{}", serde_json::to_string_pretty(&suggestion)?);
        }
        Commands::Reject { suggestion_id } => {
            let services = services()?;
            let suggestion = services.suggestions.reject(suggestion_id).await?;
            println!("{}", serde_json::to_string_pretty(&suggestion)?);
        }
    }

    Ok(())
}
