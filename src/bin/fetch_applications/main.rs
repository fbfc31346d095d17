//! Fetch orchestrator - pulls DA/CC/OC application data from the NSW
//! ePlanning API and upserts it into the raw tables.
//!
//! Usage: fetch-applications [da] [cc] [oc]
//! With no arguments all three domains run in order. Any domain failure is
//! reported at the end with a non-zero exit, after the remaining domains
//! have still been given their run.

use anyhow::Result;
use housing_dashboard_backend::config::Config;
use housing_dashboard_backend::db;
use housing_dashboard_backend::ingestion::{fetch, write, Domain, WriteStats};
use sqlx::PgPool;
use std::env;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    info!("Starting application fetch pipeline");

    let config = Config::from_env();
    if config.max_pages > 0 {
        warn!("Page limit active: at most {} pages per domain", config.max_pages);
    }

    let pool = db::connect_admin(&config).await?;
    info!("Database connected");

    let args: Vec<String> = env::args().skip(1).collect();
    let domains = if args.is_empty() {
        vec![Domain::Da, Domain::Cc, Domain::Oc]
    } else {
        let mut parsed = Vec::new();
        for arg in &args {
            match Domain::parse(arg) {
                Some(domain) => parsed.push(domain),
                None => warn!("Unknown domain: {}", arg),
            }
        }
        parsed
    };

    let client = fetch::build_client()?;
    let mut failed = false;

    for domain in domains {
        info!("=== {} fetch ===", domain);
        let started = std::time::Instant::now();

        match run_domain(&client, &config, &pool, domain).await {
            Ok(stats) => info!(
                "✓ {} completed in {:.1}s: {}",
                domain,
                started.elapsed().as_secs_f64(),
                stats
            ),
            Err(e) => {
                error!("✗ {} failed: {:#}", domain, e);
                failed = true;
            }
        }
    }

    pool.close().await;

    if failed {
        error!("Fetch pipeline finished with failures");
        Ok(ExitCode::FAILURE)
    } else {
        info!("Fetch pipeline complete");
        Ok(ExitCode::SUCCESS)
    }
}

async fn run_domain(
    client: &reqwest::Client,
    config: &Config,
    pool: &PgPool,
    domain: Domain,
) -> Result<WriteStats> {
    let records = fetch::fetch_domain(client, config, domain).await?;
    info!("Fetched {} {} records", records.len(), domain);

    let stats = match domain {
        Domain::Da => write::upsert_da_records(pool, records).await?,
        Domain::Cc => write::upsert_cc_records(pool, records).await?,
        Domain::Oc => write::upsert_oc_records(pool, records).await?,
    };

    Ok(stats)
}
