//! Aggregation orchestrator - recomputes the daily/weekly/monthly summary
//! tables from the raw application tables.
//!
//! Usage: aggregate-applications [da] [cc] [oc]
//! With no arguments all three domains run in order; each domain recomputes
//! all three granularities. A failed domain is reported with a non-zero
//! exit after the remaining domains have run.

use anyhow::Result;
use housing_dashboard_backend::config::Config;
use housing_dashboard_backend::db;
use housing_dashboard_backend::ingestion::aggregate::{self, Granularity};
use housing_dashboard_backend::ingestion::{AggregateStats, Domain};
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

    info!("Starting aggregation pipeline");

    let config = Config::from_env();
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

    let mut failed = false;

    for domain in domains {
        info!("=== {} aggregation ===", domain);
        let started = std::time::Instant::now();

        match run_domain(&pool, domain).await {
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
        error!("Aggregation pipeline finished with failures");
        Ok(ExitCode::FAILURE)
    } else {
        info!("Aggregation pipeline complete");
        Ok(ExitCode::SUCCESS)
    }
}

async fn run_domain(pool: &PgPool, domain: Domain) -> Result<AggregateStats> {
    let mut total = AggregateStats::default();

    for granularity in Granularity::ALL {
        let stats = match domain {
            Domain::Da => aggregate::aggregate_da(pool, granularity).await?,
            Domain::Cc => aggregate::aggregate_cc(pool, granularity).await?,
            Domain::Oc => aggregate::aggregate_oc(pool, granularity).await?,
        };

        total.inserted += stats.inserted;
        total.updated += stats.updated;
    }

    Ok(total)
}
