use anyhow::Context;
use housing_dashboard_backend::api::{self, AppState};
use housing_dashboard_backend::config::Config;
use housing_dashboard_backend::db;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting housing dashboard API server...");

    let config = Config::from_env();

    let pool = db::connect_readonly(&config)
        .await
        .context("failed to initialize readonly pool")?;
    info!("Database connected");

    let app = api::router(AppState { db: pool });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
