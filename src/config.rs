//! Configuration loaded from environment variables

use std::env;
use std::path::PathBuf;

/// Shared settings for the ingestion binaries and the API server
#[derive(Debug, Clone)]
pub struct Config {
    // ePlanning API
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub page_size: u32,
    /// 0 = no limit; TEST_MODE=true caps the fetch at 2 pages
    pub max_pages: u32,

    // Database coordinates
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_admin_user: String,
    pub db_readonly_user: String,
    pub admin_password_file: PathBuf,
    pub readonly_password_file: PathBuf,

    // API server
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        let test_mode = env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_pages = if test_mode {
            2
        } else {
            env::var("MAX_PAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0)
        };

        Config {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "https://api.apps1.nsw.gov.au/eplanning/data/v0".to_string()),

            api_key: env::var("DPHI_API_KEY").ok().filter(|k| !k.trim().is_empty()),

            page_size: env::var("PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),

            max_pages,

            db_host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),

            db_port: env::var("DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),

            db_name: env::var("DB_NAME").unwrap_or_else(|_| "housing".to_string()),

            db_admin_user: env::var("DB_ADMIN_USER").unwrap_or_else(|_| "db_admin".to_string()),

            db_readonly_user: env::var("DB_READONLY_USER")
                .unwrap_or_else(|_| "dashboard_readonly".to_string()),

            admin_password_file: env::var("ADMIN_PASSWORD_FILE")
                .unwrap_or_else(|_| "/etc/housing-dashboard/.env.admin".to_string())
                .into(),

            readonly_password_file: env::var("READONLY_PASSWORD_FILE")
                .unwrap_or_else(|_| "/etc/housing-dashboard/.env.readonly".to_string())
                .into(),

            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".to_string()),
        }
    }
}
