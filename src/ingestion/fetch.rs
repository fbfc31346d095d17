//! Fetch functions - paginated retrieval from the ePlanning REST API
//!
//! Failure policy: page 1 carries the pagination metadata and is fatal if it
//! cannot be retrieved; failures on later pages are logged and the page is
//! skipped, never retried. Missing pages mean an incomplete but successful
//! run.

use crate::config::Config;
use crate::ingestion::types::{Domain, PageEnvelope};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Unconditional pause inserted every this many pages
const PAGES_PER_PAUSE: u32 = 10;
const PAUSE: Duration = Duration::from_millis(100);

/// Progress log cadence
const PAGES_PER_PROGRESS: u32 = 100;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse API response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Build the HTTP client with the fixed absolute per-request timeout.
pub fn build_client() -> Result<Client, FetchError> {
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("housing-dashboard-backend/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Fetch one page. Pagination travels in request headers; the record array
/// comes back under `Application` in the envelope.
pub async fn fetch_page(
    client: &Client,
    endpoint: &str,
    api_key: Option<&str>,
    page_number: u32,
    page_size: u32,
) -> Result<PageEnvelope, FetchError> {
    let mut request = client
        .get(endpoint)
        .header("Accept", "application/json")
        .header("PageSize", page_size.to_string())
        .header("PageNumber", page_number.to_string())
        .header("filters", r#"{"filters":{}}"#);

    if let Some(key) = api_key {
        request = request.header("Ocp-Apim-Subscription-Key", key);
    }

    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Status { status, body });
    }

    let body = response.text().await?;
    let envelope: PageEnvelope = serde_json::from_str(&body)?;
    Ok(envelope)
}

/// Drive the sequential pagination loop over any page-fetching function.
///
/// Generic over the fetcher so the partial-failure policy can be exercised
/// without a live API.
pub async fn fetch_all_pages<F, Fut>(
    fetch: F,
    max_pages: u32,
) -> Result<Vec<Value>, FetchError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<PageEnvelope, FetchError>>,
{
    // First page is fatal: without it there is no total-page count
    let first = fetch(1).await?;

    let total_pages = first.total_pages;
    let total_count = first.total_count;
    info!("Total records available: {}", total_count);
    info!("Total pages: {}", total_pages);
    info!("Page 1/{}: {} records fetched", total_pages, first.records.len());

    let mut all_records = first.records;

    let pages_to_fetch = if max_pages > 0 {
        max_pages.min(total_pages)
    } else {
        total_pages
    };

    if pages_to_fetch > 1000 {
        warn!("{} pages will take significant time", pages_to_fetch);
    }

    for page in 2..=pages_to_fetch {
        match fetch(page).await {
            Ok(envelope) => {
                all_records.extend(envelope.records);

                if page % PAGES_PER_PROGRESS == 0 || page == pages_to_fetch {
                    info!(
                        "Page {}/{}: {} total records fetched",
                        page,
                        pages_to_fetch,
                        all_records.len()
                    );
                }
            }
            Err(e) => {
                // Skip the page and continue; the next scheduled run
                // reconciles any loss via upsert
                warn!("Error fetching page {}: {}", page, e);
            }
        }

        if page % PAGES_PER_PAUSE == 0 {
            tokio::time::sleep(PAUSE).await;
        }
    }

    info!(
        "Fetch complete: {} total records from {} pages",
        all_records.len(),
        pages_to_fetch
    );

    Ok(all_records)
}

/// Fetch the complete record set for one domain.
pub async fn fetch_domain(
    client: &Client,
    config: &Config,
    domain: Domain,
) -> Result<Vec<Value>, FetchError> {
    let endpoint = format!("{}/{}", config.api_base_url, domain.api_resource());
    let api_key = config.api_key.as_deref();
    let page_size = config.page_size;

    info!("Fetching {} data from {}", domain, endpoint);
    info!(
        "Authentication: {}",
        if api_key.is_some() { "using API key" } else { "public access" }
    );

    fetch_all_pages(
        |page| fetch_page(client, &endpoint, api_key, page, page_size),
        config.max_pages,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(page: u32, total_pages: u32) -> PageEnvelope {
        PageEnvelope {
            page_size: Some(2),
            page_number: Some(page),
            total_pages,
            total_count: (total_pages * 2) as u64,
            records: vec![
                json!({"ApplicationNumber": format!("DA-{}-1", page)}),
                json!({"ApplicationNumber": format!("DA-{}-2", page)}),
            ],
        }
    }

    fn transient_error() -> FetchError {
        FetchError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "upstream error".to_string(),
        }
    }

    #[tokio::test]
    async fn test_all_pages_collected() {
        let records = fetch_all_pages(|page| async move { Ok(envelope(page, 3)) }, 0)
            .await
            .unwrap();
        assert_eq!(records.len(), 6);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_fatal() {
        let result = fetch_all_pages(
            |page| async move {
                if page == 1 {
                    Err(transient_error())
                } else {
                    Ok(envelope(page, 3))
                }
            },
            0,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mid_run_page_failure_is_skipped() {
        // Page 3 of 5 fails; pages 1,2,4,5 must still be delivered
        let records = fetch_all_pages(
            |page| async move {
                if page == 3 {
                    Err(transient_error())
                } else {
                    Ok(envelope(page, 5))
                }
            },
            0,
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 8);
        let numbers: Vec<String> = records
            .iter()
            .map(|r| r["ApplicationNumber"].as_str().unwrap().to_string())
            .collect();
        assert!(numbers.contains(&"DA-4-1".to_string()));
        assert!(!numbers.iter().any(|n| n.starts_with("DA-3")));
    }

    #[tokio::test]
    async fn test_max_pages_cap() {
        let records = fetch_all_pages(|page| async move { Ok(envelope(page, 10)) }, 2)
            .await
            .unwrap();
        assert_eq!(records.len(), 4);
    }
}
