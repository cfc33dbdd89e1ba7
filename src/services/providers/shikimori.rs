//! Shikimori GraphQL provider
//!
//! Both operations go through `POST {api_url}/graphql`:
//! 1. Ranked catalog: `animes(order: ranked, page, limit)`, paged 50 at a time
//! 2. Title lookup: `animes(search, limit: 1)`, Shikimori does the fuzzy matching
//!
//! Shikimori allows about 5 requests per second per client, so every request
//! waits on a shared [`RateLimiter`] first.

use crate::{
    error::{AppError, AppResult},
    models::{AnimeId, AnimesData, ApiAnime, CatalogEntry, GraphQlResponse},
    services::providers::CatalogSource,
};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Shikimori caps `limit` at 50 per page
const PAGE_LIMIT: usize = 50;

const TOP_RANKED_QUERY: &str = r#"
query($page: PositiveInt, $limit: PositiveInt) {
  animes(order: ranked, page: $page, limit: $limit) {
    id name
    genres { name }
  }
}"#;

const SEARCH_QUERY: &str = r#"
query($search: String) {
  animes(search: $search, limit: 1) {
    id name
    genres { name }
  }
}"#;

/// Enforces a minimum interval between consecutive requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait if necessary to comply with the rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Shikimori rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Clone)]
pub struct ShikimoriProvider {
    http_client: HttpClient,
    api_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl ShikimoriProvider {
    pub fn new(api_url: String, user_agent: &str, request_interval: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::new(request_interval)),
        })
    }

    fn graphql_url(&self) -> String {
        format!("{}/graphql", self.api_url)
    }

    async fn query_animes(&self, query: &str, variables: Value) -> AppResult<Vec<ApiAnime>> {
        self.rate_limiter.wait().await;

        let response = self
            .http_client
            .post(self.graphql_url())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Shikimori API returned status {}: {}",
                status, body
            )));
        }

        let payload: GraphQlResponse<AnimesData> = response.json().await?;
        unwrap_animes(payload)
    }
}

/// Turns a GraphQL envelope into its anime list, surfacing query errors
fn unwrap_animes(payload: GraphQlResponse<AnimesData>) -> AppResult<Vec<ApiAnime>> {
    if !payload.errors.is_empty() {
        let messages: Vec<String> = payload.errors.into_iter().map(|e| e.message).collect();
        return Err(AppError::ExternalApi(format!(
            "Shikimori GraphQL error: {}",
            messages.join("; ")
        )));
    }

    Ok(payload.data.map(|d| d.animes).unwrap_or_default())
}

fn to_entries(animes: Vec<ApiAnime>) -> Vec<CatalogEntry> {
    animes
        .into_iter()
        .filter_map(|anime| match CatalogEntry::try_from(anime) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed catalog record");
                None
            }
        })
        .collect()
}

/// Appends a page to the catalog, dropping ids already present.
/// Returns how many entries were added.
fn append_page(
    catalog: &mut Vec<CatalogEntry>,
    seen: &mut HashSet<AnimeId>,
    page: Vec<CatalogEntry>,
) -> usize {
    let before = catalog.len();
    for entry in page {
        if seen.insert(entry.id) {
            catalog.push(entry);
        }
    }
    catalog.len() - before
}

/// Pages through the ranked list until `count` entries are collected.
///
/// A failed page after the first one ends paging with what was already
/// collected; only a failure on an empty catalog is returned as an error.
async fn collect_ranked<F, Fut>(count: usize, mut fetch_page: F) -> AppResult<Vec<CatalogEntry>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = AppResult<Vec<ApiAnime>>>,
{
    let mut catalog = Vec::with_capacity(count);
    let mut seen = HashSet::new();
    let mut page = 1;

    while catalog.len() < count {
        let animes = match fetch_page(page).await {
            Ok(animes) => animes,
            Err(e) if !catalog.is_empty() => {
                tracing::warn!(
                    error = %e,
                    page,
                    collected = catalog.len(),
                    "Ranked page failed, keeping partial catalog"
                );
                break;
            }
            Err(e) => return Err(e),
        };
        let received = animes.len();
        let added = append_page(&mut catalog, &mut seen, to_entries(animes));

        tracing::debug!(page, received, added, "Fetched ranked page");

        if received < PAGE_LIMIT || added == 0 {
            break;
        }
        page += 1;
    }

    catalog.truncate(count);
    Ok(catalog)
}

#[async_trait::async_trait]
impl CatalogSource for ShikimoriProvider {
    async fn fetch_top_ranked(&self, count: usize) -> AppResult<Vec<CatalogEntry>> {
        let catalog = collect_ranked(count, move |page| {
            self.query_animes(TOP_RANKED_QUERY, json!({ "page": page, "limit": PAGE_LIMIT }))
        })
        .await?;

        tracing::info!(
            requested = count,
            results = catalog.len(),
            provider = "shikimori",
            "Ranked catalog fetched"
        );

        Ok(catalog)
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<CatalogEntry>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let animes = self
            .query_animes(SEARCH_QUERY, json!({ "search": title }))
            .await?;
        let found = to_entries(animes).into_iter().next();

        tracing::info!(
            query = %title,
            found = found.is_some(),
            provider = "shikimori",
            "Title search completed"
        );

        Ok(found)
    }

    fn name(&self) -> &'static str {
        "shikimori"
    }
}
