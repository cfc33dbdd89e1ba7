use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    error::AppResult,
    models::CatalogEntry,
    services::providers::CatalogSource,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    TitleSearch(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TitleSearch(query) => {
                write!(f, "search:{}", query.trim().to_lowercase())
            }
        }
    }
}

/// Session-scoped memo of title lookups in front of a [`CatalogSource`]
///
/// Each lookup key owns its own slot, so concurrent lookups of the same
/// title wait for one remote call instead of racing. Only successful
/// answers (hit or miss) are remembered; errors are retried next time.
pub struct CachedCatalogSource {
    inner: Arc<dyn CatalogSource>,
    titles: Mutex<HashMap<String, Arc<Mutex<Option<Option<CatalogEntry>>>>>>,
}

impl CachedCatalogSource {
    pub fn new(inner: Arc<dyn CatalogSource>) -> Self {
        Self {
            inner,
            titles: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, key: &CacheKey) -> Arc<Mutex<Option<Option<CatalogEntry>>>> {
        let mut titles = self.titles.lock().await;
        titles.entry(key.to_string()).or_default().clone()
    }
}

#[async_trait::async_trait]
impl CatalogSource for CachedCatalogSource {
    async fn fetch_top_ranked(&self, count: usize) -> AppResult<Vec<CatalogEntry>> {
        self.inner.fetch_top_ranked(count).await
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<CatalogEntry>> {
        let key = CacheKey::TitleSearch(title.to_string());
        let slot = self.slot(&key).await;
        let mut cached = slot.lock().await;

        if let Some(found) = cached.as_ref() {
            tracing::debug!(key = %key, "Title cache hit");
            return Ok(found.clone());
        }

        let found = self.inner.find_by_title(title).await?;
        *cached = Some(found.clone());
        Ok(found)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
