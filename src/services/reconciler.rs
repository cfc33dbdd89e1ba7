use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{
    error::AppError,
    models::{AnimeId, CatalogEntry},
    services::providers::CatalogSource,
};

/// Default number of catalog entries offered for manual selection
pub const DEFAULT_DISPLAY_WINDOW: usize = 50;

/// Upper bound on title lookups in flight at once
pub const MAX_CONCURRENT_LOOKUPS: usize = 4;

/// Result of resolving a list of free-text titles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    /// Resolved entries, deduplicated by id, in input order
    pub watched: Vec<CatalogEntry>,
    /// Titles that could not be resolved, in input order
    pub missing: Vec<String>,
}

/// The slice of the catalog shown for manual selection
pub fn display_window(catalog: &[CatalogEntry], window: usize) -> &[CatalogEntry] {
    &catalog[..window.min(catalog.len())]
}

/// Parses a comma-separated list of 1-based positions into the window
///
/// Non-numeric, zero, negative and out-of-window tokens are ignored.
/// Repeated positions collapse to one entry, first occurrence wins.
pub fn select_from_window(catalog: &[CatalogEntry], input: &str, window: usize) -> Vec<CatalogEntry> {
    let shown = display_window(catalog, window);

    let picked = input
        .split(',')
        .filter_map(|token| token.trim().parse::<i64>().ok())
        .filter(|&index| index > 0 && index as usize <= shown.len())
        .map(|index| shown[index as usize - 1].clone());

    dedup_by_id(picked)
}

/// Concatenates two watch lists, keeping the first occurrence of every id
pub fn merge(first: Vec<CatalogEntry>, second: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    dedup_by_id(first.into_iter().chain(second))
}

fn dedup_by_id<I>(entries: I) -> Vec<CatalogEntry>
where
    I: IntoIterator<Item = CatalogEntry>,
{
    let mut seen: HashSet<AnimeId> = HashSet::new();
    entries
        .into_iter()
        .filter(|anime| seen.insert(anime.id))
        .collect()
}

fn find_local<'a>(catalog: &'a [CatalogEntry], title: &str) -> Option<&'a CatalogEntry> {
    let wanted = title.to_lowercase();
    catalog.iter().find(|anime| anime.title.to_lowercase() == wanted)
}

/// Resolves watched titles against the catalog, falling back to the source
///
/// Exact case-insensitive catalog matches win. Everything else is looked up
/// remotely, one task per distinct title with at most
/// [`MAX_CONCURRENT_LOOKUPS`] running at once, and merged back in input order so
/// the outcome does not depend on which lookup finishes first. Remote hits
/// missing from the catalog are appended to it for the rest of the session.
pub async fn import_titles(
    source: Arc<dyn CatalogSource>,
    catalog: &mut Vec<CatalogEntry>,
    titles: &[String],
) -> ImportOutcome {
    let titles: Vec<&str> = titles
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    let remote = resolve_remote(source, catalog, &titles).await;

    let mut outcome = ImportOutcome::default();
    let mut seen: HashSet<AnimeId> = HashSet::new();

    for title in titles {
        let resolved = match find_local(catalog, title) {
            Some(local) => Some(local.clone()),
            None => remote.get(&title.to_lowercase()).cloned().flatten(),
        };

        let Some(anime) = resolved else {
            tracing::info!(title = %title, "Watched title not found");
            outcome.missing.push(title.to_string());
            continue;
        };

        if !catalog.iter().any(|a| a.id == anime.id) {
            tracing::debug!(id = anime.id, title = %anime.title, "Adding lookup result to session catalog");
            catalog.push(anime.clone());
        }

        if seen.insert(anime.id) {
            outcome.watched.push(anime);
        }
    }

    tracing::info!(
        resolved = outcome.watched.len(),
        missing = outcome.missing.len(),
        "Watch list import finished"
    );

    outcome
}

/// Looks up every title with no local match, a bounded number at a time.
/// Keys are lowercased titles; failed lookups map to `None`.
async fn resolve_remote(
    source: Arc<dyn CatalogSource>,
    catalog: &[CatalogEntry],
    titles: &[&str],
) -> HashMap<String, Option<CatalogEntry>> {
    let mut pending: Vec<(String, String)> = Vec::new();
    let mut queued: HashSet<String> = HashSet::new();

    for title in titles {
        let key = title.to_lowercase();
        if find_local(catalog, title).is_none() && queued.insert(key.clone()) {
            pending.push((key, title.to_string()));
        }
    }

    let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_LOOKUPS));
    let mut tasks = Vec::with_capacity(pending.len());
    for (key, title) in pending {
        let source = Arc::clone(&source);
        let permits = Arc::clone(&permits);
        let task = tokio::spawn(async move {
            let found = match permits.acquire_owned().await {
                Ok(_permit) => source.find_by_title(&title).await,
                Err(e) => Err(AppError::ExternalApi(format!("lookup limiter closed: {}", e))),
            };
            (title, found)
        });
        tasks.push((key, task));
    }

    let mut results = HashMap::new();
    for (key, task) in tasks {
        let found = match task.await {
            Ok((_, Ok(found))) => found,
            Ok((title, Err(e))) => {
                tracing::warn!(error = %e, title = %title, "Title lookup failed");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Task join error");
                None
            }
        };
        results.insert(key, found);
    }

    results
}
