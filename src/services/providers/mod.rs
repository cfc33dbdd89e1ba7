//! Catalog data provider abstraction
//!
//! A provider supplies the ranked catalog a session starts from and resolves
//! free-text titles that are not part of that catalog. The reconciler only
//! sees this trait, so it can run against a deterministic stub in tests.

use crate::{error::AppResult, models::CatalogEntry};

pub mod shikimori;

pub use shikimori::ShikimoriProvider;

/// Trait for remote anime catalogs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the `count` best-ranked titles, best first
    ///
    /// An empty list means the source had nothing to offer; callers treat
    /// it the same as an error and abort the session.
    async fn fetch_top_ranked(&self, count: usize) -> AppResult<Vec<CatalogEntry>>;

    /// Resolve a free-text title to the closest catalog entry
    ///
    /// `Ok(None)` is a plain miss.
    async fn find_by_title(&self, title: &str) -> AppResult<Option<CatalogEntry>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
