pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use cache::CachedCatalogSource;
use cli::{Prompter, Session, SessionContext, SessionOutcome};
use config::Config;
use error::AppResult;
use services::{providers::ShikimoriProvider, recommendations::RandomFallback};
use storage::{JsonProfileStore, RecommendationsFile, WatchListFile};

/// Runs one interactive session on stdin/stdout
pub async fn run(config: Config) -> AppResult<SessionOutcome> {
    let provider = ShikimoriProvider::new(
        config.api_url.clone(),
        &config.user_agent,
        Duration::from_millis(config.request_interval_ms),
    )?;
    let source = Arc::new(CachedCatalogSource::new(Arc::new(provider)));

    let context = SessionContext::from_config(&config);
    tracing::debug!(session_id = %context.session_id, config = ?config, "Starting session");

    let stdin = std::io::stdin();
    let mut session = Session::new(
        context,
        source,
        Arc::new(JsonProfileStore::new(&config.profile_path)),
        WatchListFile::new(&config.watch_list_path),
        RecommendationsFile::new(&config.recommendations_path),
        RandomFallback::new(config.random_seed),
        Prompter::new(stdin.lock(), std::io::stdout()),
    );

    session.run().await
}
