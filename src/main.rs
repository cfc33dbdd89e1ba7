use anime_recommender::{cli::SessionOutcome, config::Config, error::AppError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the prompts
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anime_recommender=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;

    match anime_recommender::run(config).await? {
        SessionOutcome::Completed(_) | SessionOutcome::NoWatchHistory => Ok(()),
        SessionOutcome::SourceUnavailable => Err(AppError::SourceUnavailable(
            "no titles received from the catalog".to_string(),
        )
        .into()),
    }
}
