/// Application-level errors
///
/// Only the collaborators (catalog client, file stores, console) produce these.
/// The reconciler, engine and profile model report misses as empty results.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Catalog source unavailable: {0}")]
    SourceUnavailable(String),
}

pub type AppResult<T> = Result<T, AppError>;
