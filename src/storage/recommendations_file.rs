use std::path::{Path, PathBuf};

use crate::{error::AppResult, models::RecommendationResult};

use super::ensure_parent_dir;

/// Text export of a session's recommendations, overwritten on every save
#[derive(Debug, Clone)]
pub struct RecommendationsFile {
    path: PathBuf,
}

impl RecommendationsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, recommendations: &[RecommendationResult]) -> AppResult<()> {
        ensure_parent_dir(&self.path).await?;

        let content: String = recommendations
            .iter()
            .map(|r| format!("{}\n", r.to_line()))
            .collect();
        tokio::fs::write(&self.path, content).await?;

        tracing::info!(
            path = %self.path.display(),
            entries = recommendations.len(),
            "Recommendations saved"
        );
        Ok(())
    }
}
