use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{
    error::{AppError, AppResult},
    models::{UserProfile, PROFILE_SCHEMA_VERSION},
};

use super::ensure_parent_dir;

/// Persistence for the user profile
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    async fn load(&self) -> AppResult<Option<UserProfile>>;

    async fn save(&self, profile: &UserProfile) -> AppResult<()>;
}

/// Pretty-printed JSON file store
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ProfileStore for JsonProfileStore {
    async fn load(&self) -> AppResult<Option<UserProfile>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let mut profile: UserProfile = serde_json::from_str(&content)?;

        if profile.schema_version > PROFILE_SCHEMA_VERSION {
            return Err(AppError::InvalidInput(format!(
                "profile {} has schema version {}, newest supported is {}",
                self.path.display(),
                profile.schema_version,
                PROFILE_SCHEMA_VERSION
            )));
        }

        // Hand-edited files may break the ordering the profile relies on
        profile.watched_anime_ids.sort_unstable();
        profile.watched_anime_ids.dedup();

        tracing::debug!(
            path = %self.path.display(),
            watched = profile.watched_anime_ids.len(),
            "Profile loaded"
        );
        Ok(Some(profile))
    }

    async fn save(&self, profile: &UserProfile) -> AppResult<()> {
        ensure_parent_dir(&self.path).await?;

        let json = serde_json::to_string_pretty(profile)?;
        tokio::fs::write(&self.path, json).await?;

        tracing::info!(path = %self.path.display(), "Profile saved");
        Ok(())
    }
}
