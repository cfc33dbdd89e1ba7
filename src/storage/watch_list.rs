use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{error::AppResult, models::CatalogEntry};

use super::ensure_parent_dir;

/// Plain-text watch list, one title per line
///
/// The saved form is exactly what `load_titles` reads back, so a saved list
/// can be imported in a later session.
#[derive(Debug, Clone)]
pub struct WatchListFile {
    path: PathBuf,
}

impl WatchListFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads trimmed, non-blank lines. A missing file is an empty list.
    ///
    /// Invalid UTF-8 (e.g. a Windows-1251 export) is decoded lossily so the
    /// readable titles still import.
    pub async fn load_titles(&self) -> AppResult<Vec<String>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Watch list file not found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let content = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = content {
            tracing::warn!(
                path = %self.path.display(),
                "Watch list is not valid UTF-8, undecodable bytes replaced"
            );
        }

        Ok(content
            .lines()
            .map(|line| line.trim_start_matches('\u{feff}').trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn save_watched(&self, entries: &[CatalogEntry]) -> AppResult<()> {
        ensure_parent_dir(&self.path).await?;

        let mut content = String::new();
        for anime in entries {
            content.push_str(&anime.title);
            content.push('\n');
        }
        tokio::fs::write(&self.path, content).await?;

        tracing::info!(
            path = %self.path.display(),
            entries = entries.len(),
            "Watch list saved"
        );
        Ok(())
    }
}
