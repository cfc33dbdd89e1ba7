pub mod profile;
pub mod recommendations_file;
pub mod watch_list;

pub use profile::{JsonProfileStore, ProfileStore};
pub use recommendations_file::RecommendationsFile;
pub use watch_list::WatchListFile;

use std::path::Path;

use crate::error::AppResult;

/// Creates the parent directory of `path` if it has one
pub(crate) async fn ensure_parent_dir(path: &Path) -> AppResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}
