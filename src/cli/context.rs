use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{config::Config, services::reconciler::DEFAULT_DISPLAY_WINDOW};

/// Identifier attached to every log line of one run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-run settings threaded through the session instead of globals
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    /// How many ranked titles to fetch
    pub catalog_size: usize,
    /// How many of them to offer for manual selection
    pub display_window: usize,
}

impl SessionContext {
    pub fn new(catalog_size: usize, display_window: usize) -> Self {
        Self {
            session_id: SessionId::new(),
            started_at: Utc::now(),
            catalog_size,
            display_window,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.catalog_size, config.display_window)
    }

    /// Span wrapping everything the session logs
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            started_at = %self.started_at.to_rfc3339(),
        )
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(150, DEFAULT_DISPLAY_WINDOW)
    }
}
