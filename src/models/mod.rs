use serde::{Deserialize, Serialize};

pub mod user_profile;

pub use user_profile::{UserProfile, PROFILE_SCHEMA_VERSION};

/// Catalog identifier as issued by the catalog source
pub type AnimeId = i64;

/// A single title in the session catalog
///
/// Popularity rank is not stored: it is the entry's position in the catalog
/// sequence the session works with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: AnimeId,
    pub title: String,
    /// Deduplicated, in the order the source listed them
    pub genres: Vec<String>,
}

impl CatalogEntry {
    pub fn new<I, S>(id: AnimeId, title: impl Into<String>, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for genre in genres {
            let genre = genre.into();
            if !unique.contains(&genre) {
                unique.push(genre);
            }
        }

        Self {
            id,
            title: title.into(),
            genres: unique,
        }
    }
}

/// A scored, explained suggestion produced for the session
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationResult {
    pub anime: CatalogEntry,
    pub score: f64,
    pub explanation: String,
    /// Shared genres, heaviest preference first, alphabetical on ties
    pub matched_genres: Vec<String>,
}

impl RecommendationResult {
    /// One line of the recommendations file
    pub fn to_line(&self) -> String {
        format!(
            "{} — {} (score {:.2})",
            self.anime.title, self.explanation, self.score
        )
    }
}

// ============================================================================
// Shikimori GraphQL API Types
// ============================================================================

/// GraphQL envelope: `data` is absent when the query failed
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimesData {
    #[serde(default)]
    pub animes: Vec<ApiAnime>,
}

/// Raw anime record from the Shikimori GraphQL API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAnime {
    /// Shikimori serializes ids as strings in GraphQL
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<ApiGenre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenre {
    pub name: String,
}

impl TryFrom<ApiAnime> for CatalogEntry {
    type Error = String;

    fn try_from(anime: ApiAnime) -> Result<Self, Self::Error> {
        let id = anime
            .id
            .parse::<AnimeId>()
            .map_err(|e| format!("invalid anime id {:?}: {}", anime.id, e))?;

        Ok(CatalogEntry::new(
            id,
            anime.name,
            anime.genres.into_iter().map(|g| g.name),
        ))
    }
}
