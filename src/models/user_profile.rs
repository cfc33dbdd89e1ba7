use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{AnimeId, CatalogEntry, RecommendationResult};

/// Current on-disk layout of [`UserProfile`]
pub const PROFILE_SCHEMA_VERSION: u32 = 1;

/// Number of genres shown in the end-of-session summary
pub const DEFAULT_SUMMARY_SIZE: usize = 5;

/// Persistent user taste profile
///
/// Field names are PascalCase so that profiles written before the schema
/// was versioned still load; a missing `SchemaVersion` reads as version 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct UserProfile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Genre name to affinity weight. Weights never decrease.
    #[serde(default)]
    pub genre_preferences: BTreeMap<String, u32>,
    /// Sorted strictly ascending
    #[serde(default)]
    pub watched_anime_ids: Vec<AnimeId>,
    /// Titles recommended in the most recent session
    #[serde(default)]
    pub last_recommendations: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_schema_version() -> u32 {
    PROFILE_SCHEMA_VERSION
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl UserProfile {
    /// Creates an empty profile
    pub fn new() -> Self {
        Self {
            schema_version: PROFILE_SCHEMA_VERSION,
            genre_preferences: BTreeMap::new(),
            watched_anime_ids: Vec::new(),
            last_recommendations: Vec::new(),
            updated_at: None,
        }
    }

    /// Folds one finished session into the profile
    ///
    /// Genre weights grow only for entries this profile has never recorded,
    /// so replaying the same watch list is a no-op for the weights.
    /// `last_recommendations` is replaced, not extended.
    pub fn update(&mut self, watched: &[CatalogEntry], recommendations: &[RecommendationResult]) {
        let mut known: BTreeSet<AnimeId> = self.watched_anime_ids.iter().copied().collect();

        for anime in watched {
            if !known.insert(anime.id) {
                continue;
            }

            for genre in &anime.genres {
                *self.genre_preferences.entry(genre.clone()).or_insert(0) += 1;
            }
        }

        self.watched_anime_ids = known.into_iter().collect();
        self.last_recommendations = recommendations
            .iter()
            .map(|r| r.anime.title.clone())
            .collect();
        self.updated_at = Some(Utc::now());

        tracing::debug!(
            watched_total = self.watched_anime_ids.len(),
            genres = self.genre_preferences.len(),
            "Profile updated"
        );
    }

    /// Top `n` genres by weight
    ///
    /// Equal weights are ordered alphabetically by genre name.
    pub fn summarize(&self, n: usize) -> Vec<(String, u32)> {
        let mut genres: Vec<(String, u32)> = self
            .genre_preferences
            .iter()
            .map(|(genre, weight)| (genre.clone(), *weight))
            .collect();

        genres.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        genres.truncate(n);
        genres
    }
}

/// How often each genre appears across a watch list, most frequent first
pub fn genre_histogram(watched: &[CatalogEntry]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for anime in watched {
        for genre in &anime.genres {
            *counts.entry(genre.as_str()).or_insert(0) += 1;
        }
    }

    let mut histogram: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(genre, count)| (genre.to_string(), count))
        .collect();
    histogram.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: AnimeId, title: &str, genres: &[&str]) -> CatalogEntry {
        CatalogEntry::new(id, title, genres.iter().copied())
    }

    fn recommendation(anime: CatalogEntry) -> RecommendationResult {
        RecommendationResult {
            anime,
            score: 1.0,
            explanation: "test".to_string(),
            matched_genres: vec![],
        }
    }

    #[test]
    fn test_new_profile() {
        let profile = UserProfile::new();
        assert_eq!(profile.schema_version, PROFILE_SCHEMA_VERSION);
        assert!(profile.genre_preferences.is_empty());
        assert!(profile.watched_anime_ids.is_empty());
        assert!(profile.last_recommendations.is_empty());
    }

    #[test]
    fn test_update_counts_new_entries() {
        let mut profile = UserProfile::new();
        let watched = vec![
            entry(30, "Steins;Gate", &["Sci-Fi", "Thriller"]),
            entry(10, "Monster", &["Drama", "Thriller"]),
        ];

        profile.update(&watched, &[]);

        assert_eq!(profile.genre_preferences["Thriller"], 2);
        assert_eq!(profile.genre_preferences["Sci-Fi"], 1);
        assert_eq!(profile.genre_preferences["Drama"], 1);
        assert_eq!(profile.watched_anime_ids, vec![10, 30]);
        assert!(profile.updated_at.is_some());
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut profile = UserProfile::new();
        let watched = vec![
            entry(1, "A", &["Action", "Comedy"]),
            entry(2, "B", &["Action"]),
        ];

        profile.update(&watched, &[]);
        let after_first = profile.genre_preferences.clone();

        profile.update(&watched, &[]);
        assert_eq!(profile.genre_preferences, after_first);
        assert_eq!(profile.watched_anime_ids, vec![1, 2]);
    }

    #[test]
    fn test_update_skips_entries_from_previous_sessions() {
        let mut profile = UserProfile::new();
        profile.update(&[entry(1, "A", &["Action"])], &[]);

        profile.update(
            &[entry(1, "A", &["Action"]), entry(3, "C", &["Action", "Music"])],
            &[],
        );

        assert_eq!(profile.genre_preferences["Action"], 2);
        assert_eq!(profile.genre_preferences["Music"], 1);
        assert_eq!(profile.watched_anime_ids, vec![1, 3]);
    }

    #[test]
    fn test_update_duplicate_within_session_counted_once() {
        let mut profile = UserProfile::new();
        let a = entry(7, "A", &["Romance"]);
        profile.update(&[a.clone(), a], &[]);

        assert_eq!(profile.genre_preferences["Romance"], 1);
        assert_eq!(profile.watched_anime_ids, vec![7]);
    }

    #[test]
    fn test_update_keeps_ids_sorted_unique() {
        let mut profile = UserProfile::new();
        profile.watched_anime_ids = vec![2, 8];

        profile.update(
            &[entry(5, "E", &[]), entry(1, "F", &[]), entry(8, "G", &[])],
            &[],
        );

        assert_eq!(profile.watched_anime_ids, vec![1, 2, 5, 8]);
    }

    #[test]
    fn test_update_replaces_last_recommendations() {
        let mut profile = UserProfile::new();
        profile.last_recommendations = vec!["Old".to_string()];

        let recs = vec![
            recommendation(entry(9, "Nana", &["Music"])),
            recommendation(entry(4, "K-On!", &["Music"])),
        ];
        profile.update(&[], &recs);

        assert_eq!(profile.last_recommendations, vec!["Nana", "K-On!"]);
    }

    #[test]
    fn test_summarize_tie_break_alphabetical() {
        let mut profile = UserProfile::new();
        for (genre, weight) in [
            ("Action", 5),
            ("Drama", 3),
            ("Comedy", 3),
            ("Horror", 1),
            ("Romance", 1),
            ("Music", 1),
        ] {
            profile.genre_preferences.insert(genre.to_string(), weight);
        }

        let top: Vec<String> = profile
            .summarize(DEFAULT_SUMMARY_SIZE)
            .into_iter()
            .map(|(genre, _)| genre)
            .collect();

        assert_eq!(top, vec!["Action", "Comedy", "Drama", "Horror", "Music"]);
    }

    #[test]
    fn test_summarize_fewer_genres_than_requested() {
        let mut profile = UserProfile::new();
        profile.genre_preferences.insert("Mecha".to_string(), 2);

        assert_eq!(profile.summarize(5), vec![("Mecha".to_string(), 2)]);
        assert!(UserProfile::new().summarize(5).is_empty());
    }

    #[test]
    fn test_legacy_profile_without_version_loads() {
        let json = r#"{
            "GenrePreferences": { "Action": 3 },
            "WatchedAnimeIds": [1, 5],
            "LastRecommendations": ["Mushishi"]
        }"#;

        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.schema_version, 1);
        assert_eq!(profile.genre_preferences["Action"], 3);
        assert_eq!(profile.watched_anime_ids, vec![1, 5]);
        assert_eq!(profile.updated_at, None);
    }

    #[test]
    fn test_genre_histogram_ordering() {
        let watched = vec![
            entry(1, "A", &["Drama", "Action"]),
            entry(2, "B", &["Action"]),
            entry(3, "C", &["Comedy", "Drama"]),
            entry(4, "D", &["Action"]),
        ];

        assert_eq!(
            genre_histogram(&watched),
            vec![
                ("Action".to_string(), 3),
                ("Drama".to_string(), 2),
                ("Comedy".to_string(), 1),
            ]
        );
    }
}
