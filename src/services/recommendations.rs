use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::models::{AnimeId, CatalogEntry, RecommendationResult};

/// Recommendation count used when the user gives none or an invalid one
pub const DEFAULT_RECOMMENDATIONS: usize = 10;
/// Largest recommendation count the prompt accepts
pub const MAX_RECOMMENDATIONS: usize = 30;

pub const FALLBACK_EXPLANATION: &str = "random pick";

/// Genre-affinity scorer
///
/// The score of a candidate is the plain sum of the profile weights of its
/// genres. Genres without a positive weight add nothing, so a candidate
/// with no weighted overlap scores exactly 0 and is never returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Ranks unseen catalog entries against the genre weights
    ///
    /// Ordered by descending score; equal scores keep catalog order, which
    /// is popularity order. Returns at most `limit` entries and may return
    /// none at all. `limit` is trusted as given.
    pub fn recommend(
        &self,
        catalog: &[CatalogEntry],
        watched: &HashSet<AnimeId>,
        genre_preferences: &BTreeMap<String, u32>,
        limit: usize,
    ) -> Vec<RecommendationResult> {
        let mut scored: Vec<(usize, RecommendationResult)> = catalog
            .iter()
            .enumerate()
            .filter(|(_, anime)| !watched.contains(&anime.id))
            .filter_map(|(rank, anime)| {
                self.score(anime, genre_preferences)
                    .map(|result| (rank, result))
            })
            .collect();

        scored.sort_by(|(rank_a, a), (rank_b, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| rank_a.cmp(rank_b))
        });

        // A catalog can list one id twice after session growth; keep the best-ranked copy
        let mut emitted: HashSet<AnimeId> = HashSet::new();
        let results: Vec<RecommendationResult> = scored
            .into_iter()
            .map(|(_, result)| result)
            .filter(|result| emitted.insert(result.anime.id))
            .take(limit)
            .collect();

        tracing::debug!(
            candidates = catalog.len(),
            watched = watched.len(),
            returned = results.len(),
            "Recommendations scored"
        );

        results
    }

    /// Scores one candidate; `None` when it has no positive-weight genre
    fn score(
        &self,
        anime: &CatalogEntry,
        genre_preferences: &BTreeMap<String, u32>,
    ) -> Option<RecommendationResult> {
        let mut matched: Vec<(&str, u32)> = anime
            .genres
            .iter()
            .filter_map(|genre| {
                genre_preferences
                    .get(genre)
                    .copied()
                    .filter(|&weight| weight > 0)
                    .map(|weight| (genre.as_str(), weight))
            })
            .collect();

        if matched.is_empty() {
            return None;
        }

        matched.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let score: f64 = matched.iter().map(|(_, weight)| f64::from(*weight)).sum();
        let matched_genres: Vec<String> = matched.iter().map(|(g, _)| g.to_string()).collect();

        Some(RecommendationResult {
            anime: anime.clone(),
            score,
            explanation: format!("matches your genres: {}", matched_genres.join(", ")),
            matched_genres,
        })
    }
}

/// Where a session's recommendation list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationOrigin {
    Engine,
    RandomFallback,
}

/// Uniform sample of unseen titles, used when the engine finds nothing
pub struct RandomFallback {
    rng: StdRng,
}

impl RandomFallback {
    /// Seeded for reproducible runs, entropy-seeded otherwise
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn pick(
        &mut self,
        catalog: &[CatalogEntry],
        watched: &HashSet<AnimeId>,
        limit: usize,
    ) -> Vec<RecommendationResult> {
        let mut seen: HashSet<AnimeId> = HashSet::new();
        let unseen: Vec<&CatalogEntry> = catalog
            .iter()
            .filter(|anime| !watched.contains(&anime.id) && seen.insert(anime.id))
            .collect();

        unseen
            .choose_multiple(&mut self.rng, limit)
            .map(|anime| RecommendationResult {
                anime: (*anime).clone(),
                score: 0.0,
                explanation: FALLBACK_EXPLANATION.to_string(),
                matched_genres: Vec::new(),
            })
            .collect()
    }

    /// Engine output when there is any, otherwise a random sample
    pub fn recommend_or_pick(
        &mut self,
        engine: &RecommendationEngine,
        catalog: &[CatalogEntry],
        watched: &HashSet<AnimeId>,
        genre_preferences: &BTreeMap<String, u32>,
        limit: usize,
    ) -> (Vec<RecommendationResult>, RecommendationOrigin) {
        let results = engine.recommend(catalog, watched, genre_preferences, limit);
        if !results.is_empty() {
            return (results, RecommendationOrigin::Engine);
        }

        tracing::info!(limit, "No genre matches, falling back to random picks");
        (
            self.pick(catalog, watched, limit),
            RecommendationOrigin::RandomFallback,
        )
    }
}
