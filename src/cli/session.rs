use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::Instrument;

use crate::{
    error::AppResult,
    models::{
        user_profile::{genre_histogram, DEFAULT_SUMMARY_SIZE},
        AnimeId, CatalogEntry, RecommendationResult, UserProfile,
    },
    services::{
        providers::CatalogSource,
        reconciler::{self, display_window},
        recommendations::{RandomFallback, RecommendationEngine, RecommendationOrigin},
    },
    storage::{ProfileStore, RecommendationsFile, WatchListFile},
};

use super::{
    context::SessionContext,
    prompt::{parse_menu_choice, Prompter, WatchSource},
};

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Recommendations shown and the profile saved
    Completed(SessionReport),
    /// The catalog fetch failed or came back empty; nothing was written
    SourceUnavailable,
    /// Input ended before any watch history was collected; nothing was written
    NoWatchHistory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub watched: Vec<CatalogEntry>,
    pub recommendations: Vec<RecommendationResult>,
    pub origin: RecommendationOrigin,
    pub profile: UserProfile,
}

/// One interactive recommendation run
pub struct Session<R, W> {
    context: SessionContext,
    source: Arc<dyn CatalogSource>,
    profile_store: Arc<dyn ProfileStore>,
    watch_list: WatchListFile,
    recommendations_file: RecommendationsFile,
    engine: RecommendationEngine,
    fallback: RandomFallback,
    prompter: Prompter<R, W>,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(
        context: SessionContext,
        source: Arc<dyn CatalogSource>,
        profile_store: Arc<dyn ProfileStore>,
        watch_list: WatchListFile,
        recommendations_file: RecommendationsFile,
        fallback: RandomFallback,
        prompter: Prompter<R, W>,
    ) -> Self {
        Self {
            context,
            source,
            profile_store,
            watch_list,
            recommendations_file,
            engine: RecommendationEngine::new(),
            fallback,
            prompter,
        }
    }

    pub fn prompter(&self) -> &Prompter<R, W> {
        &self.prompter
    }

    pub async fn run(&mut self) -> AppResult<SessionOutcome> {
        let span = self.context.span();
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&mut self) -> AppResult<SessionOutcome> {
        self.prompter.say("Welcome to the anime recommender!")?;
        self.prompter.say("Loading the ranked catalog, please wait...")?;

        let mut catalog = match self.source.fetch_top_ranked(self.context.catalog_size).await {
            Ok(catalog) if !catalog.is_empty() => catalog,
            Ok(_) => {
                tracing::warn!(provider = self.source.name(), "Catalog source returned no titles");
                self.prompter.say("Could not fetch the anime catalog.")?;
                return Ok(SessionOutcome::SourceUnavailable);
            }
            Err(e) => {
                tracing::error!(error = %e, provider = self.source.name(), "Catalog fetch failed");
                self.prompter.say("Could not fetch the anime catalog.")?;
                return Ok(SessionOutcome::SourceUnavailable);
            }
        };

        let mut profile = self.profile_store.load().await?.unwrap_or_default();

        let Some(watched) = self.collect_watched(&mut catalog).await? else {
            self.prompter.say("No watch history given, nothing to recommend.")?;
            return Ok(SessionOutcome::NoWatchHistory);
        };

        self.prompter.say("\nYou marked as watched:")?;
        for anime in &watched {
            self.prompter.say(format!("- {}", anime.title))?;
        }
        self.offer_to_save_watch_list(&watched).await?;

        self.prompter.say("\nMost frequent genres:")?;
        for (genre, count) in genre_histogram(&watched) {
            self.prompter.say(format!("- {}: {}", genre, count))?;
        }

        let limit = self.prompter.ask_recommendation_count()?;

        let excluded: HashSet<AnimeId> = profile
            .watched_anime_ids
            .iter()
            .copied()
            .chain(watched.iter().map(|a| a.id))
            .collect();
        let (recommendations, origin) = self.fallback.recommend_or_pick(
            &self.engine,
            &catalog,
            &excluded,
            &profile.genre_preferences,
            limit,
        );

        self.print_recommendations(&recommendations, origin)?;
        self.offer_to_save_recommendations(&recommendations).await?;

        profile.update(&watched, &recommendations);
        self.profile_store.save(&profile).await?;
        self.print_profile_summary(&profile)?;

        tracing::info!(
            watched = watched.len(),
            recommended = recommendations.len(),
            origin = ?origin,
            "Session completed"
        );

        Ok(SessionOutcome::Completed(SessionReport {
            watched,
            recommendations,
            origin,
            profile,
        }))
    }

    /// Menu loop; `None` only when input runs out
    async fn collect_watched(
        &mut self,
        catalog: &mut Vec<CatalogEntry>,
    ) -> AppResult<Option<Vec<CatalogEntry>>> {
        loop {
            self.prompter.say("\nWhere should your watch history come from?")?;
            self.prompter.say("1 - pick from the current top list")?;
            self.prompter.say(format!(
                "2 - load from {}",
                self.watch_list.path().display()
            ))?;
            self.prompter.say("3 - combine the file with a manual pick")?;

            let Some(choice) = self.prompter.ask("Your choice: ")? else {
                return Ok(None);
            };

            let watched = match parse_menu_choice(&choice) {
                Some(WatchSource::Manual) => self.select_manually(catalog)?,
                Some(WatchSource::File) => self.load_from_file(catalog).await?,
                Some(WatchSource::Merge) => {
                    let from_file = self.load_from_file(catalog).await?;
                    let from_selection = self.select_manually(catalog)?;
                    reconciler::merge(from_file, from_selection)
                }
                None => {
                    self.prompter.say("Please choose 1, 2 or 3.")?;
                    Vec::new()
                }
            };

            if !watched.is_empty() {
                return Ok(Some(watched));
            }

            self.prompter
                .say("Could not build a watch list. Please try again.")?;
        }
    }

    fn select_manually(&mut self, catalog: &[CatalogEntry]) -> AppResult<Vec<CatalogEntry>> {
        let shown = display_window(catalog, self.context.display_window);

        self.prompter
            .say(format!("\nTop {} anime by rank:", shown.len()))?;
        for (i, anime) in shown.iter().enumerate() {
            self.prompter.say(format!("{}. {}", i + 1, anime.title))?;
        }

        let input = self
            .prompter
            .ask("Enter the numbers you have watched, separated by commas: ")?
            .unwrap_or_default();

        Ok(reconciler::select_from_window(
            catalog,
            &input,
            self.context.display_window,
        ))
    }

    async fn load_from_file(
        &mut self,
        catalog: &mut Vec<CatalogEntry>,
    ) -> AppResult<Vec<CatalogEntry>> {
        let path = self.watch_list.path().display().to_string();
        let titles = self.watch_list.load_titles().await?;

        if titles.is_empty() {
            self.prompter
                .say(format!("File {} is empty or missing.", path))?;
            return Ok(Vec::new());
        }

        self.prompter.say(format!("Loading titles from {}...", path))?;
        let outcome = reconciler::import_titles(self.source.clone(), catalog, &titles).await;

        for title in &outcome.missing {
            self.prompter
                .say(format!("Could not find anime \"{}\".", title))?;
        }

        if !outcome.watched.is_empty() {
            self.prompter.say("Loaded as watched:")?;
            for anime in &outcome.watched {
                self.prompter.say(format!("- {}", anime.title))?;
            }
        }

        Ok(outcome.watched)
    }

    async fn offer_to_save_watch_list(&mut self, watched: &[CatalogEntry]) -> AppResult<()> {
        let prompt = format!("\nSave this list to {}?", self.watch_list.path().display());
        if self.prompter.confirm(&prompt)? {
            self.watch_list.save_watched(watched).await?;
            self.prompter.say("List saved.")?;
        }
        Ok(())
    }

    fn print_recommendations(
        &mut self,
        recommendations: &[RecommendationResult],
        origin: RecommendationOrigin,
    ) -> AppResult<()> {
        match origin {
            RecommendationOrigin::Engine => self.prompter.say("\nPicked for you:")?,
            RecommendationOrigin::RandomFallback => self
                .prompter
                .say("\nNo relevant recommendations found, here is a random selection:")?,
        }

        for recommendation in recommendations {
            self.prompter.say(format!(
                "- {} (score {:.2})",
                recommendation.anime.title, recommendation.score
            ))?;
            self.prompter
                .say(format!("  {}", recommendation.explanation))?;
        }
        Ok(())
    }

    async fn offer_to_save_recommendations(
        &mut self,
        recommendations: &[RecommendationResult],
    ) -> AppResult<()> {
        if recommendations.is_empty() {
            return Ok(());
        }

        let prompt = format!(
            "\nSave recommendations to {}?",
            self.recommendations_file.path().display()
        );
        if self.prompter.confirm(&prompt)? {
            self.recommendations_file.save(recommendations).await?;
            self.prompter.say("Recommendations saved.")?;
        }
        Ok(())
    }

    fn print_profile_summary(&mut self, profile: &UserProfile) -> AppResult<()> {
        self.prompter.say("\nProfile updated:")?;
        self.prompter.say(format!(
            "Total watched: {}",
            profile.watched_anime_ids.len()
        ))?;

        let top = profile.summarize(DEFAULT_SUMMARY_SIZE);
        if top.is_empty() {
            self.prompter.say("No genre statistics yet.")?;
        } else {
            self.prompter.say("Favourite genres:")?;
            for (genre, weight) in top {
                self.prompter.say(format!("- {}: {}", genre, weight))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::providers::MockCatalogSource;
    use crate::storage::JsonProfileStore;
    use std::io::Cursor;
    use tempfile::TempDir;

    type TestSession = Session<Cursor<Vec<u8>>, Vec<u8>>;

    fn session(temp_dir: &TempDir, source: MockCatalogSource, input: &str) -> TestSession {
        Session::new(
            SessionContext::new(10, 5),
            Arc::new(source),
            Arc::new(JsonProfileStore::new(temp_dir.path().join("profile.json"))),
            WatchListFile::new(temp_dir.path().join("watched.txt")),
            RecommendationsFile::new(temp_dir.path().join("recs.txt")),
            RandomFallback::new(Some(1)),
            Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new()),
        )
    }

    fn output(session: &TestSession) -> String {
        String::from_utf8(session.prompter().writer().clone()).unwrap()
    }

    fn catalog() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new(1, "Frieren", ["Adventure", "Drama", "Fantasy"]),
            CatalogEntry::new(2, "Gintama", ["Action", "Comedy"]),
            CatalogEntry::new(3, "Steins;Gate", ["Drama", "Sci-Fi"]),
            CatalogEntry::new(4, "Bocchi the Rock!", ["Comedy", "Music"]),
            CatalogEntry::new(5, "Made in Abyss", ["Adventure", "Fantasy"]),
            CatalogEntry::new(6, "Clannad", ["Drama", "Romance"]),
        ]
    }

    #[tokio::test]
    async fn test_empty_catalog_aborts_without_writes() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = MockCatalogSource::new();
        source.expect_fetch_top_ranked().returning(|_| Ok(vec![]));
        source.expect_find_by_title().never();
        source.expect_name().return_const("mock");

        let mut session = session(&temp_dir, source, "1\n1\n");
        let outcome = session.run().await.unwrap();

        assert_eq!(outcome, SessionOutcome::SourceUnavailable);
        assert!(output(&session).contains("Could not fetch the anime catalog."));
        assert!(!temp_dir.path().join("profile.json").exists());
    }

    #[tokio::test]
    async fn test_fetch_error_aborts_without_writes() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = MockCatalogSource::new();
        source
            .expect_fetch_top_ranked()
            .returning(|_| Err(AppError::ExternalApi("502".to_string())));
        source.expect_name().return_const("mock");

        let mut session = session(&temp_dir, source, "");
        assert_eq!(session.run().await.unwrap(), SessionOutcome::SourceUnavailable);
        assert!(!temp_dir.path().join("profile.json").exists());
    }

    #[tokio::test]
    async fn test_manual_session_first_run_uses_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = MockCatalogSource::new();
        source
            .expect_fetch_top_ranked()
            .withf(|count| *count == 10)
            .returning(|_| Ok(catalog()));
        source.expect_name().return_const("mock");

        // menu, picks, save list?, count, save recs?
        let mut session = session(&temp_dir, source, "1\n1,3\nn\n2\nn\n");
        let outcome = session.run().await.unwrap();

        let SessionOutcome::Completed(report) = outcome else {
            panic!("session did not complete");
        };
        assert_eq!(report.origin, RecommendationOrigin::RandomFallback);
        assert_eq!(report.recommendations.len(), 2);
        assert!(report
            .recommendations
            .iter()
            .all(|r| r.anime.id != 1 && r.anime.id != 3));
        assert_eq!(report.profile.watched_anime_ids, vec![1, 3]);
        assert_eq!(report.profile.genre_preferences["Drama"], 2);

        let out = output(&session);
        assert!(out.contains("Top 5 anime by rank:"));
        assert!(!out.contains("6. Clannad"));
        assert!(out.contains("random selection"));
        assert!(temp_dir.path().join("profile.json").exists());
        assert!(!temp_dir.path().join("watched.txt").exists());
    }

    #[tokio::test]
    async fn test_second_run_uses_stored_preferences() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonProfileStore::new(temp_dir.path().join("profile.json"));
        let mut profile = UserProfile::new();
        profile.update(&[catalog()[0].clone()], &[]);
        store.save(&profile).await.unwrap();

        let mut source = MockCatalogSource::new();
        source.expect_fetch_top_ranked().returning(|_| Ok(catalog()));
        source.expect_name().return_const("mock");

        let mut session = session(&temp_dir, source, "9\n1\n3\ny\n\ny\n");
        let outcome = session.run().await.unwrap();

        let SessionOutcome::Completed(report) = outcome else {
            panic!("session did not complete");
        };
        assert_eq!(report.origin, RecommendationOrigin::Engine);
        // Frieren is known from the stored profile, Steins;Gate from this session
        let ids: Vec<AnimeId> = report.recommendations.iter().map(|r| r.anime.id).collect();
        assert_eq!(ids, vec![5, 6]);
        assert_eq!(report.profile.watched_anime_ids, vec![1, 3]);
        assert_eq!(report.profile.last_recommendations, vec!["Made in Abyss", "Clannad"]);

        let out = output(&session);
        assert!(out.contains("Please choose 1, 2 or 3."));
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("watched.txt")).unwrap(),
            "Steins;Gate\n"
        );
        let saved = std::fs::read_to_string(temp_dir.path().join("recs.txt")).unwrap();
        assert!(saved.starts_with("Made in Abyss — matches your genres: Adventure, Fantasy (score 2.00)"));
    }

    #[tokio::test]
    async fn test_eof_before_history_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut source = MockCatalogSource::new();
        source.expect_fetch_top_ranked().returning(|_| Ok(catalog()));
        source.expect_name().return_const("mock");

        let mut session = session(&temp_dir, source, "1\n\n");
        let outcome = session.run().await.unwrap();

        assert_eq!(outcome, SessionOutcome::NoWatchHistory);
        assert!(output(&session).contains("Could not build a watch list."));
        assert!(!temp_dir.path().join("profile.json").exists());
    }

    #[tokio::test]
    async fn test_file_import_resolves_through_source() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("watched.txt"),
            "gintama\nMushishi\nNo Such Show\n",
        )
        .unwrap();

        let mut source = MockCatalogSource::new();
        source.expect_fetch_top_ranked().returning(|_| Ok(catalog()));
        source
            .expect_find_by_title()
            .returning(|title| match title {
                "Mushishi" => Ok(Some(CatalogEntry::new(457, "Mushishi", ["Mystery"]))),
                _ => Ok(None),
            });
        source.expect_name().return_const("mock");

        let mut session = session(&temp_dir, source, "2\nn\n10\nn\n");
        let outcome = session.run().await.unwrap();

        let SessionOutcome::Completed(report) = outcome else {
            panic!("session did not complete");
        };
        let ids: Vec<AnimeId> = report.watched.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 457]);
        assert_eq!(report.profile.genre_preferences["Mystery"], 1);
        assert!(output(&session).contains("Could not find anime \"No Such Show\"."));
    }
}
