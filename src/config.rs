use serde::Deserialize;

/// Application configuration loaded from `ANIME_`-prefixed environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Shikimori API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// User-Agent sent with every catalog request (Shikimori rejects anonymous clients)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum spacing between two catalog requests, in milliseconds
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,

    /// Number of top-ranked titles fetched at session start
    #[serde(default = "default_catalog_size")]
    pub catalog_size: usize,

    /// How many catalog entries the manual-selection menu shows
    #[serde(default = "default_display_window")]
    pub display_window: usize,

    /// Flat file with one watched title per line
    #[serde(default = "default_watch_list_path")]
    pub watch_list_path: String,

    /// Where accepted recommendations are written
    #[serde(default = "default_recommendations_path")]
    pub recommendations_path: String,

    /// JSON profile store
    #[serde(default = "default_profile_path")]
    pub profile_path: String,

    /// Fixed seed for the random fallback; entropy-seeded when unset
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_api_url() -> String {
    "https://shikimori.one/api".to_string()
}

fn default_user_agent() -> String {
    "anime-recommender".to_string()
}

fn default_request_interval_ms() -> u64 {
    200
}

fn default_catalog_size() -> usize {
    150
}

fn default_display_window() -> usize {
    50
}

fn default_watch_list_path() -> String {
    "Data/watched.txt".to_string()
}

fn default_recommendations_path() -> String {
    "Data/recommendations.txt".to_string()
}

fn default_profile_path() -> String {
    "Storage/user_profile.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            request_interval_ms: default_request_interval_ms(),
            catalog_size: default_catalog_size(),
            display_window: default_display_window(),
            watch_list_path: default_watch_list_path(),
            recommendations_path: default_recommendations_path(),
            profile_path: default_profile_path(),
            random_seed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed("ANIME_")
            .from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_vars(vars(&[("PATH", "/usr/bin")])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.catalog_size, 150);
        assert_eq!(config.display_window, 50);
        assert_eq!(config.request_interval_ms, 200);
        assert_eq!(config.random_seed, None);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("ANIME_CATALOG_SIZE", "60"),
            ("ANIME_PROFILE_PATH", "/tmp/profile.json"),
            ("ANIME_RANDOM_SEED", "42"),
            ("ANIME_REQUEST_INTERVAL_MS", "1000"),
        ]))
        .unwrap();

        assert_eq!(config.catalog_size, 60);
        assert_eq!(config.profile_path, "/tmp/profile.json");
        assert_eq!(config.random_seed, Some(42));
        assert_eq!(config.request_interval_ms, 1000);
        assert_eq!(config.api_url, "https://shikimori.one/api");
    }

    #[test]
    fn test_invalid_number_rejected() {
        let result = Config::from_vars(vars(&[("ANIME_CATALOG_SIZE", "lots")]));
        assert!(result.is_err());
    }
}
