use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the catalog API key.
pub const ENV_API_KEY: &str = "CINETL_API_KEY";
/// Environment variable holding the ratings API keys (comma separated, tried in order).
pub const ENV_RATINGS_KEYS: &str = "CINETL_RATINGS_KEYS";

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct HarvestOptions {
    pub data_dir: PathBuf,            // checkpoint, shards and genre map live here
    pub api_key: String,
    pub ratings_keys: Vec<String>,    // ordered; rotated front to back, never wrapped
    pub language: String,
    pub newest_year: u16,             // walk descends from here
    pub oldest_year: u16,             // inclusive lower bound
    pub min_votes: u32,               // discovery filter: vote_count.gte
    pub page_cap: u32,                // upstream refuses discovery pages past 500
    pub max_shard_bytes: u64,
    pub item_delay: Duration,         // pause after each persisted item
    pub page_delay: Duration,         // pause after each completed page
    pub request_timeout: Duration,
    pub catalog_base_url: String,
    pub ratings_base_url: String,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_key: String::new(),
            ratings_keys: Vec::new(),
            language: "en-US".to_string(),
            newest_year: current_utc_year(),
            oldest_year: 1970,
            min_votes: 30,
            page_cap: 500,
            max_shard_bytes: 20 * 1024 * 1024,
            item_delay: Duration::from_millis(350),
            page_delay: Duration::from_millis(2500),
            request_timeout: Duration::from_secs(10),
            catalog_base_url: "https://api.themoviedb.org/3".to_string(),
            ratings_base_url: "http://www.omdbapi.com/".to_string(),
        }
    }
}

impl HarvestOptions {
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }
    pub fn with_ratings_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ratings_keys = keys.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
    pub fn with_year_range(mut self, newest: u16, oldest: u16) -> Self {
        self.newest_year = newest;
        self.oldest_year = oldest.min(newest);
        self
    }
    pub fn with_min_votes(mut self, votes: u32) -> Self {
        self.min_votes = votes;
        self
    }
    pub fn with_max_shard_bytes(mut self, bytes: u64) -> Self {
        self.max_shard_bytes = bytes.max(1);
        self
    }
    pub fn with_delays(mut self, item: Duration, page: Duration) -> Self {
        self.item_delay = item;
        self.page_delay = page;
        self
    }
    /// Zero out the politeness delays. Meant for tests and dry runs.
    pub fn with_no_delays(self) -> Self {
        self.with_delays(Duration::ZERO, Duration::ZERO)
    }
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
    pub fn with_catalog_base_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_base_url = url.into();
        self
    }
    pub fn with_ratings_base_url(mut self, url: impl Into<String>) -> Self {
        self.ratings_base_url = url.into();
        self
    }

    /// Pull credentials from the environment, keeping any explicitly set value
    /// when the corresponding variable is unset or blank.
    pub fn with_env_credentials(mut self) -> Self {
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            let key = key.trim();
            if !key.is_empty() {
                self.api_key = key.to_string();
            }
        }
        if let Ok(raw) = std::env::var(ENV_RATINGS_KEYS) {
            let keys: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
            if !keys.is_empty() {
                self.ratings_keys = keys;
            }
        }
        self
    }
}

fn current_utc_year() -> u16 {
    let year = time::OffsetDateTime::now_utc().year();
    year.clamp(1970, u16::MAX as i32) as u16
}
