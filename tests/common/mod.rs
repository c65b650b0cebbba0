use cinetl::{
    ApiError, CancelFlag, CastEntry, CatalogApi, Credits, CrewEntry, DiscoverPage, DiscoveredItem,
    Genre, HarvestOptions, MovieDetails, NamedItem, RatingEntry, RatingsApi, RatingsReply,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Fresh on-disk workspace for one test, left in place so shards and the
/// checkpoint survive across the several runs a test performs.
pub fn make_data_dir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

/// Options wired for the fakes: one release year, zero delays, three
/// scriptable ratings keys.
pub fn test_options(dir: &Path) -> HarvestOptions {
    HarvestOptions::default()
        .with_data_dir(dir)
        .with_api_key("test-key")
        .with_ratings_keys(["k1", "k2", "k3"])
        .with_year_range(2024, 2024)
        .with_no_delays()
}

fn named(name: &str) -> NamedItem {
    NamedItem { name: Some(name.to_string()) }
}

/// Deterministic detail payload for one id, cross-reference id included.
pub fn canned_details(id: u64) -> MovieDetails {
    MovieDetails {
        id,
        title: Some(format!("Movie {id}")),
        original_title: Some(format!("Movie {id}")),
        overview: Some("Two strangers swap houses for a summer.".to_string()),
        release_date: Some(format!("2024-01-{:02}", (id % 27) + 1)),
        runtime: Some(90 + (id % 60) as u32),
        budget: Some(1_000_000 + id),
        revenue: Some(3_000_000 + id),
        genres: vec![named("Drama"), named("Comedy")],
        production_companies: vec![named("Fake Pictures")],
        popularity: Some(10.5),
        vote_average: Some(7.1),
        vote_count: Some(100 + id),
        original_language: Some("en".to_string()),
        adult: Some(false),
        poster_path: Some(format!("/p{id}.jpg")),
        backdrop_path: None,
        imdb_id: Some(format!("tt{id:07}")),
        belongs_to_collection: None,
    }
}

/// Scripted stand-in for the catalog service. Pages are keyed by release
/// year; the counters and failure sets let a test pin down exactly which
/// requests a run makes.
#[derive(Default)]
pub struct FakeCatalog {
    pages: BTreeMap<u16, Vec<Vec<u64>>>,
    pub discover_calls: Cell<usize>,
    pub detail_calls: Cell<usize>,
    pub discover_log: RefCell<Vec<(u16, u32)>>,
    fail_discover: BTreeSet<u16>,
    fail_details: BTreeSet<u64>,
    fail_credits: BTreeSet<u64>,
    fail_keywords: BTreeSet<u64>,
    no_imdb: BTreeSet<u64>,
    fail_genres: bool,
    cancel_after_details: RefCell<Option<(usize, CancelFlag)>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: u16, pages: Vec<Vec<u64>>) -> Self {
        self.pages.insert(year, pages);
        self
    }

    pub fn with_failing_discover(mut self, year: u16) -> Self {
        self.fail_discover.insert(year);
        self
    }

    pub fn with_failing_details(mut self, id: u64) -> Self {
        self.fail_details.insert(id);
        self
    }

    pub fn with_failing_credits(mut self, id: u64) -> Self {
        self.fail_credits.insert(id);
        self
    }

    pub fn with_failing_keywords(mut self, id: u64) -> Self {
        self.fail_keywords.insert(id);
        self
    }

    pub fn without_imdb_id(mut self, id: u64) -> Self {
        self.no_imdb.insert(id);
        self
    }

    pub fn with_failing_genres(mut self) -> Self {
        self.fail_genres = true;
        self
    }

    /// Trip `flag` once the n-th detail request lands, interrupting a run at
    /// a deterministic point mid-page.
    pub fn cancel_after_details(&self, n: usize, flag: CancelFlag) {
        *self.cancel_after_details.borrow_mut() = Some((n, flag));
    }
}

impl CatalogApi for FakeCatalog {
    fn discover(&self, year: u16, page: u32) -> Result<DiscoverPage, ApiError> {
        self.discover_calls.set(self.discover_calls.get() + 1);
        self.discover_log.borrow_mut().push((year, page));
        if self.fail_discover.contains(&year) {
            return Err(ApiError::Unavailable(format!("discovery down for {year}")));
        }
        let pages = self.pages.get(&year).cloned().unwrap_or_default();
        let results = pages
            .get(page.saturating_sub(1) as usize)
            .map(|ids| {
                ids.iter()
                    .map(|&id| DiscoveredItem { id, title: Some(format!("Movie {id}")) })
                    .collect()
            })
            .unwrap_or_default();
        Ok(DiscoverPage { results, total_pages: pages.len() as u32 })
    }

    fn details(&self, id: u64) -> Result<MovieDetails, ApiError> {
        self.detail_calls.set(self.detail_calls.get() + 1);
        if let Some((after, flag)) = self.cancel_after_details.borrow().as_ref() {
            if self.detail_calls.get() >= *after {
                flag.cancel();
            }
        }
        if self.fail_details.contains(&id) {
            return Err(ApiError::Unavailable(format!("details down for {id}")));
        }
        let mut details = canned_details(id);
        if self.no_imdb.contains(&id) {
            details.imdb_id = None;
        }
        Ok(details)
    }

    fn credits(&self, id: u64) -> Result<Credits, ApiError> {
        if self.fail_credits.contains(&id) {
            return Err(ApiError::Unavailable(format!("credits down for {id}")));
        }
        Ok(Credits {
            cast: vec![CastEntry {
                name: Some("Ana Lee".to_string()),
                character: Some("Lead".to_string()),
            }],
            crew: vec![CrewEntry {
                name: Some("Sam Roy".to_string()),
                department: Some("Directing".to_string()),
            }],
        })
    }

    fn keywords(&self, id: u64) -> Result<Vec<String>, ApiError> {
        if self.fail_keywords.contains(&id) {
            return Err(ApiError::Unavailable(format!("keywords down for {id}")));
        }
        Ok(vec!["heist".to_string(), "summer".to_string()])
    }

    fn genre_list(&self) -> Result<Vec<Genre>, ApiError> {
        if self.fail_genres {
            return Err(ApiError::Unavailable("genre list down".to_string()));
        }
        Ok(vec![
            Genre { id: 18, name: "Drama".to_string() },
            Genre { id: 35, name: "Comedy".to_string() },
        ])
    }
}

/// What one scripted key does when asked.
#[derive(Clone, Copy)]
pub enum KeyScript {
    Ok,
    RateLimited,
    Broken,
}

/// Scripted ratings provider. Keys without a script answer successfully.
#[derive(Default)]
pub struct FakeRatings {
    scripts: BTreeMap<String, KeyScript>,
    pub calls: Cell<usize>,
}

impl FakeRatings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: &str, script: KeyScript) -> Self {
        self.scripts.insert(key.to_string(), script);
        self
    }
}

impl RatingsApi for FakeRatings {
    fn fetch(&self, external_id: &str, api_key: &str) -> Result<RatingsReply, ApiError> {
        self.calls.set(self.calls.get() + 1);
        match self.scripts.get(api_key) {
            Some(KeyScript::RateLimited) => Ok(RatingsReply {
                response: Some("False".to_string()),
                error: Some("Request limit reached!".to_string()),
                ..RatingsReply::default()
            }),
            Some(KeyScript::Broken) => Err(ApiError::Unavailable(format!("key {api_key} refused"))),
            Some(KeyScript::Ok) | None => Ok(RatingsReply {
                response: Some("True".to_string()),
                awards: Some(format!("2 wins for {external_id}")),
                ratings: vec![
                    rating("Internet Movie Database", "8.5/10"),
                    rating("Rotten Tomatoes", "94%"),
                    rating("Metacritic", "74/100"),
                ],
                ..RatingsReply::default()
            }),
        }
    }
}

fn rating(source: &str, value: &str) -> RatingEntry {
    RatingEntry { source: source.to_string(), value: value.to_string() }
}

/// Every record id across all shards, in shard-then-array order.
pub fn read_shard_ids(dir: &Path) -> Vec<u64> {
    let mut ids = Vec::new();
    for (_, path) in cinetl::list_shards(dir) {
        for record in cinetl::read_json_array(&path).unwrap() {
            ids.push(record.get("id").and_then(|v| v.as_u64()).unwrap());
        }
    }
    ids
}

pub fn load_checkpoint(dir: &Path) -> cinetl::Checkpoint {
    cinetl::CheckpointStore::new(dir).load()
}

/// Write a raw shard file directly, for converter tests.
pub fn write_shard(dir: &Path, index: u32, records: serde_json::Value) {
    std::fs::create_dir_all(dir).unwrap();
    let text = serde_json::to_vec_pretty(&records).unwrap();
    std::fs::write(cinetl::shard_path(dir, index), text).unwrap();
}
