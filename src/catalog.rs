//! Primary catalog API: paged discovery plus per-title detail, credits and
//! keyword endpoints. The `CatalogApi` trait is the seam the collector runs
//! against; `HttpCatalogApi` is the blocking production implementation.

use crate::config::HarvestOptions;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure talking to an upstream API. Callers decide whether
/// a failure skips the item, ends the partition or rotates a credential.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// One item of a discovery batch. Only the id matters downstream; the title
/// is kept for logging.
#[derive(Clone, Debug, Deserialize)]
pub struct DiscoveredItem {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DiscoverPage {
    #[serde(default)]
    pub results: Vec<DiscoveredItem>,
    #[serde(default)]
    pub total_pages: u32,
}

/// Anything the upstream names, where only the name is kept (genres,
/// production companies, keywords).
#[derive(Clone, Debug, Deserialize)]
pub struct NamedItem {
    #[serde(default)]
    pub name: Option<String>,
}

/// Full detail payload for one title, projected down to the fields the
/// output record carries. Values are stored as received; absent or null
/// upstream fields stay None.
#[derive(Clone, Debug, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub budget: Option<u64>,
    #[serde(default)]
    pub revenue: Option<u64>,
    #[serde(default)]
    pub genres: Vec<NamedItem>,
    #[serde(default)]
    pub production_companies: Vec<NamedItem>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub adult: Option<bool>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub belongs_to_collection: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CastEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CrewEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastEntry>,
    #[serde(default)]
    pub crew: Vec<CrewEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordsReply {
    #[serde(default)]
    keywords: Vec<NamedItem>,
}

#[derive(Debug, Default, Deserialize)]
struct GenresReply {
    #[serde(default)]
    genres: Vec<Genre>,
}

/// Blocking view of the catalog service. One call, one request; retries and
/// failure policy live with the callers.
pub trait CatalogApi {
    fn discover(&self, year: u16, page: u32) -> Result<DiscoverPage, ApiError>;
    fn details(&self, id: u64) -> Result<MovieDetails, ApiError>;
    fn credits(&self, id: u64) -> Result<Credits, ApiError>;
    fn keywords(&self, id: u64) -> Result<Vec<String>, ApiError>;
    fn genre_list(&self) -> Result<Vec<Genre>, ApiError>;
}

impl<C: CatalogApi + ?Sized> CatalogApi for &C {
    fn discover(&self, year: u16, page: u32) -> Result<DiscoverPage, ApiError> {
        (**self).discover(year, page)
    }
    fn details(&self, id: u64) -> Result<MovieDetails, ApiError> {
        (**self).details(id)
    }
    fn credits(&self, id: u64) -> Result<Credits, ApiError> {
        (**self).credits(id)
    }
    fn keywords(&self, id: u64) -> Result<Vec<String>, ApiError> {
        (**self).keywords(id)
    }
    fn genre_list(&self) -> Result<Vec<Genre>, ApiError> {
        (**self).genre_list()
    }
}

#[derive(Clone, Debug)]
pub struct HttpCatalogApi {
    http: Client,
    base_url: String,
    api_key: String,
    language: String,
    min_votes: u32,
}

impl HttpCatalogApi {
    pub fn new(opts: &HarvestOptions) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(opts.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: opts.catalog_base_url.trim_end_matches('/').to_string(),
            api_key: opts.api_key.clone(),
            language: opts.language.clone(),
            min_votes: opts.min_votes,
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(url).query(query).send()?.error_for_status()?;
        Ok(resp.json()?)
    }

    fn keyed_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("language", self.language.clone()),
        ]
    }
}

impl CatalogApi for HttpCatalogApi {
    fn discover(&self, year: u16, page: u32) -> Result<DiscoverPage, ApiError> {
        let mut query = self.keyed_query();
        query.push(("sort_by", "popularity.desc".to_string()));
        query.push(("page", page.to_string()));
        query.push(("primary_release_year", year.to_string()));
        query.push(("vote_count.gte", self.min_votes.to_string()));
        query.push(("include_adult", "false".to_string()));
        self.get_json("/discover/movie", &query)
    }

    fn details(&self, id: u64) -> Result<MovieDetails, ApiError> {
        self.get_json(&format!("/movie/{id}"), &self.keyed_query())
    }

    fn credits(&self, id: u64) -> Result<Credits, ApiError> {
        self.get_json(&format!("/movie/{id}/credits"), &self.keyed_query())
    }

    fn keywords(&self, id: u64) -> Result<Vec<String>, ApiError> {
        let reply: KeywordsReply = self.get_json(
            &format!("/movie/{id}/keywords"),
            &[("api_key", self.api_key.clone())],
        )?;
        Ok(reply.keywords.into_iter().filter_map(|k| k.name).collect())
    }

    fn genre_list(&self) -> Result<Vec<Genre>, ApiError> {
        let reply: GenresReply = self.get_json("/genre/movie/list", &self.keyed_query())?;
        Ok(reply.genres)
    }
}
