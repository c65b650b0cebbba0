use crate::catalog::{Credits, MovieDetails, NamedItem};
use crate::ratings::RatingsSummary;
use serde::{Deserialize, Serialize};

/// One fully enriched title, exactly as it lands in a shard file. Field
/// values are carried through from the upstream payloads untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub id: u64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub awards: Option<String>,
    pub ratings: Option<RatingsSummary>,
    #[serde(default)]
    pub production_companies: Vec<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub original_language: Option<String>,
    pub adult: Option<bool>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub imdb_id: Option<String>,
    pub belongs_to_collection: Option<serde_json::Value>,
    #[serde(default)]
    pub credits: Credits,
}

impl EnrichedRecord {
    pub fn assemble(
        details: MovieDetails,
        credits: Credits,
        keywords: Vec<String>,
        awards: Option<String>,
        ratings: Option<RatingsSummary>,
    ) -> Self {
        Self {
            id: details.id,
            title: details.title,
            original_title: details.original_title,
            overview: details.overview,
            release_date: details.release_date,
            runtime: details.runtime,
            budget: details.budget,
            revenue: details.revenue,
            genres: names(details.genres),
            keywords,
            awards,
            ratings,
            production_companies: names(details.production_companies),
            popularity: details.popularity,
            vote_average: details.vote_average,
            vote_count: details.vote_count,
            original_language: details.original_language,
            adult: details.adult,
            poster_path: details.poster_path,
            backdrop_path: details.backdrop_path,
            imdb_id: details.imdb_id,
            belongs_to_collection: details.belongs_to_collection,
            credits,
        }
    }
}

fn names(items: Vec<NamedItem>) -> Vec<String> {
    items.into_iter().filter_map(|i| i.name).collect()
}
