//! Secondary ratings lookup behind a rotating credential set.
//!
//! Every lookup walks the `KeySet` forward: a rate-limited or failing key is
//! abandoned for the rest of the process and the next one is tried
//! immediately. Once the last key is spent the whole run stops; the cursor
//! never wraps back to the front.

use crate::catalog::ApiError;
use crate::config::HarvestOptions;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reply body marking a key whose daily quota is spent. The provider answers
/// HTTP 200 with this error string rather than a limit status code.
const RATE_LIMIT_SENTINEL: &str = "Request limit reached!";

#[derive(Debug, Error)]
pub enum RatingsError {
    #[error("all {0} ratings API keys exhausted")]
    KeysExhausted(usize),
}

/// Raw provider reply. Decoded as received; interpretation happens in the
/// resolver.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RatingsReply {
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
    #[serde(rename = "Awards", default)]
    pub awards: Option<String>,
    #[serde(rename = "Ratings", default)]
    pub ratings: Vec<RatingEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RatingEntry {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl RatingsReply {
    pub fn is_rate_limited(&self) -> bool {
        self.error.as_deref() == Some(RATE_LIMIT_SENTINEL)
    }

    /// Map the provider's rating entries into the three named slots, keeping
    /// the values verbatim ("8.5/10", "94%", "74/100").
    pub fn into_report(self) -> RatingsReport {
        let mut summary = RatingsSummary::default();
        for entry in self.ratings {
            match entry.source.as_str() {
                "Internet Movie Database" => summary.imdb = Some(entry.value),
                "Rotten Tomatoes" => summary.rotten_tomatoes = Some(entry.value),
                "Metacritic" => summary.metacritic = Some(entry.value),
                _ => {}
            }
        }
        RatingsReport { awards: self.awards, ratings: summary }
    }
}

/// The three rating slots carried on every output record; each stays null
/// when the provider did not return that source.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RatingsSummary {
    pub imdb: Option<String>,
    pub rotten_tomatoes: Option<String>,
    pub metacritic: Option<String>,
}

/// What one successful lookup contributes to a record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RatingsReport {
    pub awards: Option<String>,
    pub ratings: RatingsSummary,
}

/// Ordered credentials with a monotonic cursor. `advance` moves forward only;
/// past the last key the set stays empty for the rest of the process.
#[derive(Clone, Debug)]
pub struct KeySet {
    keys: Vec<String>,
    cursor: usize,
}

impl KeySet {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys, cursor: 0 }
    }

    /// Start at a given cursor. For embedders that persist rotation state
    /// across processes; the collector itself starts fresh each run.
    pub fn starting_at(keys: Vec<String>, cursor: usize) -> Self {
        Self { keys, cursor }
    }

    pub fn current(&self) -> Option<&str> {
        self.keys.get(self.cursor).map(String::as_str)
    }

    pub fn advance(&mut self) {
        if self.cursor < self.keys.len() {
            self.cursor += 1;
        }
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Blocking view of the ratings provider: one request with one explicit key.
pub trait RatingsApi {
    fn fetch(&self, external_id: &str, api_key: &str) -> Result<RatingsReply, ApiError>;
}

impl<R: RatingsApi + ?Sized> RatingsApi for &R {
    fn fetch(&self, external_id: &str, api_key: &str) -> Result<RatingsReply, ApiError> {
        (**self).fetch(external_id, api_key)
    }
}

#[derive(Clone, Debug)]
pub struct HttpRatingsApi {
    http: Client,
    base_url: String,
}

impl HttpRatingsApi {
    pub fn new(opts: &HarvestOptions) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(opts.request_timeout).build()?;
        Ok(Self { http, base_url: opts.ratings_base_url.trim_end_matches('/').to_string() })
    }
}

impl RatingsApi for HttpRatingsApi {
    fn fetch(&self, external_id: &str, api_key: &str) -> Result<RatingsReply, ApiError> {
        let resp = self
            .http
            .get(format!("{}/", self.base_url))
            .query(&[("i", external_id), ("apikey", api_key)])
            .send()?
            .error_for_status()?;
        Ok(resp.json()?)
    }
}

/// Rotates through the `KeySet` until a lookup succeeds or the set runs out.
pub struct RatingsResolver<R: RatingsApi> {
    api: R,
    keys: KeySet,
}

impl<R: RatingsApi> RatingsResolver<R> {
    pub fn new(api: R, keys: KeySet) -> Self {
        Self { api, keys }
    }

    /// Index of the key the next lookup will try first.
    pub fn cursor(&self) -> usize {
        self.keys.cursor()
    }

    /// Look up one cross-reference id. An empty id resolves to `Ok(None)`
    /// without touching the network or the key cursor. With M keys left this
    /// makes at most M requests; `KeysExhausted` means no key remains and the
    /// run must stop.
    pub fn lookup(&mut self, external_id: &str) -> Result<Option<RatingsReport>, RatingsError> {
        if external_id.is_empty() {
            return Ok(None);
        }
        loop {
            let Some(key) = self.keys.current() else {
                return Err(RatingsError::KeysExhausted(self.keys.len()));
            };
            match self.api.fetch(external_id, key) {
                Ok(reply) if reply.is_rate_limited() => {
                    tracing::warn!(
                        key_index = self.keys.cursor(),
                        "ratings key over its daily limit, rotating"
                    );
                    self.keys.advance();
                }
                Ok(reply) => return Ok(Some(reply.into_report())),
                Err(e) => {
                    tracing::warn!(
                        key_index = self.keys.cursor(),
                        error = %e,
                        "ratings request failed, rotating key"
                    );
                    self.keys.advance();
                }
            }
        }
    }
}
