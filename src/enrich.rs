//! Per-title enrichment: details, credits, keywords from the catalog plus
//! ratings from the secondary provider. Failure severity is graded: a failed
//! detail fetch skips the title, failed credits or keywords degrade to empty,
//! and only ratings key exhaustion stops the run.

use crate::catalog::{CatalogApi, Credits};
use crate::ratings::{RatingsApi, RatingsError, RatingsResolver};
use crate::record::EnrichedRecord;

pub struct ItemEnricher<'a, C: CatalogApi> {
    api: &'a C,
}

impl<'a, C: CatalogApi> ItemEnricher<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    /// Build the full record for one title. `Ok(None)` means the title is
    /// skipped this run and stays eligible for the next one.
    pub fn enrich<R: RatingsApi>(
        &self,
        resolver: &mut RatingsResolver<R>,
        id: u64,
    ) -> Result<Option<EnrichedRecord>, RatingsError> {
        let details = match self.api.details(id) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(id, error = %e, "detail fetch failed, skipping title");
                return Ok(None);
            }
        };

        let credits = match self.api.credits(id) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(id, error = %e, "credits fetch failed, keeping title without them");
                Credits::default()
            }
        };

        let keywords = match self.api.keywords(id) {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!(id, error = %e, "keyword fetch failed, keeping title without them");
                Vec::new()
            }
        };

        let (awards, ratings) = match resolver.lookup(details.imdb_id.as_deref().unwrap_or(""))? {
            Some(report) => (report.awards, Some(report.ratings)),
            None => (None, None),
        };

        Ok(Some(EnrichedRecord::assemble(
            details, credits, keywords, awards, ratings,
        )))
    }
}
