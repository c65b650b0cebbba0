//! The collection state machine: a descending walk over release-year
//! partitions, pages within a partition and items within a page. Network
//! calls are blocking and strictly sequential. The checkpoint is saved after
//! every appended item and every finished page; a resume honors the mid-page
//! offset only when the shard scan shows its record on disk, so a hard kill
//! costs at most one re-walked page.

use crate::catalog::{CatalogApi, HttpCatalogApi};
use crate::checkpoint::CheckpointStore;
use crate::config::{HarvestOptions, ENV_API_KEY, ENV_RATINGS_KEYS};
use crate::dedup::DedupIndex;
use crate::discover::{release_years, CatalogPaginator};
use crate::enrich::ItemEnricher;
use crate::ratings::{HttpRatingsApi, KeySet, RatingsApi, RatingsError, RatingsResolver};
use crate::sink::OutputSink;
use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;

/// Cooperative cancellation handle, safe to trip from a signal handler.
/// The walk checks it between units of work; an in-flight request is never
/// aborted.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a run ended. Every variant leaves a checkpoint behind; `Exhausted`
/// and `Interrupted` runs pick up from it next time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarvestOutcome {
    Completed,
    Exhausted,
    Interrupted,
}

#[derive(Clone, Debug)]
pub struct HarvestSummary {
    pub outcome: HarvestOutcome,
    pub new_records: usize,
    pub total_known: usize,
}

pub struct Harvester<C: CatalogApi, R: RatingsApi> {
    opts: HarvestOptions,
    catalog: C,
    ratings: RatingsResolver<R>,
    cancel: CancelFlag,
}

impl<C: CatalogApi, R: RatingsApi> Harvester<C, R> {
    pub fn new(opts: HarvestOptions, catalog: C, ratings_api: R) -> Self {
        let keys = KeySet::new(opts.ratings_keys.clone());
        Self {
            opts,
            catalog,
            ratings: RatingsResolver::new(ratings_api, keys),
            cancel: CancelFlag::new(),
        }
    }

    /// Clone of the cancel handle, for wiring into a signal handler or
    /// another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn run(&mut self) -> Result<HarvestSummary> {
        let store = CheckpointStore::new(&self.opts.data_dir);
        let mut position = store.load();
        let years = release_years(self.opts.newest_year, self.opts.oldest_year);
        let mut dedup = DedupIndex::scan(&self.opts.data_dir);
        tracing::info!(known = dedup.len(), "starting collection");

        if position.partition_index >= years.len() {
            tracing::info!(partitions = years.len(), "all release years already collected");
            return Ok(HarvestSummary {
                outcome: HarvestOutcome::Completed,
                new_records: 0,
                total_known: dedup.len(),
            });
        }

        let mut sink = OutputSink::new(&self.opts.data_dir, self.opts.max_shard_bytes)
            .starting_at(position.last_shard_index);
        let paginator = CatalogPaginator::new(&self.catalog, self.opts.page_cap);
        let enricher = ItemEnricher::new(&self.catalog);
        // Graceful exits flush before their final save, so a keyed record
        // missing from the shard scan means the process died with the page
        // buffer still in memory. Drop the offset and re-walk that page;
        // dedup filters whatever did land.
        let mut pending_offset = position.last_item_key.clone();
        if let Some(key) = &pending_offset {
            let persisted = key.parse::<u64>().map(|id| dedup.contains(id)).unwrap_or(false);
            if !persisted {
                tracing::warn!(
                    key = %key,
                    "checkpointed item absent from shards, re-walking its page"
                );
                pending_offset = None;
            }
        }
        let mut new_records = 0usize;

        let first_partition = position.partition_index;
        let resume_page = position.page.max(1);

        for pi in first_partition..years.len() {
            let year = years[pi];
            let mut page = if pi == first_partition { resume_page } else { 1 };
            // Unknown until the first reply, so the resumed page is always
            // fetched before the bound applies.
            let mut total_pages: Option<u32> = None;
            tracing::info!(year, start_page = page, "collecting release year");

            while total_pages.map_or(true, |total| page <= total) {
                position.partition_index = pi;
                position.page = page;

                if self.cancel.is_cancelled() {
                    sink.flush()?;
                    position.last_shard_index = sink.shard_index();
                    store.save(&position)?;
                    tracing::warn!(year, page, "cancelled, position saved");
                    return Ok(HarvestSummary {
                        outcome: HarvestOutcome::Interrupted,
                        new_records,
                        total_known: dedup.len(),
                    });
                }

                let batch = paginator.next_batch(year, page);
                total_pages = Some(batch.total_pages);
                // A checkpointed mid-page position applies to the first batch
                // of the run only; if its item is gone from the re-fetched
                // page, fall back to the page start.
                let start = match pending_offset.take() {
                    Some(key) => batch
                        .items
                        .iter()
                        .position(|item| item.id.to_string() == key)
                        .map(|found| found + 1)
                        .unwrap_or(0),
                    None => 0,
                };
                if batch.is_empty() {
                    break;
                }

                for item in batch.items.iter().skip(start) {
                    if self.cancel.is_cancelled() {
                        sink.flush()?;
                        position.last_shard_index = sink.shard_index();
                        store.save(&position)?;
                        tracing::warn!(year, page, "cancelled, position saved");
                        return Ok(HarvestSummary {
                            outcome: HarvestOutcome::Interrupted,
                            new_records,
                            total_known: dedup.len(),
                        });
                    }
                    if dedup.contains(item.id) {
                        continue;
                    }
                    match enricher.enrich(&mut self.ratings, item.id) {
                        Ok(Some(record)) => {
                            dedup.mark(item.id);
                            new_records += 1;
                            let released = record
                                .release_date
                                .clone()
                                .unwrap_or_else(|| year.to_string());
                            tracing::info!(
                                "{} ({}) added. total: {}",
                                record.title.as_deref().unwrap_or("<untitled>"),
                                released,
                                dedup.len()
                            );
                            sink.append(record);
                            position.last_item_key = Some(item.id.to_string());
                            position.last_shard_index = sink.shard_index();
                            store.save(&position)?;
                            sleep(self.opts.item_delay);
                        }
                        Ok(None) => continue,
                        Err(RatingsError::KeysExhausted(count)) => {
                            sink.flush()?;
                            position.last_shard_index = sink.shard_index();
                            store.save(&position)?;
                            tracing::warn!(keys = count, "every ratings key exhausted, stopping run");
                            return Ok(HarvestSummary {
                                outcome: HarvestOutcome::Exhausted,
                                new_records,
                                total_known: dedup.len(),
                            });
                        }
                    }
                }

                let added = sink.flush()?;
                if added > 0 {
                    tracing::info!(year, page, added, "page persisted");
                }
                page += 1;
                position.page = page;
                position.last_item_key = None;
                position.last_shard_index = sink.shard_index();
                store.save(&position)?;
                sleep(self.opts.page_delay);
            }

            position.partition_index = pi + 1;
            position.page = 1;
            position.last_item_key = None;
            position.last_shard_index = sink.shard_index();
            store.save(&position)?;
        }

        tracing::info!(new = new_records, total = dedup.len(), "collection complete");
        Ok(HarvestSummary {
            outcome: HarvestOutcome::Completed,
            new_records,
            total_known: dedup.len(),
        })
    }
}

impl Harvester<HttpCatalogApi, HttpRatingsApi> {
    /// Wire up the production HTTP clients from `opts`, checking credentials
    /// first so a misconfigured run fails before any state is touched.
    pub fn from_options(opts: HarvestOptions) -> Result<Self> {
        if opts.api_key.trim().is_empty() {
            return Err(anyhow!("catalog API key is required (set {ENV_API_KEY})"));
        }
        if opts.ratings_keys.is_empty() {
            return Err(anyhow!(
                "at least one ratings API key is required (set {ENV_RATINGS_KEYS})"
            ));
        }
        let catalog = HttpCatalogApi::new(&opts).context("build catalog client")?;
        let ratings = HttpRatingsApi::new(&opts).context("build ratings client")?;
        Ok(Self::new(opts, catalog, ratings))
    }
}
