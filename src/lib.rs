mod catalog;
mod checkpoint;
mod config;
mod paths;
mod util;

mod dedup;
mod discover;
mod enrich;
mod progress;
mod ratings;
mod record;
mod sink;

mod genres;
mod harvest;
mod merge;

pub use crate::config::{HarvestOptions, ENV_API_KEY, ENV_RATINGS_KEYS};
pub use crate::harvest::{CancelFlag, Harvester, HarvestOutcome, HarvestSummary};
pub use crate::merge::{merge_shards, MergeReport};
pub use crate::genres::snapshot_genres;

// Expose the API seams so embedders and tests can supply their own upstreams.
pub use crate::catalog::{
    ApiError, CastEntry, CatalogApi, Credits, CrewEntry, DiscoverPage, DiscoveredItem, Genre,
    HttpCatalogApi, MovieDetails, NamedItem,
};
pub use crate::ratings::{
    HttpRatingsApi, KeySet, RatingEntry, RatingsApi, RatingsError, RatingsReply, RatingsReport,
    RatingsResolver, RatingsSummary,
};

pub use crate::discover::{release_years, CatalogPaginator, PageBatch};
pub use crate::enrich::ItemEnricher;
pub use crate::record::EnrichedRecord;

// Expose the persistence layer for inspection tooling.
pub use crate::checkpoint::{Checkpoint, CheckpointStore};
pub use crate::dedup::DedupIndex;
pub use crate::paths::{list_shards, shard_file_name, shard_path, CHECKPOINT_FILE, GENRES_FILE};
pub use crate::sink::OutputSink;

// Expose progress helper for binaries layering their own reporting.
pub use crate::progress::make_count_progress;

// export robust file ops from util so binaries can import from crate root.
pub use crate::util::{
    init_tracing_once, now_rfc3339, read_json_array, replace_file_atomic_backoff,
    write_json_atomic,
};
