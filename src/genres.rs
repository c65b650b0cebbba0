//! One-shot snapshot of the catalog's genre taxonomy, written next to the
//! shards as an id -> name map.

use crate::catalog::CatalogApi;
use crate::paths::GENRES_FILE;
use crate::util::write_json_atomic;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn snapshot_genres<C: CatalogApi>(api: &C, data_dir: &Path) -> Result<PathBuf> {
    let genres = api.genre_list().context("fetch genre list")?;
    let map: BTreeMap<u64, String> = genres.into_iter().map(|g| (g.id, g.name)).collect();
    let path = data_dir.join(GENRES_FILE);
    write_json_atomic(&path, &map)?;
    tracing::info!(genres = map.len(), path = %path.display(), "genre map written");
    Ok(path)
}
