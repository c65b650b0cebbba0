use crate::paths::list_shards;
use ahash::AHashSet;
use serde_json::Value;
use std::path::Path;

/// Ids of every record already persisted, rebuilt from the shard files at
/// startup. Only ever grows during a run.
#[derive(Debug, Default)]
pub struct DedupIndex {
    ids: AHashSet<u64>,
}

impl DedupIndex {
    /// Scan all shards under `data_dir` and collect record ids. A shard that
    /// cannot be read or parsed is skipped with a warning; its records look
    /// new again and may be collected a second time.
    pub fn scan(data_dir: &Path) -> Self {
        let mut ids = AHashSet::new();
        let shards = list_shards(data_dir);
        let shard_count = shards.len();
        for (index, path) in shards {
            match crate::util::read_json_array(&path) {
                Ok(records) => {
                    for record in &records {
                        if let Some(id) = record.get("id").and_then(Value::as_u64) {
                            ids.insert(id);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(shard = index, path = %path.display(), error = %e, "unreadable shard skipped during dedup scan");
                }
            }
        }
        tracing::info!(known = ids.len(), shards = shard_count, "dedup index built");
        Self { ids }
    }

    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Record `id` as persisted. Returns false when it was already known.
    #[inline]
    pub fn mark(&mut self, id: u64) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
