//! Shard writer. Records buffer in memory for the current page; `flush`
//! appends them to the active shard file. The size bound is checked against
//! what is already on disk BEFORE writing, so a single flush may push a shard
//! past the bound and rotation happens at the next one. Existing corpora
//! depend on that boundary behavior, so it is kept as is.

use crate::paths::shard_path;
use crate::record::EnrichedRecord;
use crate::util::{read_json_array, write_json_atomic};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct OutputSink {
    data_dir: PathBuf,
    max_shard_bytes: u64,
    shard_index: u32,
    buffer: Vec<EnrichedRecord>,
}

impl OutputSink {
    pub fn new(data_dir: impl AsRef<Path>, max_shard_bytes: u64) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            max_shard_bytes,
            shard_index: 0,
            buffer: Vec::new(),
        }
    }

    /// Continue writing into shard `index` (from the checkpoint). The size
    /// check on the next flush rotates past it if it is already full.
    pub fn starting_at(mut self, index: u32) -> Self {
        self.shard_index = index;
        self
    }

    pub fn append(&mut self, record: EnrichedRecord) {
        self.buffer.push(record);
    }

    /// Index of the shard the next flush will target (pre-rotation).
    pub fn shard_index(&self) -> u32 {
        self.shard_index
    }

    pub fn current_shard_path(&self) -> PathBuf {
        shard_path(&self.data_dir, self.shard_index)
    }

    /// Write the buffered records out. Returns how many were written; an
    /// empty buffer is a no-op. The target shard's existing array is loaded,
    /// extended and atomically rewritten, so a crash cannot truncate it.
    pub fn flush(&mut self) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        let mut path = self.current_shard_path();
        let on_disk = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if on_disk > self.max_shard_bytes {
            self.shard_index += 1;
            path = self.current_shard_path();
            tracing::info!(shard = %path.display(), "shard over size bound, rotating to next");
        }

        let added = self.buffer.len();
        let mut records = read_json_array(&path)?;
        records.reserve(added);
        for record in self.buffer.drain(..) {
            records.push(
                serde_json::to_value(&record)
                    .with_context(|| format!("encode record {}", record.id))?,
            );
        }
        write_json_atomic(&path, &records)?;
        tracing::debug!(shard = %path.display(), added, total = records.len(), "shard flushed");
        Ok(added)
    }
}
