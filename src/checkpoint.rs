//! Resume position, persisted after every appended item and every completed
//! page. Loading is never fatal: a missing or mangled file restarts the walk
//! from the newest partition.

use crate::paths::CHECKPOINT_FILE;
use crate::util::{now_rfc3339, write_json_atomic};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index into the descending year list, not the year itself, so the
    /// position survives a widened year range.
    pub partition_index: usize,
    /// 1-based page within the current partition.
    pub page: u32,
    /// Id of the last item appended on this page; resumption re-fetches the
    /// page and continues after it.
    #[serde(default)]
    pub last_item_key: Option<String>,
    #[serde(default)]
    pub last_shard_index: u32,
    #[serde(default)]
    pub saved_at: Option<String>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            partition_index: 0,
            page: 1,
            last_item_key: None,
            last_shard_index: 0,
            saved_at: None,
        }
    }
}

pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(data_dir: &Path) -> Self {
        Self { path: data_dir.join(CHECKPOINT_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved position. Missing file means a fresh start; an
    /// unreadable one is logged and treated the same way.
    pub fn load(&self) -> Checkpoint {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Checkpoint::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "checkpoint unreadable, starting over");
                return Checkpoint::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(cp) => cp,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "checkpoint corrupt, starting over");
                Checkpoint::default()
            }
        }
    }

    /// Stamp and persist `checkpoint` via write-temp-then-rename, so a crash
    /// mid-save leaves the previous position intact.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut stamped = checkpoint.clone();
        stamped.saved_at = now_rfc3339();
        write_json_atomic(&self.path, &stamped)
    }
}
