use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resume position, saved next to the shards.
pub const CHECKPOINT_FILE: &str = "checkpoint.json";
/// One-shot genre id -> name snapshot.
pub const GENRES_FILE: &str = "genres.json";

/// File name of shard `index` (JSON array of enriched records).
pub fn shard_file_name(index: u32) -> String {
    format!("movies_{index:04}.json")
}

pub fn shard_path(data_dir: &Path, index: u32) -> PathBuf {
    data_dir.join(shard_file_name(index))
}

/// All shard files under `data_dir`, ordered by index. Non-shard files are
/// ignored; a missing directory yields an empty list.
pub fn list_shards(data_dir: &Path) -> Vec<(u32, PathBuf)> {
    let re = Regex::new(r"^movies_(\d{4,})\.json$").unwrap();
    let mut shards = Vec::new();
    if !data_dir.exists() {
        return shards;
    }
    for entry in WalkDir::new(data_dir).min_depth(1).max_depth(1) {
        if let Ok(ent) = entry {
            if let Some(name) = ent.file_name().to_str() {
                if let Some(caps) = re.captures(name) {
                    if let Ok(index) = caps[1].parse::<u32>() {
                        shards.push((index, ent.path().to_path_buf()));
                    }
                }
            }
        }
    }
    shards.sort_by_key(|(index, _)| *index);
    shards
}
