//! Partition discovery: one input file per year, most recent first

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use citeline_core::normalize::identifier_safe;

/// One input file processed as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Shard-name prefix and year field value (e.g. `2020`)
    pub key: String,
    pub path: PathBuf,
}

impl Partition {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            key: partition_key(&name),
            path: path.to_path_buf(),
        }
    }
}

/// Derive the partition key from a file name.
///
/// `pscp-2020.csv` -> `2020`, `2019.csv.gz` -> `2019`. The last `-` segment of
/// the stem is used, made identifier-safe so it can prefix shard file names.
pub fn partition_key(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".gz").unwrap_or(file_name);
    let stem = stem.rsplit_once('.').map_or(stem, |(s, _)| s);
    let segment = stem.rsplit('-').next().unwrap_or(stem);
    let key = identifier_safe(segment);
    if key.is_empty() {
        identifier_safe(stem)
    } else {
        key
    }
}

/// Find partition files under `dir` matching `pattern`, ordered by key
/// descending (most recent year first).
///
/// Two files mapping to the same key would write the same shard names, so
/// that is an error.
pub fn discover_partitions(dir: &Path, pattern: &str) -> Result<Vec<Partition>> {
    let full = dir.join(pattern);
    let full_str = full.to_string_lossy();

    let mut partitions: Vec<Partition> = glob::glob(&full_str)
        .with_context(|| format!("invalid partition pattern: {full_str}"))?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(Partition::from_path(&path)),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Skipping unreadable input entry: {e}");
                None
            }
        })
        .collect();

    partitions.sort_by(|a, b| b.key.cmp(&a.key).then_with(|| b.path.cmp(&a.path)));

    for pair in partitions.windows(2) {
        if pair[0].key == pair[1].key {
            anyhow::bail!(
                "partition key {} claimed by both {} and {}",
                pair[0].key,
                pair[0].path.display(),
                pair[1].path.display()
            );
        }
    }

    Ok(partitions)
}
