//! Shard collection.
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{info, warn};

use crate::error::Error;
use crate::io::{self, Dataset};

use super::parse_shard_index;

/// List candidate shard directories of `root`.
///
/// Shards are sorted by index. Unfinished (`.tmp`) outputs and directories
/// that are not named after a shard are ignored.
fn shard_dirs(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NoShards(root.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".tmp") {
            info!("ignoring unfinished output {:?}", entry.path());
            continue;
        }
        match parse_shard_index(&name) {
            Some(index) => dirs.push((index, entry.path())),
            None => warn!("ignoring non shard directory {:?}", entry.path()),
        }
    }

    Ok(dirs
        .into_iter()
        .sorted_by_key(|(index, _)| *index)
        .map(|(_, path)| path)
        .collect())
}

/// Load and concatenate every shard found in `root`.
///
/// Shards that fail to load are logged and skipped.
/// Fails with [Error::NoShards] if no shard could be loaded.
pub fn collect(root: &Path) -> Result<Dataset, Error> {
    let mut dataset = Dataset::default();
    let mut loaded = 0;

    for dir in shard_dirs(root)? {
        match io::load(&dir) {
            Ok((manifest, records)) => {
                info!("{:?} loaded ({} records)", dir, manifest.num_records);
                dataset.append(records);
                loaded += 1;
            }
            Err(e) => warn!("{:?} unloadable, skipping: {}", dir, e),
        }
    }

    if loaded == 0 {
        return Err(Error::NoShards(root.to_path_buf()));
    }

    info!(
        "collected {} shards, {} records from {:?}",
        loaded,
        dataset.len(),
        root
    );
    Ok(dataset)
}
