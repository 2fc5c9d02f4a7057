//! Sharded corpus processing.
//!
//! The corpus is split in `num_shards` [Partition]s, each one processed by a [ShardProcessor]
//! into `<shard_root>/shard_<index>`.
//! The [Orchestrator] dispatches missing shards to worker processes, and [collect] gathers
//! completed shards back into a single [crate::io::Dataset].
use std::path::{Path, PathBuf};

mod collector;
mod orchestrator;
mod partition;
mod processor;
mod task;

pub use collector::collect;
pub use orchestrator::{ExeLauncher, Launcher, Orchestrator, Report, TaskOutcome, WorkerPool};
pub use partition::Partition;
pub use processor::{ShardProcessor, ShardStatus};
pub use task::ShardTask;

const SHARD_PREFIX: &str = "shard_";

/// Output directory of shard `index`.
pub fn shard_dir(root: &Path, index: usize) -> PathBuf {
    root.join(format!("{}{}", SHARD_PREFIX, index))
}

/// Get the shard index from a shard directory name.
///
/// ```
/// use plbert_prep::shards::parse_shard_index;
/// assert_eq!(parse_shard_index("shard_12"), Some(12));
/// assert_eq!(parse_shard_index("shard_12.tmp"), None);
/// ```
pub fn parse_shard_index(name: &str) -> Option<usize> {
    name.strip_prefix(SHARD_PREFIX)?.parse().ok()
}
