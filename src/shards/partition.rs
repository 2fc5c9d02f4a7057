//! Corpus partitioning.
use crate::error::Error;

/// Shard `index` out of `total`: row `i` belongs to shard `i mod total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    index: usize,
    total: usize,
}

impl Partition {
    pub fn new(index: usize, total: usize) -> Result<Self, Error> {
        if total == 0 || index >= total {
            return Err(Error::Config(format!(
                "invalid shard {} out of {}",
                index, total
            )));
        }
        Ok(Self { index, total })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn contains(&self, row: usize) -> bool {
        row % self.total == self.index
    }

    /// Every partition of a `total`-way split.
    pub fn all(total: usize) -> impl Iterator<Item = Partition> {
        (0..total).map(move |index| Partition { index, total })
    }
}
