/*!
# IO utilities

Saving and loading of processed datasets.

A dataset lives in a directory holding two files:

- `records.jsonl`: one [ProcessedRecord] per line,
- `manifest.json`: record counts and the checksum of `records.jsonl` (see [Manifest]).

Shard outputs and the unified dataset share this layout.
!*/
mod manifest;
pub mod reader;
pub mod writer;

use std::path::Path;

use crate::corpus::ProcessedRecord;
use crate::error::Error;

pub use manifest::{file_digest, Manifest, ShardInfo, MANIFEST_FILE};
pub use reader::{load, RecordReader};
pub use writer::{tmp_path, DatasetWriter};

pub const RECORDS_FILE: &str = "records.jsonl";

/// An in-memory, ordered collection of processed records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<ProcessedRecord>,
}

impl Dataset {
    pub fn new(records: Vec<ProcessedRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ProcessedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ProcessedRecord> {
        self.records
    }

    /// Append records at the end, keeping their order.
    pub fn append(&mut self, mut records: Vec<ProcessedRecord>) {
        self.records.append(&mut records);
    }

    /// Token id streams of every record, in order.
    pub fn input_ids(&self) -> impl Iterator<Item = &[u32]> {
        self.records.iter().map(|r| r.input_ids.as_slice())
    }

    /// Total number of token ids.
    pub fn num_tokens(&self) -> usize {
        self.input_ids().map(<[u32]>::len).sum()
    }

    /// Write the dataset to `dst`, replacing any previous dataset there.
    pub fn save(&self, dst: &Path) -> Result<Manifest, Error> {
        let mut writer = DatasetWriter::create(dst)?;
        writer.write(&self.records)?;
        writer.finish(None, 0)
    }

    pub fn load(src: &Path) -> Result<Self, Error> {
        let (_, records) = load(src)?;
        Ok(Self::new(records))
    }
}

impl From<Vec<ProcessedRecord>> for Dataset {
    fn from(records: Vec<ProcessedRecord>) -> Self {
        Self::new(records)
    }
}
