//! Shard processing.
//!
//! A shard is processed at most once: if its output directory already exists, processing is skipped.
//! Output is written through [DatasetWriter], so that the directory only appears once complete.
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::corpus::{Corpus, CorpusRecord, ProcessedRecord};
use crate::error::Error;
use crate::io::{DatasetWriter, Manifest, ShardInfo};
use crate::phonemize::{phonemize, PhonemizerBackend};
use crate::tokenizer::TokenCodec;

use super::{shard_dir, Partition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardStatus {
    /// Output was already present, nothing has been written.
    Skipped,
    Written(Manifest),
}

pub struct ShardProcessor<'a> {
    corpus: &'a Corpus,
    root: PathBuf,
    total_shards: usize,
    backend: &'a dyn PhonemizerBackend,
    tokenizer: &'a dyn TokenCodec,
    text_column: String,
}

impl<'a> ShardProcessor<'a> {
    pub fn new(
        corpus: &'a Corpus,
        root: &Path,
        total_shards: usize,
        backend: &'a dyn PhonemizerBackend,
        tokenizer: &'a dyn TokenCodec,
    ) -> Self {
        Self {
            corpus,
            root: root.to_path_buf(),
            total_shards,
            backend,
            tokenizer,
            text_column: "text".to_string(),
        }
    }

    /// Read the record text from `column` instead of `text`.
    pub fn with_text_column(mut self, column: &str) -> Self {
        self.text_column = column.to_string();
        self
    }

    /// Phonemize a single corpus row.
    fn process_row(&self, line: &str) -> Result<ProcessedRecord, Error> {
        let record = CorpusRecord::from_json_column(line, &self.text_column)?;
        let phonemized = phonemize(&record.text, self.backend, self.tokenizer)?;
        Ok(record.into_processed(phonemized))
    }

    /// Process shard `index` into `<root>/shard_<index>`.
    ///
    /// Rows that fail to parse or to phonemize are logged and dropped.
    /// Corpus read errors abort the shard, leaving no output.
    pub fn process(&self, index: usize) -> Result<ShardStatus, Error> {
        let partition = Partition::new(index, self.total_shards)?;
        let dst = shard_dir(&self.root, index);
        if dst.exists() {
            info!("Shard {} already exists!", index);
            return Ok(ShardStatus::Skipped);
        }

        info!("Processing shard {} with {} ...", index, self.backend.name());
        let mut writer = DatasetWriter::create(&dst)?;
        let mut failed = 0;
        for (row, line) in self.corpus.shard(partition) {
            let line = line?;
            match self.process_row(&line) {
                Ok(record) => writer.write_single(&record)?,
                Err(e) => {
                    warn!("shard {}: dropping row {}: {}", index, row, e);
                    failed += 1;
                }
            }
        }

        let manifest = writer.finish(
            Some(ShardInfo {
                index,
                total: self.total_shards,
            }),
            failed,
        )?;
        info!(
            "Shard {} saved to {:?} ({} records, {} dropped)",
            index, dst, manifest.num_records, failed
        );
        Ok(ShardStatus::Written(manifest))
    }
}
