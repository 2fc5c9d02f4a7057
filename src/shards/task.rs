//! Shard task descriptors.
//!
//! A [ShardTask] is everything a worker process needs to process one shard.
//! It travels as JSON on the worker's stdin, and the worker rebuilds its own corpus reader,
//! phonemizer and tokenizer from it.
use std::io::Read;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::corpus::Corpus;
use crate::error::Error;
use crate::phonemize::EspeakBackend;
use crate::tokenizer::HfTokenizer;

use super::processor::{ShardProcessor, ShardStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardTask {
    pub index: usize,
    pub total_shards: usize,
    pub config: Config,
}

impl ShardTask {
    pub fn new(index: usize, config: &Config) -> Self {
        Self {
            index,
            total_shards: config.preprocess.num_shards,
            config: config.clone(),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Run the task in the current process, with espeak-ng and the configured tokenizer.
    pub fn execute(&self) -> Result<ShardStatus, Error> {
        debug!("executing {:?}", self);
        let preprocess = &self.config.preprocess;
        let params = &self.config.dataset_params;

        let corpus = Corpus::new(self.config.corpus()?, preprocess.max_records)?;
        let backend = EspeakBackend::new(&preprocess.phonemizer);
        let tokenizer = HfTokenizer::from_file(&params.tokenizer, params.max_length)?;

        ShardProcessor::new(
            &corpus,
            &preprocess.shard_root,
            self.total_shards,
            &backend,
            &tokenizer,
        )
        .with_text_column(&preprocess.text_column)
        .process(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let config = Config::from_yaml(
            "data_folder: d\ndataset_params:\n  tokenizer: t.json\n  word_separator: 1\n  token_maps: m.json\npreprocess:\n  num_shards: 5\n",
        )
        .unwrap();
        let task = ShardTask::new(3, &config);
        assert_eq!(task.total_shards, 5);

        let json = task.to_json().unwrap();
        assert_eq!(ShardTask::from_reader(json.as_slice()).unwrap(), task);
    }
}
