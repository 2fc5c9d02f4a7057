//! Pipeline configuration.
//!
//! The configuration is read once from a YAML file (usually the same `config.yml` the
//! training side uses, unknown keys are ignored), then selectively overridden from the command line.
//! The resulting [Config] is passed by reference to every component. Worker processes
//! receive it verbatim inside their [crate::shards::ShardTask].
//!
//! ```
//! use plbert_prep::config::Config;
//!
//! let config = Config::from_yaml(r#"
//! data_folder: "wikipedia_20220301.en.processed"
//! dataset_params:
//!   tokenizer: "tokenizer/tokenizer.json"
//!   word_separator: 3039
//!   token_maps: "token_maps.json"
//!   max_length: 512
//! preprocess:
//!   corpus: "wikipedia/*.jsonl.gz"
//!   shard_root: "./wiki_phoneme"
//!   num_shards: 100
//!   max_workers: 8
//!   timeout_secs: 600
//!   phonemizer:
//!     language: "en-us"
//! "#).unwrap();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.preprocess.text_column, "text");
//! ```
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Destination of the unified dataset.
    pub data_folder: PathBuf,
    pub dataset_params: DatasetParams,
    #[serde(default)]
    pub preprocess: PreprocessParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetParams {
    /// Path to a `tokenizer.json` file.
    pub tokenizer: PathBuf,
    /// Reserved token id that is always part of the token map.
    pub word_separator: u32,
    /// Destination of the token map.
    pub token_maps: PathBuf,
    /// Maximum number of token ids per record, special tokens included.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// Corpus file or glob pattern of JSON-lines files (optionally gzipped).
    #[serde(default)]
    pub corpus: Option<String>,
    /// Only keep the first `max_records` corpus rows.
    #[serde(default)]
    pub max_records: Option<usize>,
    #[serde(default = "default_shard_root")]
    pub shard_root: PathBuf,
    #[serde(default = "default_num_shards")]
    pub num_shards: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Per-shard timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Field of the corpus records holding the text to phonemize.
    #[serde(default = "default_text_column")]
    pub text_column: String,
    #[serde(default)]
    pub phonemizer: PhonemizerParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemizerParams {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub preserve_punctuation: bool,
    #[serde(default = "default_true")]
    pub with_stress: bool,
    /// espeak-ng executable.
    #[serde(default = "default_program")]
    pub program: PathBuf,
}

fn default_max_length() -> usize {
    512
}
fn default_shard_root() -> PathBuf {
    PathBuf::from("./wiki_phoneme")
}
fn default_num_shards() -> usize {
    100
}
fn default_max_workers() -> usize {
    8
}
fn default_timeout_secs() -> u64 {
    600
}
fn default_language() -> String {
    "en-us".to_string()
}
fn default_text_column() -> String {
    "text".to_string()
}
fn default_program() -> PathBuf {
    PathBuf::from("espeak-ng")
}
fn default_true() -> bool {
    true
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            corpus: None,
            max_records: None,
            shard_root: default_shard_root(),
            num_shards: default_num_shards(),
            max_workers: default_max_workers(),
            timeout_secs: default_timeout_secs(),
            text_column: default_text_column(),
            phonemizer: PhonemizerParams::default(),
        }
    }
}

impl Default for PhonemizerParams {
    fn default() -> Self {
        Self {
            language: default_language(),
            preserve_punctuation: true,
            with_stress: true,
            program: default_program(),
        }
    }
}

/// Absolute form of `path`, with `.` and `..` resolved lexically.
fn lexical(path: &Path) -> PathBuf {
    let path = match std::env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                out.pop();
            }
            c => out.push(c),
        }
    }
    out
}

impl Config {
    /// Load a configuration from a YAML file. The result is not validated.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        debug!("loading configuration from {:?}", path);
        let f = BufReader::new(File::open(path)?);
        Ok(serde_yaml::from_reader(f)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Check values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<(), Error> {
        let p = &self.preprocess;
        if p.num_shards == 0 {
            return Err(Error::Config("num_shards must be at least 1".to_string()));
        }
        if p.max_workers == 0 || p.max_workers > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(Error::Config(format!(
                "max_workers must be between 1 and {}",
                tokio::sync::Semaphore::MAX_PERMITS
            )));
        }
        if p.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        if self.dataset_params.max_length < 2 {
            return Err(Error::Config(
                "max_length must leave room for special tokens".to_string(),
            ));
        }
        if p.text_column.is_empty() {
            return Err(Error::Config("text_column cannot be empty".to_string()));
        }

        // the unified dataset replaces its destination when saved
        let (data, shards) = (lexical(&self.data_folder), lexical(&p.shard_root));
        if data.starts_with(&shards) || shards.starts_with(&data) {
            return Err(Error::Config(format!(
                "data_folder {:?} and shard_root {:?} must not contain each other",
                self.data_folder, p.shard_root
            )));
        }
        Ok(())
    }

    /// Corpus location, mandatory for anything that reads raw records.
    pub fn corpus(&self) -> Result<&str, Error> {
        self.preprocess
            .corpus
            .as_deref()
            .ok_or_else(|| Error::Config("no corpus location (preprocess.corpus)".to_string()))
    }
}
