//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

use plbert_prep::config::Config;
use plbert_prep::error::Error;

#[derive(Debug, StructOpt)]
#[structopt(name = "plbert-prep", about = "phoneme-aware corpus preprocessing.")]
/// Holds every command that is callable by the `plbert-prep` command.
pub enum PlbertPrep {
    #[structopt(about = "Run the whole preprocessing: shards, unified dataset and token map")]
    Preprocess(ConfigArgs),
    #[structopt(about = "Process a single shard")]
    Shard(Shard),
    #[structopt(about = "Collect processed shards into the unified dataset")]
    Collect(ConfigArgs),
    #[structopt(about = "Build the token map from the unified dataset")]
    TokenMap(ConfigArgs),
    #[structopt(about = "Check the unified dataset against the token map")]
    Check(ConfigArgs),
}

#[derive(Debug, StructOpt)]
pub struct ConfigArgs {
    #[structopt(
        short = "c",
        long = "config",
        parse(from_os_str),
        default_value = "Configs/config.yml",
        help = "YAML configuration file"
    )]
    pub config: PathBuf,
    #[structopt(flatten)]
    pub overrides: Overrides,
}

impl ConfigArgs {
    /// Load, override and validate the configuration.
    pub fn load(&self) -> Result<Config, Error> {
        let mut config = Config::from_path(&self.config)?;
        self.overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, StructOpt)]
/// Configuration values that can be set from the command line.
pub struct Overrides {
    #[structopt(long, help = "corpus file or glob pattern")]
    pub corpus: Option<String>,
    #[structopt(long = "max-records", help = "only use the first n corpus rows")]
    pub max_records: Option<usize>,
    #[structopt(long = "shard-root", parse(from_os_str))]
    pub shard_root: Option<PathBuf>,
    #[structopt(long = "num-shards")]
    pub num_shards: Option<usize>,
    #[structopt(short = "w", long = "max-workers", help = "number of worker processes")]
    pub max_workers: Option<usize>,
    #[structopt(long = "timeout", help = "per-shard timeout, in seconds")]
    pub timeout_secs: Option<u64>,
    #[structopt(long = "data-folder", parse(from_os_str))]
    pub data_folder: Option<PathBuf>,
    #[structopt(long = "token-maps", parse(from_os_str))]
    pub token_maps: Option<PathBuf>,
    #[structopt(long, parse(from_os_str), help = "tokenizer.json file")]
    pub tokenizer: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        let p = &mut config.preprocess;
        if let Some(corpus) = &self.corpus {
            p.corpus = Some(corpus.clone());
        }
        if self.max_records.is_some() {
            p.max_records = self.max_records;
        }
        if let Some(shard_root) = &self.shard_root {
            p.shard_root = shard_root.clone();
        }
        if let Some(n) = self.num_shards {
            p.num_shards = n;
        }
        if let Some(n) = self.max_workers {
            p.max_workers = n;
        }
        if let Some(t) = self.timeout_secs {
            p.timeout_secs = t;
        }

        if let Some(data_folder) = &self.data_folder {
            config.data_folder = data_folder.clone();
        }
        let d = &mut config.dataset_params;
        if let Some(token_maps) = &self.token_maps {
            d.token_maps = token_maps.clone();
        }
        if let Some(tokenizer) = &self.tokenizer {
            d.tokenizer = tokenizer.clone();
        }
    }
}

#[derive(Debug, StructOpt)]
/// Shard command and parameters.
///
/// Worker processes are started with `--task-stdin`, and read their task from stdin.
/// Otherwise, shard `--index` is processed using the configuration file.
pub struct Shard {
    #[structopt(long = "task-stdin", help = "read the shard task from stdin")]
    pub task_stdin: bool,
    #[structopt(short = "i", long = "index", help = "shard index")]
    pub index: Option<usize>,
    #[structopt(flatten)]
    pub config: ConfigArgs,
}
