//! # plbert-prep
//!
//! Corpus preprocessing for phoneme-aware masked language models.
//!
//! ## Getting started
//!
//! ```sh
//! plbert-prep 0.1.0
//! phoneme-aware corpus preprocessing.
//!
//! USAGE:
//!     plbert-prep <SUBCOMMAND>
//!
//! SUBCOMMANDS:
//!     check         Check the unified dataset against the token map
//!     collect       Collect processed shards into the unified dataset
//!     help          Prints this message or the help of the given subcommand(s)
//!     preprocess    Run the whole preprocessing: shards, unified dataset and token map
//!     shard         Process a single shard
//!     token-map     Build the token map from the unified dataset
//! ```
//!
//! Logging is controlled by `RUST_LOG`, e.g. `RUST_LOG=info plbert-prep preprocess -c config.yml`.
use log::{debug, info};
use structopt::StructOpt;

use plbert_prep::check;
use plbert_prep::error::Error;
use plbert_prep::io::Dataset;
use plbert_prep::pipeline::{self, Pipeline};
use plbert_prep::shards::{ShardStatus, ShardTask};
use plbert_prep::tokenizer::HfTokenizer;

mod cli;

fn main() -> Result<(), Error> {
    env_logger::init();

    let opt = cli::PlbertPrep::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::PlbertPrep::Preprocess(args) => {
            let config = args.load()?;
            let artifacts = pipeline::Preprocess::new(config)?.run()?;
            info!(
                "preprocessing done: {} records, num_vocab={}",
                artifacts.num_records,
                artifacts.token_map.num_vocab()
            );
        }

        cli::PlbertPrep::Shard(s) => {
            let task = if s.task_stdin {
                ShardTask::from_reader(std::io::stdin().lock())?
            } else {
                let config = s.config.load()?;
                let index = s
                    .index
                    .ok_or_else(|| Error::Config("either --index or --task-stdin is required".into()))?;
                ShardTask::new(index, &config)
            };
            if let ShardStatus::Written(manifest) = task.execute()? {
                debug!("shard {} manifest: {:?}", task.index, manifest);
            }
        }

        cli::PlbertPrep::Collect(args) => {
            pipeline::collect_dataset(&args.load()?)?;
        }

        cli::PlbertPrep::TokenMap(args) => {
            let config = args.load()?;
            let dataset = Dataset::load(&config.data_folder)?;
            let params = &config.dataset_params;
            let tokenizer = HfTokenizer::from_file(&params.tokenizer, params.max_length)?;
            pipeline::build_token_map(&config, &dataset, &tokenizer)?;
        }

        cli::PlbertPrep::Check(args) => {
            let report = check::check(&args.load()?)?;
            println!("{}", report);
            if !report.is_ok() {
                return Err(Error::Custom("artifact check failed".to_string()));
            }
        }
    };
    Ok(())
}
