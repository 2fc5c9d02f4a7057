/*! Preprocessing pipeline.

[Preprocess] runs every stage to completion:

1. missing shards are processed by worker processes (see [crate::shards::Orchestrator]),
2. completed shards are collected into the unified dataset, saved in `data_folder`,
3. the token map is built from the unified dataset and saved in `token_maps`.

Stages 2 and 3 are also available on their own through [collect_dataset] and [build_token_map].
!*/
use log::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::io::Dataset;
use crate::shards::{self, ExeLauncher, Launcher, Orchestrator, Report};
use crate::tokenizer::{HfTokenizer, TokenCodec};
use crate::vocab::TokenMap;

/// This trait must be implemented for each Pipeline,
/// and is generic over the return type so that
/// any custom pipeline that needs a return type can use the
/// trait aswell.
pub trait Pipeline<T> {
    fn run(&self) -> Result<T, Error>;
}

/// What a complete preprocessing run produced.
#[derive(Debug)]
pub struct Artifacts {
    pub report: Report,
    pub num_records: usize,
    pub token_map: TokenMap,
}

/// Collect shards from `preprocess.shard_root` and save them as the unified dataset.
pub fn collect_dataset(config: &Config) -> Result<Dataset, Error> {
    let dataset = shards::collect(&config.preprocess.shard_root)?;
    let manifest = dataset.save(&config.data_folder)?;
    info!(
        "Dataset saved to {:?} ({} records)",
        config.data_folder, manifest.num_records
    );
    Ok(dataset)
}

/// Build the token map of `dataset` and save it to `dataset_params.token_maps`.
pub fn build_token_map(
    config: &Config,
    dataset: &Dataset,
    codec: &dyn TokenCodec,
) -> Result<TokenMap, Error> {
    let params = &config.dataset_params;
    let token_map = TokenMap::build(dataset, params.word_separator, codec)?;
    token_map.save(&params.token_maps)?;
    info!("num_vocab: {}", token_map.num_vocab());
    Ok(token_map)
}

pub struct Preprocess<L> {
    config: Config,
    orchestrator: Orchestrator<L>,
    codec: Option<Box<dyn TokenCodec>>,
}

impl Preprocess<ExeLauncher> {
    pub fn new(config: Config) -> Result<Self, Error> {
        Ok(Self::with_launcher(config, ExeLauncher::current()?))
    }
}

impl<L: Launcher> Preprocess<L> {
    pub fn with_launcher(config: Config, launcher: L) -> Self {
        let orchestrator = Orchestrator::new(&config, launcher);
        Self {
            config,
            orchestrator,
            codec: None,
        }
    }

    /// Use `codec` for the token map instead of loading `dataset_params.tokenizer`.
    pub fn with_codec(mut self, codec: Box<dyn TokenCodec>) -> Self {
        self.codec = Some(codec);
        self
    }
}

impl<L: Launcher> Pipeline<Artifacts> for Preprocess<L> {
    fn run(&self) -> Result<Artifacts, Error> {
        self.config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let report = runtime.block_on(self.orchestrator.run())?;
        if !report.unfinished().is_empty() {
            warn!("continuing with partial shard coverage");
        }

        let dataset = collect_dataset(&self.config)?;

        let loaded;
        let codec: &dyn TokenCodec = match &self.codec {
            Some(codec) => codec.as_ref(),
            None => {
                let params = &self.config.dataset_params;
                loaded = HfTokenizer::from_file(&params.tokenizer, params.max_length)?;
                &loaded
            }
        };
        let token_map = build_token_map(&self.config, &dataset, codec)?;

        Ok(Artifacts {
            report,
            num_records: dataset.len(),
            token_map,
        })
    }
}
