use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use plbert_prep::config::Config;
use plbert_prep::corpus::Corpus;
use plbert_prep::shards::{shard_dir, ShardProcessor, ShardTask};
use plbert_prep::testing::{FakeBackend, WordCodec};
use tokio::process::Command;

pub const TEXTS: [&str; 6] = [
    "The cat sat",
    "the Cat ran away",
    "A dog , a cat",
    "Dogs bark !",
    "the end",
    "",
];

pub fn codec() -> WordCodec {
    WordCodec::new(
        &["The", "the", "cat", "Cat", "sat", "ran", "A", "a", "dog", ",", "!", "<formula>"],
        16,
    )
}

pub fn write_corpus(dir: &Path, nb: usize) -> PathBuf {
    let path = dir.join("corpus.jsonl");
    let mut f = File::create(&path).unwrap();
    for i in 0..nb {
        let record = serde_json::json!({
            "id": i.to_string(),
            "url": format!("https://en.wikipedia.org/wiki?curid={}", i),
            "title": format!("Article {}", i),
            "text": TEXTS[i % TEXTS.len()],
        });
        writeln!(f, "{}", record).unwrap();
    }
    path
}

pub fn config(dir: &Path, corpus: &Path, num_shards: usize, timeout_secs: u64) -> Config {
    let yaml = format!(
        r#"
data_folder: "{d}/data"
dataset_params:
  tokenizer: "{d}/tokenizer.json"
  word_separator: 15
  token_maps: "{d}/token_maps.json"
  max_length: 16
preprocess:
  corpus: "{corpus}"
  shard_root: "{d}/shards"
  num_shards: {num_shards}
  max_workers: 2
  timeout_secs: {timeout_secs}
"#,
        d = dir.display(),
        corpus = corpus.display(),
        num_shards = num_shards,
        timeout_secs = timeout_secs,
    );
    let config = Config::from_yaml(&yaml).unwrap();
    config.validate().unwrap();
    config
}

/// Process every shard in-process into `staging`, with the fake phonemizer.
pub fn stage(config: &Config, staging: &Path) {
    let p = &config.preprocess;
    let corpus = Corpus::new(config.corpus().unwrap(), p.max_records).unwrap();
    let (backend, codec) = (FakeBackend::default(), codec());
    let processor = ShardProcessor::new(&corpus, staging, p.num_shards, &backend, &codec);
    for index in 0..p.num_shards {
        processor.process(index).unwrap();
    }
}

/// Worker that publishes the staged output of its shard.
pub fn publish(task: &ShardTask, staging: &Path) -> Command {
    let src = shard_dir(staging, task.index);
    let dst = shard_dir(&task.config.preprocess.shard_root, task.index);
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(format!("mv '{}' '{}'", src.display(), dst.display()));
    cmd
}
