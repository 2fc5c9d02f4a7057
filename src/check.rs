//! Checks that the unified dataset and the token map are consistent and ready for training.
use std::collections::BTreeSet;
use std::fmt;

use log::info;
use rayon::prelude::*;

use crate::config::Config;
use crate::error::Error;
use crate::io::Dataset;
use crate::vocab::TokenMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub num_records: usize,
    pub num_tokens: usize,
    /// Records that were phonemized into nothing.
    pub no_phonemes: usize,
    /// Records with more token ids than `max_length`.
    pub overlong: usize,
    /// Ids of the dataset that are missing from the token map.
    pub missing_ids: BTreeSet<u32>,
    pub separator_mapped: bool,
    /// Whether compact tokens are exactly `0..K`.
    pub dense: bool,
    pub num_vocab: usize,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.missing_ids.is_empty() && self.separator_mapped && self.dense && self.overlong == 0
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "records: {}", self.num_records)?;
        writeln!(f, "tokens: {}", self.num_tokens)?;
        writeln!(f, "records without phonemes: {}", self.no_phonemes)?;
        writeln!(f, "records over max_length: {}", self.overlong)?;
        writeln!(f, "unmapped token ids: {:?}", self.missing_ids)?;
        writeln!(f, "word separator mapped: {}", self.separator_mapped)?;
        writeln!(f, "dense token range: {}", self.dense)?;
        write!(f, "num_vocab: {}", self.num_vocab)
    }
}

/// Check `dataset` against `token_map`.
pub fn verify(
    dataset: &Dataset,
    token_map: &TokenMap,
    separator: u32,
    max_length: usize,
) -> CheckReport {
    let missing_ids = dataset
        .records()
        .par_iter()
        .map(|r| {
            r.input_ids
                .iter()
                .copied()
                .filter(|id| !token_map.contains(*id))
                .collect::<BTreeSet<u32>>()
        })
        .reduce(BTreeSet::new, |mut a, b| {
            a.extend(b);
            a
        });

    let no_phonemes = dataset
        .records()
        .par_iter()
        .filter(|r| r.phonemes.is_empty())
        .count();
    let overlong = dataset
        .records()
        .par_iter()
        .filter(|r| r.input_ids.len() > max_length)
        .count();

    let tokens: BTreeSet<u32> = token_map.iter().map(|(_, e)| e.token).collect();
    let dense = tokens.iter().copied().eq(0..tokens.len() as u32);

    CheckReport {
        num_records: dataset.len(),
        num_tokens: dataset.num_tokens(),
        no_phonemes,
        overlong,
        missing_ids,
        separator_mapped: token_map.contains(separator),
        dense,
        num_vocab: token_map.num_vocab(),
    }
}

/// Load the artifacts designated by `config` and check them.
pub fn check(config: &Config) -> Result<CheckReport, Error> {
    info!("checking {:?}", config.data_folder);
    let dataset = Dataset::load(&config.data_folder)?;
    let token_map = TokenMap::load(&config.dataset_params.token_maps)?;
    let params = &config.dataset_params;
    Ok(verify(
        &dataset,
        &token_map,
        params.word_separator,
        params.max_length,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ProcessedRecord;
    use crate::testing::WordCodec;
    use crate::tokenizer::TokenCodec;

    fn dataset(codec: &WordCodec, texts: &[&str]) -> Dataset {
        texts
            .iter()
            .map(|t| ProcessedRecord {
                id: t.to_string(),
                url: String::new(),
                title: String::new(),
                phonemes: t.split_whitespace().map(String::from).collect(),
                input_ids: codec.encode(t, true).unwrap(),
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn consistent() {
        let codec = WordCodec::new(&["A", "a", "b", "|"], 8);
        let d = dataset(&codec, &["A b", "a", ""]);
        let sep = codec.id("|").unwrap();
        let map = TokenMap::build(&d, sep, &codec).unwrap();

        let report = verify(&d, &map, sep, 8);
        assert!(report.is_ok(), "{}", report);
        assert_eq!(report.num_records, 3);
        assert_eq!(report.no_phonemes, 1);
        assert_eq!(report.num_vocab, map.num_vocab());
    }

    #[test]
    fn unmapped_ids() {
        let codec = WordCodec::new(&["a", "b"], 8);
        let map = TokenMap::from_ids(vec![2, 3, 4], 4, &codec).unwrap();
        let d = dataset(&codec, &["a b"]);

        let report = verify(&d, &map, 4, 8);
        assert!(!report.is_ok());
        assert_eq!(report.missing_ids, [5].into_iter().collect());

        let report = verify(&d, &map, 0, 3);
        assert!(!report.separator_mapped);
        assert_eq!(report.overlong, 1);
    }

    #[test]
    fn from_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            "data_folder: {d}/data\ndataset_params:\n  tokenizer: t.json\n  word_separator: 4\n  token_maps: {d}/token_maps.json\n",
            d = dir.path().display()
        );
        let config = Config::from_yaml(&yaml).unwrap();
        let codec = WordCodec::new(&["a"], 8);
        let d = dataset(&codec, &["a a"]);
        d.save(&config.data_folder).unwrap();
        TokenMap::build(&d, 4, &codec)
            .unwrap()
            .save(&config.dataset_params.token_maps)
            .unwrap();

        assert!(check(&config).unwrap().is_ok());
    }
}
