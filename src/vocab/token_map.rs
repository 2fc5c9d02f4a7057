use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::io::Dataset;
use crate::tokenizer::TokenCodec;

const PROGRESS_EVERY: usize = 10_000;

/// Lowercased surface string of a token and its compact index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub word: String,
    pub token: u32,
}

/// Maps original token ids to a compact, case-folded vocabulary.
///
/// Serialized as a JSON object keyed by original id, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenMap {
    entries: BTreeMap<u32, TokenEntry>,
}

/// A distinct token id, its lowercased surface string and its canonical id.
struct Resolved {
    id: u32,
    word: String,
    canonical: u32,
}

/// Canonical id of `id`.
///
/// When lowercasing changes the surface string of `id`, the lowercased string is looked up
/// in the vocabulary, falling back to the first id of its encoding, then to `id` itself.
/// Otherwise `id` is its own canonical id.
fn resolve(id: u32, codec: &dyn TokenCodec) -> Result<Resolved, Error> {
    let word = codec.decode(id)?;
    let lower = word.to_lowercase();
    let canonical = if lower == word {
        id
    } else if let Some(exact) = codec.token_to_id(&lower) {
        exact
    } else {
        codec
            .encode(&lower, false)?
            .first()
            .copied()
            .unwrap_or(id)
    };
    Ok(Resolved {
        id,
        word: lower,
        canonical,
    })
}

impl TokenMap {
    /// Build the token map of every id in `dataset`, plus the `special` id.
    pub fn build(dataset: &Dataset, special: u32, codec: &dyn TokenCodec) -> Result<Self, Error> {
        info!(
            "building token map over {} records ({} tokens)",
            dataset.len(),
            dataset.num_tokens()
        );
        Self::from_ids(dataset.input_ids().flatten().copied(), special, codec)
    }

    pub fn from_ids<I>(ids: I, special: u32, codec: &dyn TokenCodec) -> Result<Self, Error>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut unique: BTreeSet<u32> = ids.into_iter().collect();
        unique.insert(special);
        let total = unique.len();
        info!("{} distinct token ids", total);

        let mut resolved = Vec::with_capacity(total);
        for (i, id) in unique.into_iter().enumerate() {
            resolved.push(resolve(id, codec)?);
            if (i + 1) % PROGRESS_EVERY == 0 {
                info!("{}/{} token ids resolved", i + 1, total);
            }
        }

        // canonical ids are indexed in ascending order
        let index: BTreeMap<u32, u32> = resolved
            .iter()
            .map(|r| r.canonical)
            .collect::<BTreeSet<u32>>()
            .into_iter()
            .zip(0..)
            .collect();
        info!("Lower-cased tokens: {}", index.len());

        let entries = resolved
            .into_iter()
            .map(|r| {
                let token = index[&r.canonical];
                (r.id, TokenEntry { word: r.word, token })
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, id: u32) -> Option<&TokenEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &TokenEntry)> {
        self.entries.iter()
    }

    /// Size of the compact vocabulary, `1 + max(token)`.
    pub fn num_vocab(&self) -> usize {
        self.entries
            .values()
            .map(|e| e.token as usize + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn save(&self, dst: &Path) -> Result<(), Error> {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut w = BufWriter::new(File::create(dst)?);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;
        info!("Token mapper saved to {:?}", dst);
        Ok(())
    }

    pub fn load(src: &Path) -> Result<Self, Error> {
        debug!("loading token map {:?}", src);
        let r = BufReader::new(File::open(src)?);
        Ok(serde_json::from_reader(r)?)
    }
}
