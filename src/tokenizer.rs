/*! Sub-word tokenizer seam.

The pipeline only needs a few operations from a tokenizer: encoding a text (with or without special tokens),
decoding a single id back into its surface string, and looking a token up in the vocabulary.
[HfTokenizer] provides them on top of a HuggingFace `tokenizer.json`.
!*/
use std::path::Path;

use log::debug;
use tokenizers::{Tokenizer, TruncationParams};

use crate::error::Error;

pub trait TokenCodec {
    /// Encode `text`. Output is truncated to the codec's maximum length.
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, Error>;

    /// Surface string of a single token id, special tokens included.
    fn decode(&self, id: u32) -> Result<String, Error>;

    /// Exact vocabulary lookup, no tokenization involved.
    fn token_to_id(&self, token: &str) -> Option<u32>;
}

pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    /// Load a `tokenizer.json` and enable truncation to `max_length` ids.
    pub fn from_file(path: &Path, max_length: usize) -> Result<Self, Error> {
        debug!("loading tokenizer {:?} (max_length={})", path, max_length);
        let mut inner = Tokenizer::from_file(path)
            .map_err(|e| Error::Tokenizer(format!("cannot load {:?}: {}", path, e)))?;
        inner
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl TokenCodec for HfTokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, Error> {
        let encoding = self
            .inner
            .encode(text, add_special_tokens)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, id: u32) -> Result<String, Error> {
        self.inner
            .decode(&[id], false)
            .map_err(|e| Error::Tokenizer(e.to_string()))
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }
}
