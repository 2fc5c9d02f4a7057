//! Test doubles and fixtures, used by tests and benchmarks.
//!
//! Only built for unit tests, or with the `testing` feature.
use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::phonemize::PhonemizerBackend;
use crate::tokenizer::TokenCodec;

/// Whitespace word-level codec with BERT-like special tokens.
///
/// Ids `0..4` are `[PAD] [UNK] [CLS] [SEP]`, then the provided words in order.
#[derive(Debug, Clone)]
pub struct WordCodec {
    vocab: Vec<String>,
    index: HashMap<String, u32>,
    max_length: usize,
}

impl WordCodec {
    pub const PAD: u32 = 0;
    pub const UNK: u32 = 1;
    pub const CLS: u32 = 2;
    pub const SEP: u32 = 3;

    pub fn new(words: &[&str], max_length: usize) -> Self {
        let vocab: Vec<String> = SPECIAL_TOKENS
            .iter()
            .chain(words.iter())
            .map(|w| w.to_string())
            .collect();
        let index = vocab
            .iter()
            .enumerate()
            .map(|(id, w)| (w.clone(), id as u32))
            .collect();
        Self {
            vocab,
            index,
            max_length,
        }
    }

    /// Id of `word`, if it is part of the vocabulary.
    pub fn id(&self, word: &str) -> Option<u32> {
        self.index.get(word).copied()
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
}

const SPECIAL_TOKENS: [&str; 4] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]"];

impl TokenCodec for WordCodec {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, Error> {
        let words = text
            .split_whitespace()
            .map(|w| self.id(w).unwrap_or(Self::UNK));
        if add_special_tokens {
            let inner = self.max_length.saturating_sub(2);
            let mut ids = vec![Self::CLS];
            ids.extend(words.take(inner));
            ids.push(Self::SEP);
            Ok(ids)
        } else {
            Ok(words.take(self.max_length).collect())
        }
    }

    fn decode(&self, id: u32) -> Result<String, Error> {
        self.vocab
            .get(id as usize)
            .cloned()
            .ok_or_else(|| Error::Tokenizer(format!("unknown id {}", id)))
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.id(token)
    }
}

/// Phonemizes each word as `/word/` (lowercased). Counts calls.
#[derive(Debug, Default)]
pub struct FakeBackend {
    calls: Cell<usize>,
    drop_punctuation: bool,
    fail_on: Option<String>,
}

impl FakeBackend {
    pub fn without_punctuation(mut self) -> Self {
        self.drop_punctuation = true;
        self
    }

    /// Fail on any run of words that contains `word`.
    pub fn failing_on(mut self, word: &str) -> Self {
        self.fail_on = Some(word.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl PhonemizerBackend for FakeBackend {
    fn phonemize_words(&self, words: &str) -> Result<String, Error> {
        self.calls.set(self.calls.get() + 1);
        if let Some(bad) = &self.fail_on {
            if words.split_whitespace().any(|w| w == bad) {
                return Err(Error::Phonemizer(format!("cannot phonemize {:?}", words)));
            }
        }
        Ok(words
            .split_whitespace()
            .map(|w| format!("/{}/", w.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn preserve_punctuation(&self) -> bool {
        !self.drop_punctuation
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// A BERT-like WordPiece `tokenizer.json`, without normalization.
///
/// Ids follow [WordCodec]: `[PAD] [UNK] [CLS] [SEP]`, then `words`.
pub fn wordpiece_json(words: &[&str]) -> String {
    let vocab: serde_json::Map<String, serde_json::Value> = SPECIAL_TOKENS
        .iter()
        .chain(words.iter())
        .enumerate()
        .map(|(id, w)| (w.to_string(), id.into()))
        .collect();
    let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
        .iter()
        .enumerate()
        .map(|(id, w)| {
            serde_json::json!({
                "id": id,
                "content": w,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": null,
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2]
        },
        "decoder": { "type": "WordPiece", "prefix": "##", "cleanup": true },
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": vocab
        }
    })
    .to_string()
}

/// Write [wordpiece_json] to `dir/tokenizer.json`.
pub fn write_wordpiece(dir: &Path, words: &[&str]) -> PathBuf {
    let path = dir.join("tokenizer.json");
    std::fs::write(&path, wordpiece_json(words)).unwrap();
    path
}

/// Write an executable shell script `dir/name` running `body`. Arguments are ignored.
#[cfg(unix)]
pub fn stub_program(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
