/*! Phonemizer adapter.

Turns a text into an aligned pair of word-level phonemes and sub-word token ids.

Text is split on Unicode word boundaries. Consecutive words are phonemized in a single backend call,
punctuation is kept verbatim (when the backend preserves it) and whitespace is dropped.
Token ids come from the tokenizer, with special tokens and truncation, so that they can be fed as-is to the model.
!*/
mod backend;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Error;
use crate::tokenizer::TokenCodec;

pub use backend::{EspeakBackend, PhonemizerBackend};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phonemized {
    pub phonemes: Vec<String>,
    pub input_ids: Vec<u32>,
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Space,
    Word,
    Punctuation,
}

impl Segment {
    fn of(s: &str) -> Self {
        if s.chars().all(char::is_whitespace) {
            Segment::Space
        } else if s.chars().any(char::is_alphanumeric) {
            Segment::Word
        } else {
            Segment::Punctuation
        }
    }
}

/// Phonemize the pending run of words, appending the result to `phonemes`.
fn flush_run(
    run: &mut Vec<&str>,
    backend: &dyn PhonemizerBackend,
    phonemes: &mut Vec<String>,
) -> Result<(), Error> {
    if run.is_empty() {
        return Ok(());
    }
    let annotation = backend.phonemize_words(&run.join(" "))?;
    phonemes.extend(annotation.split_whitespace().map(String::from));
    run.clear();
    Ok(())
}

/// Phonemize and tokenize `text`.
///
/// Empty or punctuation-only texts are valid and may yield no phonemes.
pub fn phonemize(
    text: &str,
    backend: &dyn PhonemizerBackend,
    tokenizer: &dyn TokenCodec,
) -> Result<Phonemized, Error> {
    let input_ids = tokenizer.encode(text, true)?;

    let mut phonemes = Vec::new();
    let mut run = Vec::new();
    for segment in text.split_word_bounds() {
        match Segment::of(segment) {
            Segment::Space => (),
            Segment::Word => run.push(segment),
            Segment::Punctuation => {
                flush_run(&mut run, backend, &mut phonemes)?;
                if backend.preserve_punctuation() {
                    phonemes.push(segment.to_string());
                }
            }
        }
    }
    flush_run(&mut run, backend, &mut phonemes)?;

    Ok(Phonemized {
        phonemes,
        input_ids,
    })
}
