/*! Vocabulary reduction.

The tokenizer vocabulary is much larger than what the corpus actually uses, and distinguishes
casings of the same word. [TokenMap] maps every token id seen in the unified dataset
(plus the word separator id) to a compact, dense index over case-folded tokens.

Each distinct id `t` gets a *canonical* id: if lowercasing `decode(t)` changes it, the first id of the
lowercased word's encoding, `t` otherwise. Canonical ids are sorted and numbered from `0`, and `t`
maps to the number of its canonical id.
!*/
mod token_map;

pub use token_map::{TokenEntry, TokenMap};
