/*! # plbert-prep

Corpus preprocessing for phoneme-aware masked language models (PL-BERT style).

Raw corpus records are phonemized and tokenized shard by shard in worker processes ([shards]),
gathered into a single dataset ([io::Dataset]), from which a compact case-folded
token vocabulary is derived ([vocab::TokenMap]).
!*/
pub mod check;
pub mod config;
pub mod corpus;
pub mod error;
pub mod io;
pub mod phonemize;
pub mod pipeline;
pub mod shards;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tokenizer;
pub mod vocab;
