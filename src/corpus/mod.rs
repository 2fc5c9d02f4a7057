//! Corpus records and reading.
mod reader;
mod record;

pub use reader::Corpus;
pub use record::{CorpusRecord, ProcessedRecord};
