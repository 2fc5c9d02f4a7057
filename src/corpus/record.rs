//! Corpus and processed records.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::phonemize::Phonemized;

/// A raw encyclopedia article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub text: String,
}

/// A record once phonemized and tokenized. The raw text is not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub phonemes: Vec<String>,
    pub input_ids: Vec<u32>,
}

impl CorpusRecord {
    /// Parse a single JSON line.
    pub fn from_json(line: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(line)?)
    }

    /// Parse a single JSON line whose text lives in the `column` field.
    pub fn from_json_column(line: &str, column: &str) -> Result<Self, Error> {
        if column == "text" {
            return Self::from_json(line);
        }
        let mut fields: Map<String, Value> = serde_json::from_str(line)?;
        let text = fields
            .remove(column)
            .ok_or_else(|| Error::Custom(format!("record has no {:?} field", column)))?;
        fields.insert("text".to_string(), text);
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Drop the text, keeping its phonemized form.
    pub fn into_processed(self, phonemized: Phonemized) -> ProcessedRecord {
        ProcessedRecord {
            id: self.id,
            url: self.url,
            title: self.title,
            phonemes: phonemized.phonemes,
            input_ids: phonemized.input_ids,
        }
    }
}
