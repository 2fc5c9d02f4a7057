//! Dataset directory reader.
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::Path;

use crate::corpus::ProcessedRecord;
use crate::error::Error;

use super::manifest::{file_digest, Manifest};
use super::RECORDS_FILE;

/// Iterates over JSON-lines [ProcessedRecord]s.
#[derive(Debug)]
pub struct Reader<T>
where
    T: Read,
{
    lines: Lines<BufReader<T>>,
}

pub type RecordReader = Reader<File>;

impl RecordReader {
    pub fn from_path(src: &Path) -> Result<Self, Error> {
        Ok(Self::new(File::open(src)?))
    }
}

impl<T: Read> Reader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            lines: BufReader::new(inner).lines(),
        }
    }
}

impl<T> Iterator for Reader<T>
where
    T: Read,
{
    type Item = Result<ProcessedRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lines.next()? {
            Ok(line) => Some(serde_json::from_str(&line).map_err(Error::Serde)),
            Err(e) => Some(Err(Error::Io(e))),
        }
    }
}

/// Load a dataset directory, checking it against its manifest.
pub fn load(dir: &Path) -> Result<(Manifest, Vec<ProcessedRecord>), Error> {
    let manifest = Manifest::read(dir)?;
    let records_path = dir.join(RECORDS_FILE);

    if file_digest(&records_path)? != manifest.sha384 {
        return Err(Error::Manifest(
            dir.to_path_buf(),
            "records checksum mismatch".to_string(),
        ));
    }

    let records = RecordReader::from_path(&records_path)?.collect::<Result<Vec<_>, _>>()?;
    if records.len() != manifest.num_records {
        return Err(Error::Manifest(
            dir.to_path_buf(),
            format!(
                "expected {} records, found {}",
                manifest.num_records,
                records.len()
            ),
        ));
    }

    Ok((manifest, records))
}
