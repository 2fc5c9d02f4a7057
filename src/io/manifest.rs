//! Dataset directory manifest.
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha384};

use crate::error::Error;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Position of a shard output in its partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub index: usize,
    pub total: usize,
}

/// Written last, next to the records file.
///
/// `sha384` is the hex digest of the records file and is checked on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardInfo>,
    pub num_records: usize,
    #[serde(default)]
    pub failed_records: usize,
    pub sha384: String,
}

impl Manifest {
    pub fn read(dir: &Path) -> Result<Self, Error> {
        let f = File::open(dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_reader(BufReader::new(f))?)
    }

    pub fn write(&self, dir: &Path) -> Result<(), Error> {
        let f = File::create(dir.join(MANIFEST_FILE))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;
        w.get_ref().sync_all()?;
        Ok(())
    }
}

/// compute the hash of the file pointed by the filepath by using [io::copy] between a file handler and the hasher.
pub fn file_digest(filepath: &Path) -> Result<String, Error> {
    let mut hasher = Sha384::new();
    let mut f = File::open(filepath)?;
    io::copy(&mut f, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("empty");
        File::create(&p).unwrap();
        assert_eq!(
            file_digest(&p).unwrap(),
            "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da274edebfe76f65fbd51ad2f14898b95b"
        );
    }

    #[test]
    fn shard_info_optional() {
        let m: Manifest = serde_json::from_str(r#"{"num_records":2,"sha384":"ab"}"#).unwrap();
        assert_eq!(m.shard, None);
        assert_eq!(m.failed_records, 0);

        let m = Manifest {
            shard: Some(ShardInfo { index: 1, total: 4 }),
            num_records: 2,
            failed_records: 1,
            sha384: "ab".to_string(),
        };
        let dir = tempfile::tempdir().unwrap();
        m.write(dir.path()).unwrap();
        assert_eq!(Manifest::read(dir.path()).unwrap(), m);
    }
}
