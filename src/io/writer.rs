/*! Dataset directory writer.

Records are written to `<dst>.tmp/records.jsonl`. On [DatasetWriter::finish], the records file is synced,
hashed, the manifest is written and the temporary directory is renamed to `<dst>`.

As a consequence, `<dst>` only ever exists in a complete state, and its mere existence can be used
as a completion marker. A leftover `<dst>.tmp` means an interrupted write and is discarded by the next writer.
!*/
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::corpus::ProcessedRecord;
use crate::error::Error;

use super::manifest::{file_digest, Manifest, ShardInfo};
use super::RECORDS_FILE;

/// Temporary sibling of a dataset directory: `shard_3` -> `shard_3.tmp`.
pub fn tmp_path(dst: &Path) -> PathBuf {
    let mut name = dst.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    dst.with_file_name(name)
}

pub struct DatasetWriter {
    dst: PathBuf,
    tmp: PathBuf,
    handle: BufWriter<File>,
    num_records: usize,
}

impl DatasetWriter {
    /// Start writing a dataset that will end up in `dst`.
    pub fn create(dst: &Path) -> Result<Self, Error> {
        let tmp = tmp_path(dst);
        if tmp.exists() {
            warn!("removing leftover temporary directory {:?}", tmp);
            std::fs::remove_dir_all(&tmp)?;
        }
        std::fs::create_dir_all(&tmp)?;
        debug!("writing into {:?}", tmp);

        let handle = BufWriter::new(File::create(tmp.join(RECORDS_FILE))?);
        Ok(Self {
            dst: dst.to_path_buf(),
            tmp,
            handle,
            num_records: 0,
        })
    }

    pub fn write_single(&mut self, record: &ProcessedRecord) -> Result<(), Error> {
        serde_json::to_writer(&mut self.handle, record)?;
        self.handle.write_all(b"\n")?;
        self.num_records += 1;
        Ok(())
    }

    pub fn write<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a ProcessedRecord>,
    ) -> Result<(), Error> {
        for record in records {
            self.write_single(record)?;
        }
        Ok(())
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Seal the dataset and move it to its final location, replacing any previous version.
    pub fn finish(self, shard: Option<ShardInfo>, failed_records: usize) -> Result<Manifest, Error> {
        let file = self.handle.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        let manifest = Manifest {
            shard,
            num_records: self.num_records,
            failed_records,
            sha384: file_digest(&self.tmp.join(RECORDS_FILE))?,
        };
        manifest.write(&self.tmp)?;

        if self.dst.exists() {
            warn!("replacing existing dataset at {:?}", self.dst);
            std::fs::remove_dir_all(&self.dst)?;
        }
        std::fs::rename(&self.tmp, &self.dst)?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_sibling() {
        assert_eq!(
            tmp_path(Path::new("root/shard_3")),
            PathBuf::from("root/shard_3.tmp")
        );
    }

    #[test]
    fn nothing_visible_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("shard_0");
        let mut w = DatasetWriter::create(&dst).unwrap();
        w.write_single(&ProcessedRecord {
            id: "0".to_string(),
            url: String::new(),
            title: String::new(),
            phonemes: vec![],
            input_ids: vec![2, 3],
        })
        .unwrap();
        assert!(!dst.exists());
        assert!(tmp_path(&dst).exists());

        let m = w.finish(None, 0).unwrap();
        assert_eq!(m.num_records, 1);
        assert!(dst.join(RECORDS_FILE).exists());
        assert!(!tmp_path(&dst).exists());
    }

    #[test]
    fn stale_tmp_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("shard_1");
        std::fs::create_dir(tmp_path(&dst)).unwrap();
        std::fs::write(tmp_path(&dst).join("garbage"), "x").unwrap();

        let w = DatasetWriter::create(&dst).unwrap();
        w.finish(None, 0).unwrap();
        assert!(!dst.join("garbage").exists());
    }
}
