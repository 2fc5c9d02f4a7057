/*! JSON-lines corpus reader.

A corpus is one or more JSON-lines files (plain or gzip-compressed), given as a path or a glob pattern.
Files are read in sorted path order, and blank lines are skipped, so that row numbers
are stable across runs and across worker processes.
!*/
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use log::debug;

use crate::error::Error;
use crate::shards::Partition;

type Rows = Box<dyn Iterator<Item = Result<String, Error>>>;

#[derive(Debug, Clone)]
pub struct Corpus {
    paths: Vec<PathBuf>,
    max_records: Option<usize>,
}

impl Corpus {
    /// Resolve `pattern` into a sorted list of files.
    ///
    /// Fails if nothing matches.
    pub fn new(pattern: &str, max_records: Option<usize>) -> Result<Self, Error> {
        let mut paths = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
        paths.sort();
        if paths.is_empty() {
            return Err(Error::Custom(format!("no corpus file matches {}", pattern)));
        }
        debug!("corpus files: {:#?}", paths);
        Ok(Self { paths, max_records })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Open a file, transparently decompressing `.gz` files.
    fn open_lines(path: &Path) -> Result<Rows, Error> {
        let f = File::open(path)?;
        let br: Box<dyn BufRead> = match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Box::new(BufReader::new(MultiGzDecoder::new(f))),
            _ => Box::new(BufReader::new(f)),
        };
        Ok(Box::new(br.lines().map(|l| l.map_err(Error::Io))))
    }

    /// Iterate over raw (unparsed) rows of the whole corpus.
    pub fn rows(&self) -> impl Iterator<Item = Result<String, Error>> + '_ {
        self.paths
            .iter()
            .flat_map(|path| match Self::open_lines(path) {
                Ok(lines) => lines,
                Err(e) => Box::new(std::iter::once(Err(e))) as Rows,
            })
            .filter(|row| !matches!(row, Ok(line) if line.trim().is_empty()))
            .take(self.max_records.unwrap_or(usize::MAX))
    }

    /// Iterate over the rows that belong to `partition`, along with their corpus-wide row number.
    ///
    /// Rows are parsed by the caller, so that a malformed row only affects itself.
    pub fn shard(
        &self,
        partition: Partition,
    ) -> impl Iterator<Item = (usize, Result<String, Error>)> + '_ {
        self.rows()
            .enumerate()
            .filter(move |(row, _)| partition.contains(*row))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::GzEncoder, Compression};

    use super::*;
    use crate::corpus::CorpusRecord;

    fn line(id: usize) -> String {
        format!(
            r#"{{"id":"{id}","url":"https://ex.org/{id}","title":"T{id}","text":"text {id}"}}"#
        )
    }

    #[test]
    fn plain_and_gz() {
        let dir = tempfile::tempdir().unwrap();
        let mut plain = File::create(dir.path().join("a.jsonl")).unwrap();
        writeln!(plain, "{}\n\n{}", line(0), line(1)).unwrap();

        let gz = File::create(dir.path().join("b.jsonl.gz")).unwrap();
        let mut enc = GzEncoder::new(gz, Compression::default());
        writeln!(enc, "{}", line(2)).unwrap();
        enc.finish().unwrap();

        let pattern = format!("{}/*.jsonl*", dir.path().display());
        let corpus = Corpus::new(&pattern, None).unwrap();
        assert_eq!(corpus.paths().len(), 2);

        let ids: Vec<String> = corpus
            .rows()
            .map(|r| CorpusRecord::from_json(&r.unwrap()).unwrap().id)
            .collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn max_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.jsonl");
        let mut f = File::create(&path).unwrap();
        for i in 0..10 {
            writeln!(f, "{}", line(i)).unwrap();
        }
        let corpus = Corpus::new(path.to_str().unwrap(), Some(4)).unwrap();
        assert_eq!(corpus.rows().count(), 4);

        let rows: Vec<usize> = corpus
            .shard(Partition::new(1, 2).unwrap())
            .map(|(row, _)| row)
            .collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn no_match() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.jsonl", dir.path().display());
        assert!(Corpus::new(&pattern, None).is_err());
    }
}
