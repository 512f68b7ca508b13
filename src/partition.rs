//! Partition files: sorted runs of records stored one per line.

use std::fmt;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use log;

use crate::buffer::MalformedLinePolicy;
use crate::sort::SortError;

/// A sorted run of records persisted on the file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    id: usize,
    path: PathBuf,
    records: usize,
}

impl Partition {
    /// Writes `items` to `path` one record per delimiter-terminated line.
    /// Items are expected to be already sorted.
    pub fn build(
        id: usize,
        path: &Path,
        items: impl IntoIterator<Item = i64>,
        delimiter: u8,
        buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        let file = fs::File::create(path).map_err(|err| SortError::PartitionCreate(path.into(), err))?;
        let mut writer = match buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        let records = Self::dump(&mut writer, items, delimiter)
            .and_then(|records| writer.flush().map(|_| records))
            .map_err(|err| SortError::PartitionCreate(path.into(), err))?;

        log::debug!("partition #{} saved to {} ({} records)", id, path.display(), records);

        return Ok(Partition {
            id,
            path: path.into(),
            records,
        });
    }

    fn dump(
        writer: &mut impl Write,
        items: impl IntoIterator<Item = i64>,
        delimiter: u8,
    ) -> io::Result<usize> {
        let mut records = 0;
        for item in items.into_iter() {
            write!(writer, "{}", item)?;
            writer.write_all(&[delimiter])?;
            records += 1;
        }
        return Ok(records);
    }

    /// Opens the partition for sequential reading.
    pub fn open(
        &self,
        delimiter: u8,
        policy: MalformedLinePolicy,
        buf_size: Option<usize>,
    ) -> Result<PartitionReader, SortError> {
        let file = fs::File::open(&self.path).map_err(|err| SortError::PartitionRead(self.path.clone(), err))?;
        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(PartitionReader {
            partition_id: self.id,
            path: self.path.clone(),
            reader: Some(reader),
            delimiter,
            policy,
            line: Vec::new(),
            line_number: 0,
        });
    }

    /// Deletes the partition file.
    pub fn remove(self) -> io::Result<()> {
        log::debug!("removing partition #{} ({})", self.id, self.path.display());
        fs::remove_file(&self.path)
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written to the partition.
    pub fn records(&self) -> usize {
        self.records
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition #{} ({})", self.id, self.path.display())
    }
}

/// Sequential record reader over a single partition file.
/// The underlying file is closed as soon as the partition is exhausted.
pub struct PartitionReader {
    partition_id: usize,
    path: PathBuf,
    reader: Option<io::BufReader<fs::File>>,
    delimiter: u8,
    policy: MalformedLinePolicy,
    line: Vec<u8>,
    line_number: u64,
}

impl PartitionReader {
    pub fn partition_id(&self) -> usize {
        self.partition_id
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Releases the file handle.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            log::debug!("partition #{} closed", self.partition_id);
        }
    }

    fn read_record(&mut self) -> Result<Option<i64>, SortError> {
        loop {
            let reader = match self.reader.as_mut() {
                Some(reader) => reader,
                None => return Ok(None),
            };

            self.line.clear();
            let read = reader
                .read_until(self.delimiter, &mut self.line)
                .map_err(|err| SortError::PartitionRead(self.path.clone(), err))?;
            if read == 0 {
                log::debug!("partition #{} exhausted", self.partition_id);
                self.close();
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.line.strip_suffix(&[self.delimiter]).unwrap_or(&self.line[..]);
            let location = format!("partition #{}", self.partition_id);
            if let Some(value) = self.policy.resolve(line, &location, self.line_number)? {
                return Ok(Some(value));
            }
        }
    }
}

impl Iterator for PartitionReader {
    type Item = Result<i64, SortError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(err) => {
                self.close();
                Some(Err(err))
            }
        }
    }
}
