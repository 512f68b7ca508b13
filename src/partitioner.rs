//! Input partitioning.
//!
//! The input is split into `P = ceil(F / B)` partitions of nominal size `S = F / P` bytes, where `F` is the input
//! size and `B` the memory budget. Every partition is assembled from raw reads of `S / K` bytes (`K` being the
//! configured sub-chunk number). After each raw read the reader is advanced to the next delimiter so that no record
//! is split between two reads. A partition ends at the first record boundary at or after its nominal end offset,
//! the last one at the end of the input.

use std::fs;
use std::io;
use std::io::prelude::*;

use bytesize::ByteSize;
use log;

use crate::algorithms::SortAlgorithm;
use crate::buffer::RecordBuffer;
use crate::partition::Partition;
use crate::sort::{plan, SortConfig, SortError};

/// Number of records shown in debug logs.
const LOG_SAMPLE: usize = 10;

/// Splits the input file into sorted partition files.
pub struct Partitioner<'a, A>
where
    A: SortAlgorithm,
{
    config: &'a SortConfig,
    algorithm: &'a A,
}

impl<'a, A> Partitioner<'a, A>
where
    A: SortAlgorithm,
{
    pub fn new(config: &'a SortConfig, algorithm: &'a A) -> Self {
        Partitioner { config, algorithm }
    }

    /// Reads, sorts and saves every partition of the input.
    /// Returns partitions in the input order.
    pub fn divide<F>(&self, less: F) -> Result<Vec<Partition>, SortError>
    where
        F: Fn(&i64, &i64) -> bool,
    {
        let file = fs::File::open(self.config.input()).map_err(SortError::Input)?;
        let input_size = file.metadata().map_err(SortError::Input)?.len();
        let (count, size) = plan(input_size, self.config.memory_budget());

        log::info!("input file size: {}", ByteSize(input_size));
        log::info!("memory budget: {}", ByteSize(self.config.memory_budget()));
        log::info!("partitions count: {} (nominal size: {})", count, ByteSize(size));

        let mut reader = match self.config.rw_buf_size() {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };
        let sub_chunk_size = (size / self.config.sub_chunks() as u64).max(1);

        let mut position = 0;
        let mut partitions = Vec::with_capacity(count);
        for id in 0..count {
            let limit = if id + 1 == count {
                u64::MAX
            } else {
                (size * (id as u64 + 1)).saturating_sub(position)
            };

            let mut buffer = self.read_partition(&mut reader, id, limit, sub_chunk_size)?;
            position += buffer.consumed();

            log::debug!("sorting partition #{} ({} records) ...", id, buffer.len());
            self.algorithm.sort_by(buffer.as_mut_slice(), &less);
            log::debug!(
                "partition #{} head: {:?}",
                id,
                &buffer.as_slice()[..buffer.len().min(LOG_SAMPLE)]
            );

            let path = self.config.partition_path(id);
            partitions.push(Partition::build(
                id,
                &path,
                buffer,
                self.config.delimiter(),
                self.config.rw_buf_size(),
            )?);
        }

        log::info!("input divided into {} partitions", partitions.len());

        return Ok(partitions);
    }

    fn read_partition(
        &self,
        reader: &mut impl BufRead,
        id: usize,
        limit: u64,
        sub_chunk_size: u64,
    ) -> Result<RecordBuffer, SortError> {
        let location = format!("input partition #{}", id);
        let mut buffer = RecordBuffer::new(limit, self.config.delimiter(), self.config.malformed_lines());
        let mut sub_chunk = Vec::new();

        let mut sub_chunk_id = 0;
        while !buffer.is_full() {
            let want = sub_chunk_size.min(limit - buffer.consumed());
            read_sub_chunk(reader, want, self.config.delimiter(), &mut sub_chunk).map_err(SortError::Input)?;
            if sub_chunk.is_empty() {
                break;
            }

            buffer.push_chunk(&sub_chunk, &location)?;
            log::debug!(
                "{} bytes read at sub-chunk #{} (partition #{})",
                sub_chunk.len(),
                sub_chunk_id,
                id
            );
            sub_chunk_id += 1;
        }

        return Ok(buffer);
    }
}

/// Reads up to `size` bytes into `chunk` and then completes the last record up to and including the delimiter.
/// `chunk` is left empty at the end of the input.
fn read_sub_chunk(reader: &mut impl BufRead, size: u64, delimiter: u8, chunk: &mut Vec<u8>) -> io::Result<()> {
    chunk.clear();
    reader.by_ref().take(size).read_to_end(chunk)?;

    if chunk.last().map_or(false, |last| *last != delimiter) {
        reader.read_until(delimiter, chunk)?;
    }

    Ok(())
}
