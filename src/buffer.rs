//! Partition record buffer.

use std::fmt::Display;
use std::str::FromStr;

use log;

use crate::sort::SortError;

/// What to do with a line that is not a decimal integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedLinePolicy {
    /// Log the line and drop it.
    #[default]
    Skip,
    /// Log the line and use `0` in its place.
    Zero,
    /// Abort the run.
    Fail,
}

impl MalformedLinePolicy {
    /// Resolves a raw line into a record according to the policy.
    /// Returns `Ok(None)` if the line does not produce a record.
    pub(crate) fn resolve(
        self,
        line: &[u8],
        location: &dyn Display,
        line_number: u64,
    ) -> Result<Option<i64>, SortError> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        match text.parse::<i64>() {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self {
                MalformedLinePolicy::Skip => {
                    log::warn!("{} line {}: skipping {:?} ({})", location, line_number, text, err);
                    Ok(None)
                }
                MalformedLinePolicy::Zero => {
                    log::warn!("{} line {}: using 0 for {:?} ({})", location, line_number, text, err);
                    Ok(Some(0))
                }
                MalformedLinePolicy::Fail => Err(SortError::MalformedRecord {
                    location: location.to_string(),
                    line_number,
                    line: text.to_string(),
                }),
            },
        }
    }
}

impl FromStr for MalformedLinePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(MalformedLinePolicy::Skip),
            "zero" => Ok(MalformedLinePolicy::Zero),
            "fail" => Ok(MalformedLinePolicy::Fail),
            _ => Err(format!("unknown malformed line policy: {}", s)),
        }
    }
}

/// Buffer collecting one partition's records, limited by the number of raw input bytes consumed.
pub struct RecordBuffer {
    limit: u64,
    consumed: u64,
    lines: u64,
    delimiter: u8,
    policy: MalformedLinePolicy,
    inner: Vec<i64>,
}

impl RecordBuffer {
    /// Creates a buffer that is full once `limit` raw bytes were pushed into it.
    pub fn new(limit: u64, delimiter: u8, policy: MalformedLinePolicy) -> Self {
        RecordBuffer {
            limit,
            consumed: 0,
            lines: 0,
            delimiter,
            policy,
            inner: Vec::new(),
        }
    }

    /// Parses a delimiter-terminated block of raw bytes and appends its records.
    /// The block must not end in the middle of a record unless the input ends there.
    pub fn push_chunk(&mut self, chunk: &[u8], location: &dyn Display) -> Result<(), SortError> {
        self.consumed += chunk.len() as u64;

        let delimiter = self.delimiter;
        let mut lines = chunk.split(|byte| *byte == delimiter).peekable();
        while let Some(line) = lines.next() {
            // an empty tail after the final delimiter is not a line
            if line.is_empty() && lines.peek().is_none() {
                break;
            }
            self.lines += 1;
            if let Some(value) = self.policy.resolve(line, location, self.lines)? {
                self.inner.push(value);
            }
        }

        return Ok(());
    }

    /// Returns the number of records in the buffer.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of raw bytes pushed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Checks if the buffer reached the limit.
    pub fn is_full(&self) -> bool {
        self.consumed >= self.limit
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.inner
    }

    pub fn as_mut_slice(&mut self) -> &mut [i64] {
        &mut self.inner
    }
}

impl IntoIterator for RecordBuffer {
    type Item = i64;
    type IntoIter = <Vec<i64> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}
