//! External sorter.

use log;
use std::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use bytesize::GIB;

use crate::algorithms::{Algorithm, SortAlgorithm};
use crate::buffer::MalformedLinePolicy;
use crate::merger::{by_value, HeapMerger};
use crate::partition::Partition;
use crate::partitioner::Partitioner;

/// Default number of raw reads a partition is assembled from.
pub const DEFAULT_SUB_CHUNKS: usize = 5;
/// Default record delimiter.
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Sorter configuration is not valid.
    InvalidConfig(&'static str),
    /// Input file opening or reading error.
    Input(io::Error),
    /// Partition file creation or writing error.
    PartitionCreate(PathBuf, io::Error),
    /// Partition file opening or reading error.
    PartitionRead(PathBuf, io::Error),
    /// Output file creation or writing error.
    Output(PathBuf, io::Error),
    /// A line is not a decimal integer.
    MalformedRecord {
        location: String,
        line_number: u64,
        line: String,
    },
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::Input(err) => Some(err),
            SortError::PartitionCreate(_, err) => Some(err),
            SortError::PartitionRead(_, err) => Some(err),
            SortError::Output(_, err) => Some(err),
            SortError::InvalidConfig(_) | SortError::MalformedRecord { .. } => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::InvalidConfig(reason) => write!(f, "invalid sorter configuration: {}", reason),
            SortError::Input(err) => write!(f, "input file error: {}", err),
            SortError::PartitionCreate(path, err) => {
                write!(f, "partition {} not created: {}", path.display(), err)
            }
            SortError::PartitionRead(path, err) => write!(f, "partition {} read failed: {}", path.display(), err),
            SortError::Output(path, err) => write!(f, "output {} not written: {}", path.display(), err),
            SortError::MalformedRecord {
                location,
                line_number,
                line,
            } => write!(f, "{} line {}: malformed record {:?}", location, line_number, line),
        }
    }
}

/// Computes the partition count and the nominal partition size in bytes for an input of `input_size` bytes.
/// The last partition additionally takes the division remainder.
pub fn plan(input_size: u64, memory_budget: u64) -> (usize, u64) {
    if input_size == 0 || memory_budget == 0 {
        return (0, 0);
    }
    let count = (input_size - 1) / memory_budget + 1;
    return (count as usize, input_size / count);
}

/// Immutable sort run configuration.
#[derive(Debug, Clone)]
pub struct SortConfig {
    input: PathBuf,
    memory_budget: u64,
    sub_chunks: usize,
    delimiter: u8,
    rw_buf_size: Option<usize>,
    partitions_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    keep_partitions: bool,
    malformed_lines: MalformedLinePolicy,
}

impl SortConfig {
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Memory budget in bytes.
    pub fn memory_budget(&self) -> u64 {
        self.memory_budget
    }

    pub fn sub_chunks(&self) -> usize {
        self.sub_chunks
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn rw_buf_size(&self) -> Option<usize> {
        self.rw_buf_size
    }

    pub fn keep_partitions(&self) -> bool {
        self.keep_partitions
    }

    pub fn malformed_lines(&self) -> MalformedLinePolicy {
        self.malformed_lines
    }

    /// Returns the location of the partition file `id`: `<input>_<id>`,
    /// placed in the partitions directory if one is configured.
    pub fn partition_path(&self, id: usize) -> PathBuf {
        let suffix = format!("_{}", id);
        match (&self.partitions_dir, self.input.file_name()) {
            (Some(dir), Some(name)) => {
                let mut name = name.to_os_string();
                name.push(suffix);
                dir.join(name)
            }
            _ => append_suffix(&self.input, &suffix),
        }
    }

    /// Returns the location of the merged output: `<input>_sorted` unless set explicitly.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(output) => output.clone(),
            None => append_suffix(&self.input, "_sorted"),
        }
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Debug, Clone)]
pub struct ExternalSorterBuilder {
    input: Option<PathBuf>,
    memory_budget: Option<u64>,
    sub_chunks: usize,
    delimiter: u8,
    rw_buf_size: Option<usize>,
    partitions_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    keep_partitions: bool,
    malformed_lines: MalformedLinePolicy,
    algorithm: Algorithm,
}

impl ExternalSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using the configured algorithm.
    pub fn build(self) -> Result<ExternalSorter, SortError> {
        let algorithm = self.algorithm;
        self.build_with(algorithm)
    }

    /// Builds an [`ExternalSorter`] instance using a custom sorting algorithm.
    pub fn build_with<A: SortAlgorithm>(self, algorithm: A) -> Result<ExternalSorter<A>, SortError> {
        let input = self.input.ok_or(SortError::InvalidConfig("input file is not set"))?;
        let memory_budget = match self.memory_budget {
            Some(budget) if budget > 0 => budget,
            Some(_) => return Err(SortError::InvalidConfig("memory budget must be positive")),
            None => return Err(SortError::InvalidConfig("memory budget is not set")),
        };
        if self.sub_chunks == 0 {
            return Err(SortError::InvalidConfig("sub-chunks number must be positive"));
        }

        let config = SortConfig {
            input,
            memory_budget,
            sub_chunks: self.sub_chunks,
            delimiter: self.delimiter,
            rw_buf_size: self.rw_buf_size,
            partitions_dir: self.partitions_dir,
            output: self.output,
            keep_partitions: self.keep_partitions,
            malformed_lines: self.malformed_lines,
        };

        return Ok(ExternalSorter::new(config, algorithm));
    }

    /// Sets the file to be sorted.
    pub fn with_input(mut self, path: &Path) -> ExternalSorterBuilder {
        self.input = Some(path.into());
        return self;
    }

    /// Sets memory budget in bytes.
    pub fn with_memory_budget(mut self, bytes: u64) -> ExternalSorterBuilder {
        self.memory_budget = Some(bytes);
        return self;
    }

    /// Sets memory budget in gibibytes.
    pub fn with_memory_budget_gib(mut self, gib: f64) -> ExternalSorterBuilder {
        self.memory_budget = Some((gib * GIB as f64) as u64);
        return self;
    }

    /// Sets number of raw reads each partition is assembled from.
    pub fn with_sub_chunks(mut self, sub_chunks: usize) -> ExternalSorterBuilder {
        self.sub_chunks = sub_chunks;
        return self;
    }

    /// Sets record delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> ExternalSorterBuilder {
        self.delimiter = delimiter;
        return self;
    }

    /// Sets file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> ExternalSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Sets directory to store partition files in instead of the input directory.
    pub fn with_partitions_dir(mut self, path: &Path) -> ExternalSorterBuilder {
        self.partitions_dir = Some(path.into());
        return self;
    }

    /// Sets output file.
    pub fn with_output(mut self, path: &Path) -> ExternalSorterBuilder {
        self.output = Some(path.into());
        return self;
    }

    /// Keeps partition files after a successful merge.
    pub fn with_keep_partitions(mut self, keep: bool) -> ExternalSorterBuilder {
        self.keep_partitions = keep;
        return self;
    }

    /// Sets malformed line handling policy.
    pub fn with_malformed_lines(mut self, policy: MalformedLinePolicy) -> ExternalSorterBuilder {
        self.malformed_lines = policy;
        return self;
    }

    /// Sets in-memory sorting algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> ExternalSorterBuilder {
        self.algorithm = algorithm;
        return self;
    }
}

impl Default for ExternalSorterBuilder {
    fn default() -> Self {
        ExternalSorterBuilder {
            input: None,
            memory_budget: None,
            sub_chunks: DEFAULT_SUB_CHUNKS,
            delimiter: DEFAULT_DELIMITER,
            rw_buf_size: None,
            partitions_dir: None,
            output: None,
            keep_partitions: false,
            malformed_lines: MalformedLinePolicy::default(),
            algorithm: Algorithm::default(),
        }
    }
}

/// Result of a sort run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSummary {
    /// Number of partitions the input was divided into.
    pub partitions: usize,
    /// Number of records written to the output.
    pub records: u64,
    /// Merged output location.
    pub output: PathBuf,
}

/// External sorter.
pub struct ExternalSorter<A = Algorithm>
where
    A: SortAlgorithm,
{
    config: SortConfig,
    algorithm: A,
}

impl<A> ExternalSorter<A>
where
    A: SortAlgorithm,
{
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `config` - Sort run configuration
    /// * `algorithm` - Algorithm used to sort each partition in memory
    pub fn new(config: SortConfig, algorithm: A) -> Self {
        ExternalSorter { config, algorithm }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sorts the input file in ascending order.
    pub fn sort(&self) -> Result<SortSummary, SortError> {
        self.sort_by(|a: &i64, b: &i64| a < b)
    }

    /// Sorts the input file using a custom compare function.
    ///
    /// # Arguments
    /// * `less` - Returns `true` if the first record must be placed before the second one
    pub fn sort_by<F>(&self, less: F) -> Result<SortSummary, SortError>
    where
        F: Fn(&i64, &i64) -> bool + Copy,
    {
        let partitions = self.divide(less)?;
        let summary = self.merge(&partitions, less)?;

        if !self.config.keep_partitions {
            for partition in partitions {
                let path = partition.path().to_path_buf();
                if let Err(err) = partition.remove() {
                    log::warn!("partition {} not removed: {}", path.display(), err);
                }
            }
        }

        return Ok(summary);
    }

    /// Splits the input into sorted partition files.
    pub fn divide<F>(&self, less: F) -> Result<Vec<Partition>, SortError>
    where
        F: Fn(&i64, &i64) -> bool,
    {
        Partitioner::new(&self.config, &self.algorithm).divide(less)
    }

    /// Merges sorted partitions into the output file.
    pub fn merge<F>(&self, partitions: &[Partition], less: F) -> Result<SortSummary, SortError>
    where
        F: Fn(&i64, &i64) -> bool + Copy,
    {
        let output = self.config.output_path();
        log::info!("merging {} partitions into {}", partitions.len(), output.display());

        let mut readers = Vec::with_capacity(partitions.len());
        for partition in partitions {
            readers.push(partition.open(
                self.config.delimiter,
                self.config.malformed_lines,
                self.config.rw_buf_size,
            )?);
        }

        let file = fs::File::create(&output).map_err(|err| SortError::Output(output.clone(), err))?;
        let mut writer = match self.config.rw_buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        let mut records = 0;
        for value in HeapMerger::new(readers, by_value(less)) {
            let value = value?;
            write!(writer, "{}", value)
                .and_then(|_| writer.write_all(&[self.config.delimiter]))
                .map_err(|err| SortError::Output(output.clone(), err))?;
            records += 1;
        }
        writer.flush().map_err(|err| SortError::Output(output.clone(), err))?;

        log::info!("{} records written to {}", records, output.display());

        return Ok(SortSummary {
            partitions: partitions.len(),
            records,
            output,
        });
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use rand::seq::SliceRandom;
    use rand::Rng;
    use rstest::*;

    use super::{plan, ExternalSorterBuilder, SortError};
    use crate::algorithms::Algorithm;
    use crate::buffer::MalformedLinePolicy;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn write_input(dir: &Path, values: &[i64]) -> std::path::PathBuf {
        let path = dir.join("input");
        let content: String = values.iter().map(|v| format!("{}\n", v)).collect();
        fs::write(&path, content).unwrap();
        path
    }

    fn read_values(path: &Path) -> Vec<i64> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| line.parse().unwrap())
            .collect()
    }

    #[rstest]
    #[case(0, 10, (0, 0))]
    #[case(10, 10, (1, 10))]
    #[case(11, 10, (2, 5))]
    #[case(36, 12, (3, 12))]
    #[case(100, 7, (15, 6))]
    #[case(5, 1, (5, 1))]
    #[case(10, u64::MAX, (1, 10))]
    #[case(u64::MAX, u64::MAX, (1, u64::MAX))]
    #[case(u64::MAX, 1 << 62, (4, u64::MAX / 4))]
    fn test_plan(#[case] input_size: u64, #[case] budget: u64, #[case] expected: (usize, u64)) {
        assert_eq!(plan(input_size, budget), expected);
    }

    #[rstest]
    #[case(Algorithm::Quick)]
    #[case(Algorithm::Bubble)]
    #[case(Algorithm::Std)]
    fn test_single_partition(tmp_dir: tempfile::TempDir, #[case] algorithm: Algorithm) {
        let input = write_input(tmp_dir.path(), &[5, 3, 1, 4, 2]);
        let sorter = ExternalSorterBuilder::new()
            .with_input(&input)
            .with_memory_budget_gib(1.0)
            .with_algorithm(algorithm)
            .build()
            .unwrap();

        let partitions = sorter.divide(|a, b| a < b).unwrap();
        assert_eq!(partitions.len(), 1);
        assert_eq!(read_values(partitions[0].path()), vec![1, 2, 3, 4, 5]);

        let summary = sorter.merge(&partitions, |a, b| a < b).unwrap();
        assert_eq!(summary.records, 5);
        assert_eq!(summary.output, tmp_dir.path().join("input_sorted"));
        assert_eq!(read_values(&summary.output), vec![1, 2, 3, 4, 5]);
    }

    #[rstest]
    fn test_three_partitions(tmp_dir: tempfile::TempDir) {
        let values = [47, 12, 93, 30, 58, 21, 76, 15, 84, 39, 62, 10];
        let input = write_input(tmp_dir.path(), &values);
        let sorter = ExternalSorterBuilder::new()
            .with_input(&input)
            .with_memory_budget(12)
            .build()
            .unwrap();

        let partitions = sorter.divide(|a, b| a < b).unwrap();
        assert_eq!(partitions.len(), 3);
        for (id, (partition, raw)) in partitions.iter().zip(values.chunks(4)).enumerate() {
            let mut expected = raw.to_vec();
            expected.sort();
            assert_eq!(partition.id(), id);
            assert_eq!(partition.path(), tmp_dir.path().join(format!("input_{}", id)));
            assert_eq!(read_values(partition.path()), expected);
        }

        let summary = sorter.merge(&partitions, |a, b| a < b).unwrap();
        let mut expected = values.to_vec();
        expected.sort();
        assert_eq!(read_values(&summary.output), expected);
    }

    #[rstest]
    #[case(1, 5)]
    #[case(7, 1)]
    #[case(7, 5)]
    #[case(50, 3)]
    #[case(64, 100)]
    #[case(10_000, 5)]
    fn test_sort_random_input(tmp_dir: tempfile::TempDir, #[case] budget: u64, #[case] sub_chunks: usize) {
        let mut rng = rand::thread_rng();
        let values: Vec<i64> = (0..40).map(|_| rng.gen_range(-1000..1000)).collect();
        let input = write_input(tmp_dir.path(), &values);
        let input_size = fs::metadata(&input).unwrap().len();

        let sorter = ExternalSorterBuilder::new()
            .with_input(&input)
            .with_memory_budget(budget)
            .with_sub_chunks(sub_chunks)
            .with_keep_partitions(true)
            .build()
            .unwrap();

        let partitions = sorter.divide(|a, b| a < b).unwrap();
        assert_eq!(partitions.len() as u64, (input_size + budget - 1) / budget);
        assert_eq!(partitions.iter().map(|p| p.records()).sum::<usize>(), values.len());
        for partition in &partitions {
            let stored = read_values(partition.path());
            assert!(stored.windows(2).all(|w| w[0] <= w[1]));
        }

        let summary = sorter.merge(&partitions, |a, b| a < b).unwrap();
        let mut expected = values;
        expected.sort();
        assert_eq!(summary.records as usize, expected.len());
        assert_eq!(read_values(&summary.output), expected);
    }

    #[rstest]
    fn test_sort_descending_with_duplicates(tmp_dir: tempfile::TempDir) {
        let mut values: Vec<i64> = (0..30).flat_map(|v| [v, v]).collect();
        values.shuffle(&mut rand::thread_rng());
        let input = write_input(tmp_dir.path(), &values);

        let sorter = ExternalSorterBuilder::new()
            .with_input(&input)
            .with_memory_budget(40)
            .build()
            .unwrap();
        let summary = sorter.sort_by(|a, b| a > b).unwrap();

        let mut expected = values;
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(summary.partitions, 4);
        assert_eq!(read_values(&summary.output), expected);
    }

    #[rstest]
    fn test_partitions_removed(tmp_dir: tempfile::TempDir) {
        let input = write_input(tmp_dir.path(), &[3, 2, 1, 6, 5, 4]);
        let parts_dir = tmp_dir.path().join("parts");
        fs::create_dir(&parts_dir).unwrap();
        let output = tmp_dir.path().join("result.txt");

        let sorter = ExternalSorterBuilder::new()
            .with_input(&input)
            .with_memory_budget(4)
            .with_partitions_dir(&parts_dir)
            .with_output(&output)
            .build()
            .unwrap();
        assert_eq!(sorter.config().partition_path(2), parts_dir.join("input_2"));

        let summary = sorter.sort().unwrap();
        assert_eq!(summary.partitions, 3);
        assert_eq!(summary.output, output);
        assert_eq!(read_values(&output), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(fs::read_dir(&parts_dir).unwrap().count(), 0);
    }

    #[rstest]
    fn test_empty_input(tmp_dir: tempfile::TempDir) {
        let input = write_input(tmp_dir.path(), &[]);
        let sorter = ExternalSorterBuilder::new()
            .with_input(&input)
            .with_memory_budget(16)
            .build()
            .unwrap();

        let summary = sorter.sort().unwrap();
        assert_eq!(summary.partitions, 0);
        assert_eq!(summary.records, 0);
        assert_eq!(fs::read_to_string(&summary.output).unwrap(), "");
    }

    #[rstest]
    #[case(MalformedLinePolicy::Skip, Some(vec![-2, 1, 7]))]
    #[case(MalformedLinePolicy::Zero, Some(vec![-2, 0, 1, 7]))]
    #[case(MalformedLinePolicy::Fail, None)]
    fn test_malformed_input(
        tmp_dir: tempfile::TempDir,
        #[case] policy: MalformedLinePolicy,
        #[case] expected: Option<Vec<i64>>,
    ) {
        let input = tmp_dir.path().join("input");
        fs::write(&input, "7\nseven\n-2\n1").unwrap();
        let sorter = ExternalSorterBuilder::new()
            .with_input(&input)
            .with_memory_budget(1024)
            .with_malformed_lines(policy)
            .build()
            .unwrap();

        match (sorter.sort(), expected) {
            (Ok(summary), Some(expected)) => assert_eq!(read_values(&summary.output), expected),
            (Err(SortError::MalformedRecord { line, .. }), None) => assert_eq!(line, "seven"),
            (result, _) => panic!("unexpected result: {:?}", result),
        }
    }

    #[rstest]
    fn test_missing_input(tmp_dir: tempfile::TempDir) {
        let sorter = ExternalSorterBuilder::new()
            .with_input(&tmp_dir.path().join("missing"))
            .with_memory_budget(16)
            .build()
            .unwrap();
        assert!(matches!(sorter.sort(), Err(SortError::Input(_))));
    }

    #[test]
    fn test_invalid_config() {
        let input = Path::new("input");
        assert!(matches!(
            ExternalSorterBuilder::new().with_memory_budget(1).build(),
            Err(SortError::InvalidConfig(_))
        ));
        assert!(matches!(
            ExternalSorterBuilder::new().with_input(input).build(),
            Err(SortError::InvalidConfig(_))
        ));
        assert!(matches!(
            ExternalSorterBuilder::new().with_input(input).with_memory_budget(0).build(),
            Err(SortError::InvalidConfig(_))
        ));
        assert!(matches!(
            ExternalSorterBuilder::new()
                .with_input(input)
                .with_memory_budget(1)
                .with_sub_chunks(0)
                .build(),
            Err(SortError::InvalidConfig(_))
        ));
    }

    #[rstest]
    #[case(1e30)]
    #[case(f64::INFINITY)]
    fn test_huge_memory_budget(tmp_dir: tempfile::TempDir, #[case] gib: f64) {
        let input = write_input(tmp_dir.path(), &[3, 1, 2]);
        let sorter = ExternalSorterBuilder::new()
            .with_input(&input)
            .with_memory_budget_gib(gib)
            .build()
            .unwrap();
        assert_eq!(sorter.config().memory_budget(), u64::MAX);

        let summary = sorter.sort().unwrap();
        assert_eq!(summary.partitions, 1);
        assert_eq!(read_values(&summary.output), vec![1, 2, 3]);
    }

    #[test]
    fn test_memory_budget_gib() {
        let sorter = ExternalSorterBuilder::new()
            .with_input(Path::new("data"))
            .with_memory_budget_gib(0.5)
            .build()
            .unwrap();
        assert_eq!(sorter.config().memory_budget(), 512 * 1024 * 1024);
        assert_eq!(sorter.config().output_path(), Path::new("data_sorted"));
        assert_eq!(sorter.config().partition_path(3), Path::new("data_3"));
    }
}
