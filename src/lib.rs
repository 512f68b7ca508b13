//! `ext-int-sort` is an external sort for files of newline-delimited decimal integers.
//!
//! External sorting handles inputs that do not fit into the main memory. Sorting is achieved in two passes.
//! During the first pass the input is divided into partitions sized to the memory budget; each partition is read,
//! sorted in memory and saved to its own file. During the second pass the sorted partitions are merged into the
//! output with a k-way merge driven by a binary min-heap holding one record per partition.
//! For more information see [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Memory budget:**
//!   the input is split into `ceil(input size / budget)` partitions, each read in a few bounded raw chunks
//!   re-aligned to record boundaries.
//! * **Pluggable in-memory sort:**
//!   partitions are sorted by any [`SortAlgorithm`]; quicksort with a median-of-three pivot is the default.
//! * **Custom order:**
//!   records can be sorted by any `less(a, b)` predicate.
//! * **Malformed line policy:**
//!   lines that are not integers can be skipped, replaced with zero or rejected.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ext_int_sort::{Algorithm, ExternalSorterBuilder};
//!
//! fn main() {
//!     let sorter = ExternalSorterBuilder::new()
//!         .with_input(Path::new("input.txt"))
//!         .with_memory_budget_gib(0.5)
//!         .with_algorithm(Algorithm::Quick)
//!         .build()
//!         .unwrap();
//!
//!     let summary = sorter.sort().unwrap();
//!     println!("{} records sorted into {}", summary.records, summary.output.display());
//! }
//! ```

pub mod algorithms;
pub mod buffer;
pub mod heap;
pub mod merger;
pub mod partition;
pub mod partitioner;
pub mod sort;

pub use algorithms::{Algorithm, BubbleSort, QuickSort, SortAlgorithm, StdSort};
pub use buffer::{MalformedLinePolicy, RecordBuffer};
pub use heap::{HeapError, MinHeap, Pair};
pub use merger::HeapMerger;
pub use partition::{Partition, PartitionReader};
pub use partitioner::Partitioner;
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortConfig, SortError, SortSummary};
