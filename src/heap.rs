//! Binary min-heap with an injected comparator.
//!
//! The heap is a dense vector laid out as an implicit complete binary tree: children of `i` live at
//! `2i + 1` and `2i + 2`, the parent of `i` at `(i - 1) / 2`. The comparator `compare(a, b)` answers
//! "may `a` stand above `b`", so for every parent/child pair `compare(parent, child)` holds between
//! operations.

use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display};

/// Heap item used by the merger: a record value tagged with the partition it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub value: i64,
    pub partition_id: usize,
}

impl Pair {
    pub fn new(value: i64, partition_id: usize) -> Self {
        Pair { value, partition_id }
    }
}

impl Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.partition_id)
    }
}

/// Heap operation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// Extraction index is outside of `[0, size)`.
    IndexOutOfRange { index: usize, size: usize },
}

impl Error for HeapError {}

impl Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::IndexOutOfRange { index, size } => {
                write!(f, "heap index {} out of range (size: {})", index, size)
            }
        }
    }
}

/// Array-backed binary heap ordered by `compare`.
pub struct MinHeap<T, F>
where
    F: Fn(&T, &T) -> bool,
{
    data: Vec<T>,
    compare: F,
}

impl<T, F> MinHeap<T, F>
where
    F: Fn(&T, &T) -> bool,
{
    /// Creates an empty heap.
    ///
    /// # Arguments
    /// * `compare` - Returns `true` if the first argument must not come after the second one
    pub fn new(compare: F) -> Self {
        MinHeap {
            data: Vec::new(),
            compare,
        }
    }

    /// Creates an empty heap able to hold `capacity` items without reallocation.
    pub fn with_capacity(capacity: usize, compare: F) -> Self {
        MinHeap {
            data: Vec::with_capacity(capacity),
            compare,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the head item without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    /// Returns the backing array in heap order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Inserts a single item sifting it up, *O(log n)*.
    pub fn insert(&mut self, item: T) {
        self.data.push(item);
        self.sift_up(self.data.len() - 1);
    }

    /// Appends all items and re-heapifies bottom-up, *O(n)*.
    pub fn insert_many<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.data.extend(items);
        for idx in (0..self.data.len() / 2).rev() {
            self.sift_down(idx);
        }
    }

    /// Removes and returns the item at `idx`.
    /// The heap is left unmodified if the index is out of range.
    pub fn extract_at(&mut self, idx: usize) -> Result<T, HeapError> {
        let size = self.data.len();
        if idx >= size {
            return Err(HeapError::IndexOutOfRange { index: idx, size });
        }

        let item = self.data.swap_remove(idx);
        if idx < self.data.len() {
            self.sift_down(idx);
            // the moved tail item may also belong above its new parent
            self.sift_up(idx);
        }

        return Ok(item);
    }

    /// Removes and returns the head item.
    pub fn extract_head(&mut self) -> Result<T, HeapError> {
        self.extract_at(0)
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx != 0 {
            let parent = (idx - 1) / 2;
            if (self.compare)(&self.data[parent], &self.data[idx]) {
                return;
            }
            self.data.swap(parent, idx);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let mut candidate = idx;
            for child in [2 * idx + 1, 2 * idx + 2] {
                if child < self.data.len() && !(self.compare)(&self.data[candidate], &self.data[child]) {
                    candidate = child;
                }
            }
            if candidate == idx {
                return;
            }
            self.data.swap(idx, candidate);
            idx = candidate;
        }
    }
}

/// Renders one tree level per line.
impl<T, F> Display for MinHeap<T, F>
where
    T: Display,
    F: Fn(&T, &T) -> bool,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut level_start = 0;
        let mut level_len = 1;
        while level_start < self.data.len() {
            let level_end = (level_start + level_len).min(self.data.len());
            for (pos, item) in self.data[level_start..level_end].iter().enumerate() {
                if pos > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", item)?;
            }
            writeln!(f)?;
            level_start = level_end;
            level_len *= 2;
        }
        Ok(())
    }
}

impl<T, F> Debug for MinHeap<T, F>
where
    T: Debug,
    F: Fn(&T, &T) -> bool,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinHeap").field("data", &self.data).finish()
    }
}
