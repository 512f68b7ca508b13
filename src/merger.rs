//! Binary heap merger.

use log;
use std::marker::PhantomData;

use crate::heap::{MinHeap, Pair};

/// Lifts a record ordering to heap pairs: a pair may stand above another unless its value is `less` than the
/// other's value.
pub fn by_value<L>(less: L) -> impl Fn(&Pair, &Pair) -> bool + Copy
where
    L: Fn(&i64, &i64) -> bool + Copy,
{
    move |a: &Pair, b: &Pair| !less(&b.value, &a.value)
}

/// K-way merger over sorted record sources.
/// Merges multiple sorted inputs into a single sorted output.
/// Time complexity is *m* \* log(*n*) in worst case where *m* is the number of items,
/// *n* is the number of sources. The heap holds at most one record per open source.
pub struct HeapMerger<C, F, E>
where
    C: Iterator<Item = Result<i64, E>>,
    F: Fn(&Pair, &Pair) -> bool,
{
    heap: MinHeap<Pair, F>,
    // exhausted sources are dropped, releasing their resources
    sources: Vec<Option<C>>,
    initiated: bool,

    error_type: PhantomData<E>,
}

impl<C, F, E> HeapMerger<C, F, E>
where
    C: Iterator<Item = Result<i64, E>>,
    F: Fn(&Pair, &Pair) -> bool,
{
    /// Creates an instance of a heap merger.
    /// Source items should be sorted according to `compare` otherwise the result is undefined.
    ///
    /// # Arguments
    /// * `sources` - Sorted record sources, source index is used as the partition id
    /// * `compare` - Heap pair ordering, see [`by_value`]
    pub fn new<I>(sources: I, compare: F) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let sources = Vec::from_iter(sources.into_iter().map(Some));
        let heap = MinHeap::with_capacity(sources.len(), compare);

        return HeapMerger {
            heap,
            sources,
            initiated: false,
            error_type: PhantomData,
        };
    }

    /// Returns the number of sources that are not exhausted yet.
    pub fn open_sources(&self) -> usize {
        self.sources.iter().filter(|source| source.is_some()).count()
    }

    fn init(&mut self) -> Result<(), E> {
        let mut heads = Vec::with_capacity(self.sources.len());
        for partition_id in 0..self.sources.len() {
            if let Some(value) = self.pull(partition_id)? {
                heads.push(Pair::new(value, partition_id));
            }
        }
        log::debug!("merge heap seeded with {} records", heads.len());
        self.heap.insert_many(heads);

        Ok(())
    }

    fn pull(&mut self, partition_id: usize) -> Result<Option<i64>, E> {
        let source = match self.sources[partition_id].as_mut() {
            Some(source) => source,
            None => return Ok(None),
        };

        match source.next() {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(err)) => {
                self.sources[partition_id] = None;
                Err(err)
            }
            None => {
                log::debug!("source #{} drained", partition_id);
                self.sources[partition_id] = None;
                Ok(None)
            }
        }
    }
}

impl<C, F, E> Iterator for HeapMerger<C, F, E>
where
    C: Iterator<Item = Result<i64, E>>,
    F: Fn(&Pair, &Pair) -> bool,
{
    type Item = Result<i64, E>;

    /// Returns the next record in the merged order.
    fn next(&mut self) -> Option<Self::Item> {
        if !self.initiated {
            self.initiated = true;
            if let Err(err) = self.init() {
                return Some(Err(err));
            }
        }

        // an empty heap means every source is drained
        let head = self.heap.extract_head().ok()?;
        match self.pull(head.partition_id) {
            Ok(Some(value)) => self.heap.insert(Pair::new(value, head.partition_id)),
            Ok(None) => {}
            Err(err) => return Some(Err(err)),
        }

        return Some(Ok(head.value));
    }
}
