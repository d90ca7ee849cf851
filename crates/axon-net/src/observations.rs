//! Fixed-capacity store of `(input, output)` training records.
//!
//! Records are packed into one flat block, each `input_count +
//! output_count` values wide, so the whole dataset costs one allocation.

use axon_arena::{BlockAllocator, BlockHandle, HeapAllocator};
use axon_core::{NnError, NnResult};
use log::debug;

/// A bounded dataset living in its own allocator.
pub struct ObservationStore<A: BlockAllocator = HeapAllocator> {
    alloc: A,
    block: Option<BlockHandle>,
    input_count: usize,
    output_count: usize,
    max_count: usize,
    count: usize,
}

impl<A: BlockAllocator> ObservationStore<A> {
    /// Create a store with room for `max_count` records.
    pub fn new(
        alloc: A,
        input_count: usize,
        output_count: usize,
        max_count: usize,
    ) -> NnResult<Self> {
        let mut store = Self::empty(alloc);
        store.init(input_count, output_count, max_count)?;
        Ok(store)
    }

    /// Create a store with no capacity; call [`init`](Self::init) to size it.
    pub fn empty(alloc: A) -> Self {
        Self {
            alloc,
            block: None,
            input_count: 0,
            output_count: 0,
            max_count: 0,
            count: 0,
        }
    }

    /// Release the current records and resize the store.
    ///
    /// On failure the store is left empty with no capacity.
    pub fn init(&mut self, input_count: usize, output_count: usize, max_count: usize) -> NnResult<()> {
        self.alloc.release(self.block.take());
        self.input_count = 0;
        self.output_count = 0;
        self.max_count = 0;
        self.count = 0;

        if input_count == 0 || output_count == 0 {
            return Err(NnError::invalid_shape(format!(
                "observation widths must be positive, got {input_count}+{output_count}"
            )));
        }
        if max_count > 0 {
            let floats = (input_count + output_count)
                .checked_mul(max_count)
                .ok_or_else(|| NnError::invalid_shape("observation store size overflows"))?;
            self.block = Some(self.alloc.allocate_floats(floats)?);
        }
        self.input_count = input_count;
        self.output_count = output_count;
        self.max_count = max_count;
        debug!("observation store sized for {max_count} records of {input_count}+{output_count}");
        Ok(())
    }

    /// Width of each record's input part.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Width of each record's output part.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Capacity in records.
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Number of valid records.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether no record is valid.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether every slot holds a valid record.
    pub fn is_full(&self) -> bool {
        self.count >= self.max_count
    }

    /// Forget every record; capacity is kept.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    fn width(&self) -> usize {
        self.input_count + self.output_count
    }

    /// Input and output slices of slot `index`.
    ///
    /// The index is checked against capacity rather than `count`, so a
    /// loader may fill slots before publishing them with
    /// [`set_count`](Self::set_count).
    pub fn get(&self, index: usize) -> Option<(&[f32], &[f32])> {
        if index >= self.max_count {
            return None;
        }
        let block = self.alloc.block(self.block?)?;
        let width = self.width();
        let record = block.get(index * width..(index + 1) * width)?;
        Some(record.split_at(self.input_count))
    }

    /// Mutable input and output slices of slot `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<(&mut [f32], &mut [f32])> {
        if index >= self.max_count {
            return None;
        }
        let width = self.width();
        let input_count = self.input_count;
        let block = self.alloc.block_mut(self.block?)?;
        let record = block.get_mut(index * width..(index + 1) * width)?;
        Some(record.split_at_mut(input_count))
    }

    /// Append a record, copying as many values as fit in each part; parts
    /// shorter than the record width leave the remainder zeroed.
    pub fn push(&mut self, input: &[f32], output: &[f32]) -> NnResult<()> {
        if self.is_full() {
            return Err(NnError::DatasetCapacityExceeded {
                capacity: self.max_count,
            });
        }
        let index = self.count;
        let (slot_in, slot_out) = self
            .get_mut(index)
            .ok_or_else(|| NnError::invalid_shape("observation block is not live"))?;
        slot_in.fill(0.0);
        slot_out.fill(0.0);
        let n = input.len().min(slot_in.len());
        slot_in[..n].copy_from_slice(&input[..n]);
        let n = output.len().min(slot_out.len());
        slot_out[..n].copy_from_slice(&output[..n]);
        self.count += 1;
        Ok(())
    }

    /// Publish the first `count` slots as valid records.
    pub fn set_count(&mut self, count: usize) -> NnResult<()> {
        if count > self.max_count {
            return Err(NnError::DatasetCapacityExceeded {
                capacity: self.max_count,
            });
        }
        self.count = count;
        Ok(())
    }

    /// Iterate over the valid records in order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f32], &[f32])> + '_ {
        (0..self.count).filter_map(move |i| self.get(i))
    }

    /// The allocator backing the store.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<A: BlockAllocator> std::fmt::Debug for ObservationStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationStore")
            .field("input_count", &self.input_count)
            .field("output_count", &self.output_count)
            .field("count", &self.count)
            .field("max_count", &self.max_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_arena::BlockArena;

    #[test]
    fn push_until_full() {
        let mut store = ObservationStore::new(HeapAllocator::new(), 2, 1, 2).unwrap();
        store.push(&[1.0, 2.0], &[3.0]).unwrap();
        store.push(&[4.0, 5.0], &[6.0]).unwrap();
        assert!(store.is_full());
        assert_eq!(
            store.push(&[0.0, 0.0], &[0.0]),
            Err(NnError::DatasetCapacityExceeded { capacity: 2 })
        );
        let (input, output) = store.get(1).unwrap();
        assert_eq!(input, &[4.0, 5.0]);
        assert_eq!(output, &[6.0]);
    }

    #[test]
    fn get_checks_capacity_not_count() {
        let store = ObservationStore::new(HeapAllocator::new(), 1, 1, 3).unwrap();
        assert_eq!(store.count(), 0);
        assert!(store.get(2).is_some());
        assert!(store.get(3).is_none());
    }

    #[test]
    fn short_parts_are_zero_padded_and_long_parts_truncated() {
        let mut store = ObservationStore::new(HeapAllocator::new(), 3, 2, 1).unwrap();
        {
            let (input, output) = store.get_mut(0).unwrap();
            input.fill(9.0);
            output.fill(9.0);
        }
        store.push(&[1.0], &[1.0, 2.0, 3.0]).unwrap();
        let (input, output) = store.get(0).unwrap();
        assert_eq!(input, &[1.0, 0.0, 0.0]);
        assert_eq!(output, &[1.0, 2.0]);
    }

    #[test]
    fn loader_fills_slots_then_sets_count() {
        let mut store = ObservationStore::new(HeapAllocator::new(), 1, 1, 4).unwrap();
        for i in 0..3 {
            let (input, output) = store.get_mut(i).unwrap();
            input[0] = i as f32;
            output[0] = -(i as f32);
        }
        store.set_count(3).unwrap();
        let collected: Vec<f32> = store.iter().map(|(x, _)| x[0]).collect();
        assert_eq!(collected, vec![0.0, 1.0, 2.0]);
        assert!(store.set_count(5).is_err());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn init_reuses_the_arena() {
        let arena = BlockArena::with_bytes(256).unwrap();
        let mut store = ObservationStore::new(arena, 2, 2, 10).unwrap();
        store.push(&[1.0, 1.0], &[1.0, 1.0]).unwrap();
        for _ in 0..10 {
            store.init(2, 2, 10).unwrap();
        }
        assert_eq!(store.count(), 0);
        assert!(store.init(2, 2, 100).is_err());
        assert_eq!(store.max_count(), 0);
        assert!(store.get(0).is_none());
    }

    #[test]
    fn zero_capacity_store_is_always_full() {
        let mut store = ObservationStore::new(HeapAllocator::new(), 1, 1, 0).unwrap();
        assert!(store.is_full());
        assert!(store.push(&[1.0], &[1.0]).is_err());
        assert!(store.get(0).is_none());
    }
}
