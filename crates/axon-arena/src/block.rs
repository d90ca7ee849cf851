//! First-fit block allocator over a fixed array of cells.
//!
//! [`BlockArena`] owns one `Vec<i32>` sized at construction and never
//! grows it. Each block is a header cell followed by its payload; see
//! [`BlockHeader`] for the encoding. Payloads are viewed as `f32` slices
//! through `bytemuck`, so the arena needs no `unsafe`.

use std::ops::Range;

use log::{debug, trace, warn};

use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::handle::BlockHandle;
use crate::header::BlockHeader;
use crate::traits::BlockAllocator;
use crate::{cells_for_bytes, CELL_BYTES};

/// Fixed-capacity block allocator.
///
/// Allocation is a first-fit scan from the start of the arena. While
/// scanning, each free block absorbs any free blocks that immediately
/// follow it, so fragmentation left behind by [`deallocate`] is repaired
/// lazily by the next allocation.
///
/// [`deallocate`]: BlockAllocator::deallocate
pub struct BlockArena {
    cells: Vec<i32>,
}

impl BlockArena {
    /// Create an arena as one free block spanning the whole capacity.
    pub fn new(config: &ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let total = config.cell_count();
        let mut cells = vec![0; total];
        cells[0] = BlockHeader::Free((total - 1) as u32).to_raw();
        debug!("block arena created: {total} cells ({} bytes)", total * CELL_BYTES);
        Ok(Self { cells })
    }

    /// Create an arena of `total_bytes` bytes.
    pub fn with_bytes(total_bytes: usize) -> Result<Self, ArenaError> {
        Self::new(&ArenaConfig::new(total_bytes))
    }

    fn header(&self, at: usize) -> BlockHeader {
        BlockHeader::from_raw(self.cells[at])
    }

    fn set_header(&mut self, at: usize, header: BlockHeader) {
        self.cells[at] = header.to_raw();
    }

    /// Merge the free block at `at` with every free block directly after it.
    fn coalesce_at(&mut self, at: usize) {
        while let BlockHeader::Free(size) = self.header(at) {
            let next = at + 1 + size as usize;
            if next >= self.cells.len() {
                break;
            }
            match self.header(next) {
                BlockHeader::Free(next_size) => {
                    trace!("coalescing free blocks at {at} and {next}");
                    self.set_header(at, BlockHeader::Free(size + 1 + next_size));
                }
                BlockHeader::Allocated(_) => break,
            }
        }
    }

    /// Iterate `(header_index, header)` over every block in arena order.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, BlockHeader)> + '_ {
        let mut at = 0;
        std::iter::from_fn(move || {
            if at >= self.cells.len() {
                return None;
            }
            let header = self.header(at);
            let item = (at, header);
            at += header.span();
            Some(item)
        })
    }

    /// Payload range of a handle, if it names the payload of a live
    /// allocation large enough to back the view.
    ///
    /// The header must be reachable by the block scan: after a free and a
    /// coalesce, a stale handle's old header cell can lie inside another
    /// block's payload.
    fn payload_range(&self, handle: BlockHandle) -> Option<Range<usize>> {
        let start = handle.index as usize;
        let header_at = start.checked_sub(1)?;
        if header_at >= self.cells.len() || !self.is_block_start(header_at) {
            return None;
        }
        match self.header(header_at) {
            BlockHeader::Allocated(size) if size as usize >= handle.len() => {
                let end = start + handle.len();
                (end <= self.cells.len()).then_some(start..end)
            }
            _ => None,
        }
    }

    /// Whether `header_at` is the header of a block reachable by the scan.
    fn is_block_start(&self, header_at: usize) -> bool {
        self.blocks().any(|(at, _)| at == header_at)
    }

    /// Total arena size in bytes, headers included.
    pub fn capacity_bytes(&self) -> usize {
        self.cells.len() * CELL_BYTES
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of blocks, free and allocated.
    pub fn block_count(&self) -> usize {
        self.blocks().count()
    }

    /// Sum of all free payloads, in cells, without coalescing.
    pub fn free_words(&self) -> usize {
        self.blocks()
            .filter(|(_, h)| h.is_free())
            .map(|(_, h)| h.size())
            .sum()
    }

    /// Largest payload, in cells, that the next allocation could hand out
    /// once adjacent free blocks are merged.
    pub fn largest_free_words(&self) -> usize {
        let mut largest = 0;
        let mut run: Option<usize> = None;
        for (_, header) in self.blocks() {
            run = match (header, run) {
                (BlockHeader::Free(size), Some(r)) => Some(r + 1 + size as usize),
                (BlockHeader::Free(size), None) => Some(size as usize),
                (BlockHeader::Allocated(_), _) => None,
            };
            if let Some(r) = run {
                largest = largest.max(r);
            }
        }
        largest
    }

    /// Number of cells currently allocated (payloads only).
    pub fn used_words(&self) -> usize {
        self.blocks()
            .filter(|(_, h)| !h.is_free())
            .map(|(_, h)| h.size())
            .sum()
    }
}

impl BlockAllocator for BlockArena {
    fn allocate(&mut self, bytes: usize) -> Result<BlockHandle, ArenaError> {
        let need = cells_for_bytes(bytes);
        let total = self.cells.len();
        let mut at = 0;
        while at < total {
            self.coalesce_at(at);
            let header = self.header(at);
            if let BlockHeader::Free(size) = header {
                let size = size as usize;
                if size >= need {
                    // Arena cell counts are capped below `u32::MAX`.
                    let Some(handle) = BlockHandle::new(at + 1, 0, need) else {
                        break;
                    };
                    if size - need < 2 {
                        // No room left for a header plus one payload cell.
                        self.set_header(at, BlockHeader::Allocated(size as u32));
                    } else {
                        self.set_header(at, BlockHeader::Allocated(need as u32));
                        self.set_header(
                            at + 1 + need,
                            BlockHeader::Free((size - need - 1) as u32),
                        );
                    }
                    self.cells[at + 1..at + 1 + need].fill(0);
                    debug!("allocated {bytes} bytes ({need} cells) at cell {}", at + 1);
                    return Ok(handle);
                }
            }
            at += header.span();
        }
        let available = self.largest_free_words() * CELL_BYTES;
        debug!("allocation of {bytes} bytes failed, largest free block {available} bytes");
        Err(ArenaError::OutOfMemory {
            requested: bytes,
            available,
        })
    }

    fn deallocate(&mut self, handle: BlockHandle) {
        let Some(header_at) = (handle.index as usize).checked_sub(1) else {
            warn!("ignoring deallocation of {handle}: not a block payload");
            return;
        };
        if header_at >= self.cells.len() || !self.is_block_start(header_at) {
            warn!("ignoring deallocation of {handle}: not a block payload");
            return;
        }
        match self.header(header_at) {
            BlockHeader::Allocated(size) => {
                self.set_header(header_at, BlockHeader::Free(size));
                debug!("released {size} cells at cell {}", handle.index);
            }
            BlockHeader::Free(_) => {
                warn!("ignoring deallocation of {handle}: block already free");
            }
        }
    }

    fn block(&self, handle: BlockHandle) -> Option<&[f32]> {
        let range = self.payload_range(handle)?;
        Some(bytemuck::cast_slice(&self.cells[range]))
    }

    fn block_mut(&mut self, handle: BlockHandle) -> Option<&mut [f32]> {
        let range = self.payload_range(handle)?;
        Some(bytemuck::cast_slice_mut(&mut self.cells[range]))
    }

    fn blocks_mut<const N: usize>(
        &mut self,
        handles: [BlockHandle; N],
    ) -> Option<[&mut [f32]; N]> {
        let mut ranges: [Range<usize>; N] = std::array::from_fn(|_| 0..0);
        for (range, &handle) in ranges.iter_mut().zip(handles.iter()) {
            *range = self.payload_range(handle)?;
        }
        let slices = self.cells.get_disjoint_mut(ranges).ok()?;
        Some(slices.map(|s| bytemuck::cast_slice_mut::<i32, f32>(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(bytes: usize) -> BlockArena {
        BlockArena::with_bytes(bytes).unwrap()
    }

    #[test]
    fn fresh_arena_is_one_free_block() {
        let a = arena(400);
        let blocks: Vec<_> = a.blocks().collect();
        assert_eq!(blocks, vec![(0, BlockHeader::Free(99))]);
        assert_eq!(a.free_words(), 99);
    }

    #[test]
    fn allocation_splits_free_block() {
        let mut a = arena(400);
        let h = a.allocate(10).unwrap();
        assert_eq!(h.len(), 3);
        let blocks: Vec<_> = a.blocks().collect();
        assert_eq!(
            blocks,
            vec![(0, BlockHeader::Allocated(3)), (4, BlockHeader::Free(95))]
        );
    }

    #[test]
    fn tight_remainder_is_absorbed() {
        // 9 cells of payload; a 7-cell request leaves 2, room for a header
        // and one payload cell, so it splits. An 8-cell request leaves 1
        // and takes the whole block.
        let mut a = arena(40);
        let h = a.allocate(28).unwrap();
        assert_eq!(a.block_count(), 2);
        a.deallocate(h);

        let h = a.allocate(32).unwrap();
        assert_eq!(a.block_count(), 1);
        assert_eq!(a.blocks().next(), Some((0, BlockHeader::Allocated(9))));
        // The view is still exactly the requested size.
        assert_eq!(a.block(h).unwrap().len(), 8);
    }

    #[test]
    fn blocks_are_zeroed_on_reuse() {
        let mut a = arena(400);
        let h = a.allocate(16).unwrap();
        a.block_mut(h).unwrap().fill(3.5);
        a.deallocate(h);
        let h = a.allocate(16).unwrap();
        assert!(a.block(h).unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn deallocate_defers_merging() {
        let mut a = arena(400);
        let h1 = a.allocate(40).unwrap();
        let h2 = a.allocate(40).unwrap();
        a.deallocate(h1);
        a.deallocate(h2);
        // Two adjacent free blocks plus the tail remain until the next scan.
        assert_eq!(a.block_count(), 3);
        assert_eq!(a.largest_free_words(), 99);

        let h = a.allocate(300).unwrap();
        assert_eq!(h.len(), 75);
        assert_eq!(a.block_count(), 2);
    }

    #[test]
    fn oversized_request_fails() {
        let mut a = arena(400);
        let err = a.allocate(400).unwrap_err();
        assert_eq!(
            err,
            ArenaError::OutOfMemory {
                requested: 400,
                available: 396
            }
        );
        assert!(a.allocate(usize::MAX).is_err());
        // The arena is untouched by the failures.
        assert_eq!(a.block_count(), 1);
    }

    #[test]
    fn exact_fit_uses_whole_arena() {
        let mut a = arena(400);
        let h = a.allocate(396).unwrap();
        assert_eq!(h.len(), 99);
        assert!(a.allocate(1).is_err());
    }

    #[test]
    fn double_free_is_ignored() {
        let mut a = arena(400);
        let h = a.allocate(8).unwrap();
        a.deallocate(h);
        a.deallocate(h);
        assert_eq!(a.blocks().next(), Some((0, BlockHeader::Free(2))));
    }

    #[test]
    fn foreign_handle_is_ignored() {
        let mut a = arena(400);
        let h = a.allocate(40).unwrap();
        let bogus = BlockHandle::new(h.index as usize + 3, 0, 1).unwrap();
        a.deallocate(bogus);
        assert!(a.block(h).is_some());
        assert!(a.block(bogus).is_none());
    }

    #[test]
    fn stale_handle_has_no_view() {
        let mut a = arena(400);
        let h = a.allocate(40).unwrap();
        a.deallocate(h);
        assert!(a.block(h).is_none());
        assert!(a.block_mut(h).is_none());
    }

    #[test]
    fn stale_handle_inside_a_merged_block_has_no_view() {
        let mut a = arena(400);
        let h1 = a.allocate(8).unwrap();
        let h2 = a.allocate(40).unwrap();
        a.deallocate(h1);
        a.deallocate(h2);
        let h3 = a.allocate(80).unwrap();
        a.block_mut(h3).unwrap().fill(1.0);
        assert!(a.block(h2).is_none());
        assert!(a.block_mut(h2).is_none());
        assert!(a.blocks_mut([h2, h3]).is_none());
        // Releasing the stale handle leaves the new block alone.
        a.deallocate(h2);
        assert_eq!(a.block(h3).unwrap(), &[1.0; 20]);
    }

    #[test]
    fn blocks_mut_returns_disjoint_views() {
        let mut a = arena(400);
        let h1 = a.allocate(8).unwrap();
        let h2 = a.allocate(12).unwrap();
        {
            let [x, y] = a.blocks_mut([h1, h2]).unwrap();
            x.fill(1.0);
            y.fill(2.0);
        }
        assert_eq!(a.block(h1).unwrap(), &[1.0, 1.0]);
        assert_eq!(a.block(h2).unwrap(), &[2.0, 2.0, 2.0]);
        assert!(a.blocks_mut([h1, h1]).is_none());
    }

    #[test]
    fn zero_byte_request_gets_one_cell() {
        let mut a = arena(400);
        let h1 = a.allocate(0).unwrap();
        let h2 = a.allocate(0).unwrap();
        assert_eq!(h1.len(), 1);
        assert_ne!(h1, h2);
    }
}
