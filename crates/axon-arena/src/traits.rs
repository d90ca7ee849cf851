//! The allocator contract shared by the arena and heap backends.

use crate::error::ArenaError;
use crate::handle::BlockHandle;

/// Allocate/deallocate contract used for every buffer in the engine.
///
/// Blocks are handed out zero-filled and viewed as `f32` slices whose
/// length is the requested byte count rounded up to whole 4-byte cells.
/// Callers never depend on backend-specific behaviour: a network built on
/// a [`BlockArena`](crate::BlockArena) behaves identically on a
/// [`HeapAllocator`](crate::HeapAllocator).
pub trait BlockAllocator {
    /// Allocate a block of at least `bytes` bytes.
    ///
    /// Fails with [`ArenaError::OutOfMemory`] when no block is large
    /// enough; a failed call never leaves a partial allocation behind.
    fn allocate(&mut self, bytes: usize) -> Result<BlockHandle, ArenaError>;

    /// Release a block. Releasing a handle that does not name a live
    /// block is a no-op.
    fn deallocate(&mut self, handle: BlockHandle);

    /// Shared view of a live block.
    fn block(&self, handle: BlockHandle) -> Option<&[f32]>;

    /// Mutable view of a live block.
    fn block_mut(&mut self, handle: BlockHandle) -> Option<&mut [f32]>;

    /// Mutable views of several distinct live blocks at once.
    ///
    /// Returns `None` if any handle is stale or two handles name the same
    /// block.
    fn blocks_mut<const N: usize>(
        &mut self,
        handles: [BlockHandle; N],
    ) -> Option<[&mut [f32]; N]>;

    /// Allocate room for `count` `f32` values.
    fn allocate_floats(&mut self, count: usize) -> Result<BlockHandle, ArenaError> {
        let bytes = count
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or(ArenaError::OutOfMemory {
                requested: usize::MAX,
                available: 0,
            })?;
        self.allocate(bytes)
    }

    /// Release an optional handle; `None` is the null handle.
    fn release(&mut self, handle: Option<BlockHandle>) {
        if let Some(handle) = handle {
            self.deallocate(handle);
        }
    }
}
