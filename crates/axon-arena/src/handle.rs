//! Block handles.

use std::fmt;

/// Opaque reference to an allocated block.
///
/// For a [`BlockArena`](crate::BlockArena) the index is the payload's
/// cell offset; for a [`HeapAllocator`](crate::HeapAllocator) it is a
/// slot in the block table and `generation` detects stale handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct BlockHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    pub(crate) len: u32,
}

impl BlockHandle {
    /// `None` when the index or length does not fit the handle's fields.
    pub(crate) fn new(index: usize, generation: u32, len: usize) -> Option<Self> {
        Some(Self {
            index: u32::try_from(index).ok()?,
            generation,
            len: u32::try_from(len).ok()?,
        })
    }

    /// Length of the block's view in `f32` elements.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the view is empty. Allocators never hand these out, but
    /// the method completes the `len` pair.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the block's view in bytes.
    pub fn bytes(&self) -> usize {
        self.len() * crate::CELL_BYTES
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockHandle(idx={}, gen={}, len={})",
            self.index, self.generation, self.len
        )
    }
}
