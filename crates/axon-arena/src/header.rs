//! Block headers.
//!
//! Logically a header is a tagged variant; physically it is packed into
//! one signed cell: negative for free blocks, positive for allocated
//! ones, with the magnitude giving the payload size in cells.

/// Header describing the block that follows it in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockHeader {
    /// A free block with the given payload size in cells.
    Free(u32),
    /// An allocated block with the given payload size in cells.
    Allocated(u32),
}

impl BlockHeader {
    /// Decode a packed header cell.
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            Self::Free(raw.unsigned_abs())
        } else {
            Self::Allocated(raw as u32)
        }
    }

    /// Encode into a packed header cell.
    ///
    /// Sizes are bounded by the arena's cell count, which
    /// [`ArenaConfig::validate`](crate::ArenaConfig::validate) keeps
    /// within `i32` range.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Free(size) => -(size as i32),
            Self::Allocated(size) => size as i32,
        }
    }

    /// Payload size in cells.
    pub fn size(self) -> usize {
        match self {
            Self::Free(size) | Self::Allocated(size) => size as usize,
        }
    }

    /// Cells occupied by this block, header included.
    pub fn span(self) -> usize {
        1 + self.size()
    }

    /// Whether the block is free.
    pub fn is_free(self) -> bool {
        matches!(self, Self::Free(_))
    }
}
