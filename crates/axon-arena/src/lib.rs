//! Fixed-arena block allocation for heap-less Axon deployments.
//!
//! Network parameters, backpropagation scratch and observation buffers
//! are all requested through the [`BlockAllocator`] trait. Two
//! implementations are provided:
//!
//! - [`BlockArena`]: a first-fit allocator over a single fixed array of
//!   4-byte cells, for targets without a general-purpose heap.
//! - [`HeapAllocator`]: the same contract backed by ordinary `Vec`s, for
//!   hosts where the global allocator is available.
//!
//! # Arena layout
//!
//! ```text
//! cells: [hdr][payload ....][hdr][payload ..][hdr][payload ........]
//!          -5                 +3               -8
//!        free (5 cells)     allocated (3)    free (8 cells)
//! ```
//!
//! Free blocks are coalesced lazily, during the next allocation scan,
//! never on deallocation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod config;
pub mod error;
pub mod handle;
pub mod header;
pub mod heap;
pub mod traits;

pub use block::BlockArena;
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use handle::BlockHandle;
pub use header::BlockHeader;
pub use heap::HeapAllocator;
pub use traits::BlockAllocator;

/// Size in bytes of one arena cell (header or payload word).
pub const CELL_BYTES: usize = std::mem::size_of::<i32>();

/// Number of cells needed to hold `bytes` bytes.
///
/// Zero-byte requests still occupy one cell so every live block has a
/// distinct payload address.
pub fn cells_for_bytes(bytes: usize) -> usize {
    bytes.div_ceil(CELL_BYTES).max(1)
}
