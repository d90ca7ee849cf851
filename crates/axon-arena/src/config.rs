//! Arena configuration parameters.

use crate::error::ArenaError;
use crate::CELL_BYTES;

/// Configuration for a [`BlockArena`](crate::BlockArena).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Total arena size in bytes, headers included.
    ///
    /// Default: 20_000, the arena size used on the reference firmware.
    /// Rounded down to whole cells; at least two cells are required (one
    /// header and one payload cell).
    pub total_bytes: usize,
}

impl ArenaConfig {
    /// Default arena size in bytes.
    pub const DEFAULT_TOTAL_BYTES: usize = 20_000;

    /// Smallest usable arena: one header plus one payload cell.
    pub const MIN_CELLS: usize = 2;

    /// Create a config for an arena of `total_bytes` bytes.
    pub fn new(total_bytes: usize) -> Self {
        Self { total_bytes }
    }

    /// Number of 4-byte cells in the arena.
    pub fn cell_count(&self) -> usize {
        self.total_bytes / CELL_BYTES
    }

    /// Check the configuration.
    ///
    /// Headers are stored in an `i32`, so the cell count must also fit in
    /// one.
    pub fn validate(&self) -> Result<(), ArenaError> {
        let cells = self.cell_count();
        if cells < Self::MIN_CELLS {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "arena of {} bytes holds {cells} cells, need at least {}",
                    self.total_bytes,
                    Self::MIN_CELLS
                ),
            });
        }
        if cells > i32::MAX as usize {
            return Err(ArenaError::InvalidConfig {
                reason: format!("arena of {cells} cells exceeds the header range"),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOTAL_BYTES)
    }
}
