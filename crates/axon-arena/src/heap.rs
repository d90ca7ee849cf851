//! General-allocator backend for hosts that have a heap.
//!
//! [`HeapAllocator`] gives every block its own `Vec<f32>` and tracks them
//! in a slot+generation table, so stale handles resolve to `None` instead
//! of aliasing a newer block. An optional byte budget lets tests and
//! constrained hosts exercise the out-of-memory paths.

use log::{debug, warn};

use crate::cells_for_bytes;
use crate::error::ArenaError;
use crate::handle::BlockHandle;
use crate::traits::BlockAllocator;
use crate::CELL_BYTES;

struct Slot {
    generation: u32,
    data: Option<Vec<f32>>,
}

/// Block allocator backed by the global allocator.
#[derive(Default)]
pub struct HeapAllocator {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    limit_bytes: Option<usize>,
    used_bytes: usize,
}

impl HeapAllocator {
    /// Create an allocator with no byte budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that refuses to hold more than `limit_bytes`
    /// of live payload at once.
    pub fn with_limit(limit_bytes: usize) -> Self {
        Self {
            limit_bytes: Some(limit_bytes),
            ..Self::default()
        }
    }

    /// Bytes of live payload currently allocated.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Number of live blocks.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.data.is_some()).count()
    }

    /// Largest block the next allocation may hand out, in bytes.
    fn available_bytes(&self) -> usize {
        let view_limit = (u32::MAX as usize).saturating_mul(CELL_BYTES);
        match self.limit_bytes {
            Some(limit) => limit.saturating_sub(self.used_bytes).min(view_limit),
            None => view_limit,
        }
    }

    fn live_slot(&self, handle: BlockHandle) -> Option<&Vec<f32>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.data.as_ref()
    }
}

impl BlockAllocator for HeapAllocator {
    fn allocate(&mut self, bytes: usize) -> Result<BlockHandle, ArenaError> {
        let len = cells_for_bytes(bytes);
        let available = self.available_bytes();
        let out_of_memory = ArenaError::OutOfMemory {
            requested: bytes,
            available,
        };
        let Some(block_bytes) = len.checked_mul(CELL_BYTES).filter(|&b| b <= available) else {
            debug!("heap allocation of {bytes} bytes exceeds budget ({available} left)");
            return Err(out_of_memory);
        };

        let (slot_idx, generation) = match self.free_list.last() {
            Some(&idx) => (idx as usize, self.slots[idx as usize].generation),
            None => (self.slots.len(), 0),
        };
        let handle = BlockHandle::new(slot_idx, generation, len)
            .ok_or_else(|| out_of_memory.clone())?;

        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            warn!("global allocator refused {block_bytes} bytes");
            return Err(out_of_memory);
        }
        data.resize(len, 0.0);

        if self.free_list.pop().is_some() {
            self.slots[slot_idx].data = Some(data);
        } else {
            self.slots.push(Slot {
                generation,
                data: Some(data),
            });
        }
        self.used_bytes += block_bytes;
        Ok(handle)
    }

    fn deallocate(&mut self, handle: BlockHandle) {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            warn!("ignoring deallocation of {handle}: unknown slot");
            return;
        };
        if slot.generation != handle.generation {
            warn!("ignoring deallocation of {handle}: stale generation");
            return;
        }
        let Some(data) = slot.data.take() else {
            return;
        };
        self.used_bytes -= data.len() * CELL_BYTES;
        slot.generation = slot.generation.wrapping_add(1);
        // A wrapped generation could resurrect ancient handles; retire it.
        if slot.generation != 0 {
            self.free_list.push(handle.index);
        }
    }

    fn block(&self, handle: BlockHandle) -> Option<&[f32]> {
        self.live_slot(handle).map(Vec::as_slice)
    }

    fn block_mut(&mut self, handle: BlockHandle) -> Option<&mut [f32]> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.data.as_deref_mut()
    }

    fn blocks_mut<const N: usize>(
        &mut self,
        handles: [BlockHandle; N],
    ) -> Option<[&mut [f32]; N]> {
        let indices = handles.map(|h| h.index as usize);
        let slots = self.slots.get_disjoint_mut(indices).ok()?;
        let all_live = slots
            .iter()
            .zip(handles.iter())
            .all(|(slot, h)| slot.generation == h.generation && slot.data.is_some());
        if !all_live {
            return None;
        }
        Some(slots.map(|slot| slot.data.as_deref_mut().unwrap_or_default()))
    }
}
