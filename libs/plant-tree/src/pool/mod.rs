//! # Stem Pool
//!
//! Arena owning every stem of a plant. Slots are grouped into fixed-size
//! blocks; each block keeps its own free list, and allocation draws from
//! the first block that still has room. Freed slots are pushed on top of
//! their block's free list, so the next allocation reuses the most recently
//! freed slot.
//!
//! Handles are generational: freeing a slot bumps its generation, turning
//! every outstanding [`StemId`] for it stale.

use crate::error::PlantError;
use crate::stem::Stem;
use config::constants::POOL_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to a stem inside a [`StemPool`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StemId {
    slot: u32,
    generation: u32,
}

impl StemId {
    /// Arena slot of the stem. Two live handles share a slot only if they
    /// are equal.
    #[inline]
    pub fn slot(self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for StemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StemId({}v{})", self.slot, self.generation)
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    stem: Option<Stem>,
}

#[derive(Debug, Clone)]
struct Block {
    id: usize,
    free: Vec<usize>,
}

/// Block allocator for stems.
///
/// # Example
///
/// ```rust
/// use plant_tree::{Stem, StemPool};
///
/// let mut pool = StemPool::new();
/// let a = pool.allocate(Stem::new());
/// pool.deallocate(a).unwrap();
/// let b = pool.allocate(Stem::new());
/// assert_eq!(a.slot(), b.slot());
/// assert!(pool.get(a).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct StemPool {
    slots: Vec<Slot>,
    blocks: Vec<Block>,
    block_size: usize,
    len: usize,
}

impl Default for StemPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StemPool {
    /// Creates an empty pool with [`POOL_SIZE`] slots per block.
    pub fn new() -> Self {
        Self::with_block_size(POOL_SIZE)
    }

    /// Creates an empty pool with `block_size` slots per block.
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            slots: Vec::new(),
            blocks: Vec::new(),
            block_size: block_size.max(1),
            len: 0,
        }
    }

    /// Stores `stem` in the first free slot, growing by one block if every
    /// block is full.
    pub fn allocate(&mut self, stem: Stem) -> StemId {
        let slot = match self.blocks.iter_mut().find_map(|block| block.free.pop()) {
            Some(slot) => slot,
            None => {
                self.add_block();
                self.blocks
                    .last_mut()
                    .and_then(|block| block.free.pop())
                    .unwrap_or(self.slots.len() - self.block_size)
            }
        };
        let entry = &mut self.slots[slot];
        entry.stem = Some(stem);
        self.len += 1;
        StemId {
            slot: slot as u32,
            generation: entry.generation,
        }
    }

    fn add_block(&mut self) {
        let start = self.slots.len();
        self.slots
            .resize_with(start + self.block_size, Slot::default);
        self.blocks.push(Block {
            id: self.blocks.len() + 1,
            free: (start..start + self.block_size).rev().collect(),
        });
    }

    /// Frees the slot behind `id`.
    ///
    /// Returns how many free slots the owning block has afterwards.
    pub fn deallocate(&mut self, id: StemId) -> Result<usize, PlantError> {
        self.take(id).map(|(_, remaining)| remaining)
    }

    /// Frees the slot behind `id` and hands back the stem it held.
    pub fn take(&mut self, id: StemId) -> Result<(Stem, usize), PlantError> {
        if !self.contains(id) {
            return Err(PlantError::StaleStem(id));
        }
        let entry = &mut self.slots[id.slot()];
        let stem = entry.stem.take().ok_or(PlantError::StaleStem(id))?;
        entry.generation = entry.generation.wrapping_add(1);
        self.len -= 1;
        let block = &mut self.blocks[id.slot() / self.block_size];
        block.free.push(id.slot());
        Ok((stem, block.free.len()))
    }

    /// True if `id` refers to a live stem.
    pub fn contains(&self, id: StemId) -> bool {
        self.slots
            .get(id.slot())
            .is_some_and(|slot| slot.generation == id.generation && slot.stem.is_some())
    }

    pub fn get(&self, id: StemId) -> Option<&Stem> {
        self.slots
            .get(id.slot())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.stem.as_ref())
    }

    pub fn get_mut(&mut self, id: StemId) -> Option<&mut Stem> {
        self.slots
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.stem.as_mut())
    }

    /// Live stems in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (StemId, &Stem)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.stem.as_ref().map(|stem| {
                (
                    StemId {
                        slot: i as u32,
                        generation: slot.generation,
                    },
                    stem,
                )
            })
        })
    }

    /// Live stems in slot order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Stem> {
        self.slots.iter_mut().filter_map(|slot| slot.stem.as_mut())
    }

    /// One-based identifier of the block holding `id`.
    pub fn pool_id(&self, id: StemId) -> Option<usize> {
        self.contains(id)
            .then(|| self.blocks[id.slot() / self.block_size].id)
    }

    /// Free slots left in block `pool_id`.
    pub fn remaining(&self, pool_id: usize) -> Option<usize> {
        pool_id
            .checked_sub(1)
            .and_then(|index| self.blocks.get(index))
            .map(|block| block.free.len())
    }

    /// Number of blocks allocated so far.
    #[inline]
    pub fn pool_count(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of live stems.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every stem, keeping the blocks. Outstanding handles go stale.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.stem.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        let size = self.block_size;
        for (index, block) in self.blocks.iter_mut().enumerate() {
            let start = index * size;
            block.free = (start..start + size).rev().collect();
        }
        self.len = 0;
    }
}
