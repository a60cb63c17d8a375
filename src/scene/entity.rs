//! Entity ids with generational indices
//!
//! An id is a slot index plus the generation of that slot. Despawning bumps
//! the generation, so an id held across a despawn no longer matches the
//! slot even after the slot is reused.
//!
//! The slot table is fixed at construction; spawning never grows it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// "No entity". Never alive.
    pub const NULL: EntityId = EntityId { index: u32::MAX, generation: 0 };

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index, also the index into every per-entity array.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::NULL
    }
}

/// Hands out slots from a fixed table.
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    /// LIFO free list; the lowest index sits on top initially
    free_indices: Vec<u32>,
    alive_count: u32,
}

impl EntityAllocator {
    pub fn new(capacity: u32) -> Self {
        Self {
            generations: vec![0; capacity as usize],
            alive: vec![false; capacity as usize],
            free_indices: (0..capacity).rev().collect(),
            alive_count: 0,
        }
    }

    /// `None` once every slot is taken.
    pub fn allocate(&mut self) -> Option<EntityId> {
        let index = self.free_indices.pop()?;
        self.alive[index as usize] = true;
        self.alive_count += 1;
        Some(EntityId::new(index, self.generations[index as usize]))
    }

    /// Returns true if the entity was alive and is now freed.
    pub fn free(&mut self, entity: EntityId) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let idx = entity.index as usize;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.alive[idx] = false;
        self.free_indices.push(entity.index);
        self.alive_count -= 1;
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        let idx = entity.index as usize;
        !entity.is_null()
            && idx < self.generations.len()
            && self.alive[idx]
            && self.generations[idx] == entity.generation
    }

    /// Id currently occupying a slot, if any.
    pub fn id_at(&self, index: u32) -> Option<EntityId> {
        let idx = index as usize;
        match self.alive.get(idx) {
            Some(true) => Some(EntityId::new(index, self.generations[idx])),
            _ => None,
        }
    }

    pub fn alive_count(&self) -> u32 {
        self.alive_count
    }

    pub fn capacity(&self) -> u32 {
        self.generations.len() as u32
    }

    /// Free every slot; all outstanding ids become stale.
    pub fn clear(&mut self) {
        for (gen, alive) in self.generations.iter_mut().zip(&mut self.alive) {
            if *alive {
                *gen = gen.wrapping_add(1);
            }
            *alive = false;
        }
        let capacity = self.capacity();
        self.free_indices.clear();
        self.free_indices.extend((0..capacity).rev());
        self.alive_count = 0;
    }
}
