//! Per-entity component storage
//!
//! One `Option<T>` per entity slot, sized once to the entity capacity. The
//! slot index of an `EntityId` is the array index; liveness is checked by
//! the world, not here.

pub struct ComponentStorage<T> {
    data: Vec<Option<T>>,
}

impl<T> ComponentStorage<T> {
    pub fn new(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity);
        data.resize_with(capacity, || None);
        Self { data }
    }

    /// Replaces any existing component. Out-of-range slots are ignored.
    pub fn insert(&mut self, index: u32, component: T) {
        if let Some(slot) = self.data.get_mut(index as usize) {
            *slot = Some(component);
        }
    }

    pub fn remove(&mut self, index: u32) -> Option<T> {
        self.data.get_mut(index as usize).and_then(Option::take)
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.data.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.data.get_mut(index as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    /// (slot index, component) pairs; liveness is the caller's concern.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.data
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, opt)| opt.as_mut().map(|c| (idx as u32, c)))
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|opt| opt.is_some()).count()
    }
}
