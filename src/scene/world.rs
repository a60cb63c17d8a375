//! Scene world
//!
//! Fixed-capacity entity table with one transform per slot and typed
//! component storages. Entities are visited through a topological order
//! (parents before children) that is rebuilt whenever the hierarchy changes,
//! so resolving world matrices is one pass with no retries.

use crate::config::PoolLimits;
use crate::rasterizer::{mat4_mul, Vec3};
use super::component::ComponentStorage;
use super::components::{Animator, Camera, ComponentMask, Light, MeshRenderer};
use super::entity::{EntityAllocator, EntityId};
use super::transform::Transform;
use super::SceneError;

/// Longest root-to-leaf chain, counting the root.
pub const MAX_HIERARCHY_DEPTH: usize = 8;

/// Longest stored entity name in bytes.
pub const MAX_NAME_LEN: usize = 23;

#[derive(Debug, Clone, Default)]
struct EntityRecord {
    mask: ComponentMask,
    active: bool,
    layer: u8,
    tag: u16,
    name: String,
}

pub struct World {
    entities: EntityAllocator,
    records: Vec<EntityRecord>,
    transforms: Vec<Transform>,

    pub mesh_renderers: ComponentStorage<MeshRenderer>,
    pub cameras: ComponentStorage<Camera>,
    pub lights: ComponentStorage<Light>,
    pub animators: ComponentStorage<Animator>,

    /// Live slot indices, parents before children
    order: Vec<u32>,
    /// Scratch for `resolve_transforms`: slot recomputed this pass
    updated: Vec<bool>,
    /// Scratch for `rebuild_order`
    depths: Vec<u8>,
}

impl World {
    pub fn new(capacity: u32) -> Self {
        let cap = capacity as usize;
        Self {
            entities: EntityAllocator::new(capacity),
            records: vec![EntityRecord::default(); cap],
            transforms: vec![Transform::default(); cap],
            mesh_renderers: ComponentStorage::new(cap),
            cameras: ComponentStorage::new(cap),
            lights: ComponentStorage::new(cap),
            animators: ComponentStorage::new(cap),
            order: Vec::with_capacity(cap),
            updated: vec![false; cap],
            depths: vec![0; cap],
        }
    }

    pub fn from_limits(limits: &PoolLimits) -> Self {
        Self::new(limits.max_entities)
    }

    // =========================================================================
    // Entity Management
    // =========================================================================

    /// Create an active root entity with an identity transform.
    pub fn spawn(&mut self, name: &str) -> Result<EntityId, SceneError> {
        let Some(id) = self.entities.allocate() else {
            log::warn!("entity table full, cannot spawn '{}'", name);
            return Err(SceneError::Full(self.entities.capacity()));
        };
        let idx = id.index() as usize;
        self.records[idx] = EntityRecord {
            mask: ComponentMask::TRANSFORM,
            active: true,
            layer: 0,
            tag: 0,
            name: truncate_name(name).to_string(),
        };
        self.transforms[idx] = Transform::default();
        self.order.push(id.index());
        log::debug!("spawned entity {} '{}'", idx, self.records[idx].name);
        Ok(id)
    }

    /// Remove an entity. Its children become roots and are re-resolved.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.entities.free(id) {
            return false;
        }
        let idx = id.index();
        for t in self.transforms.iter_mut() {
            if t.parent == id {
                t.parent = EntityId::NULL;
                t.dirty = true;
            }
        }
        self.records[idx as usize] = EntityRecord::default();
        self.transforms[idx as usize] = Transform::default();
        self.mesh_renderers.remove(idx);
        self.cameras.remove(idx);
        self.lights.remove(idx);
        self.animators.remove(idx);
        self.order.retain(|&i| i != idx);
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    pub fn entity_count(&self) -> u32 {
        self.entities.alive_count()
    }

    pub fn capacity(&self) -> u32 {
        self.entities.capacity()
    }

    fn check(&self, id: EntityId) -> Result<usize, SceneError> {
        if self.entities.is_alive(id) {
            Ok(id.index() as usize)
        } else {
            Err(SceneError::Stale(id))
        }
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) -> Result<(), SceneError> {
        let idx = self.check(id)?;
        self.records[idx].active = active;
        Ok(())
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.is_alive(id) && self.records[id.index() as usize].active
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.is_alive(id).then(|| self.records[id.index() as usize].name.as_str())
    }

    pub fn set_layer(&mut self, id: EntityId, layer: u8) -> Result<(), SceneError> {
        let idx = self.check(id)?;
        self.records[idx].layer = layer;
        Ok(())
    }

    pub fn layer(&self, id: EntityId) -> Option<u8> {
        self.is_alive(id).then(|| self.records[id.index() as usize].layer)
    }

    pub fn set_tag(&mut self, id: EntityId, tag: u16) -> Result<(), SceneError> {
        let idx = self.check(id)?;
        self.records[idx].tag = tag;
        Ok(())
    }

    pub fn tag(&self, id: EntityId) -> Option<u16> {
        self.is_alive(id).then(|| self.records[id.index() as usize].tag)
    }

    /// First live entity with this exact (truncated) name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        let name = truncate_name(name);
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.name == name)
            .find_map(|(i, _)| self.entities.id_at(i as u32))
    }

    /// Active entities carrying every bit of `mask`, in slot order.
    pub fn iter_with(&self, mask: ComponentMask) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.capacity()).filter_map(move |i| {
            let record = &self.records[i as usize];
            if record.active && record.mask.contains(mask) {
                self.entities.id_at(i)
            } else {
                None
            }
        })
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Set mask bits, inserting default data for components that carry any.
    pub fn add_component(&mut self, id: EntityId, mask: ComponentMask) -> Result<(), SceneError> {
        let idx = self.check(id)?;
        let slot = id.index();
        if mask.contains(ComponentMask::MESH_RENDERER) && !self.mesh_renderers.contains(slot) {
            self.mesh_renderers.insert(slot, MeshRenderer::default());
        }
        if mask.contains(ComponentMask::CAMERA) && !self.cameras.contains(slot) {
            self.cameras.insert(slot, Camera::default());
        }
        if mask.contains(ComponentMask::LIGHT) && !self.lights.contains(slot) {
            self.lights.insert(slot, Light::default());
        }
        if mask.contains(ComponentMask::ANIMATOR) && !self.animators.contains(slot) {
            self.animators.insert(slot, Animator::default());
        }
        self.records[idx].mask |= mask;
        Ok(())
    }

    pub fn remove_component(&mut self, id: EntityId, mask: ComponentMask) -> Result<(), SceneError> {
        let idx = self.check(id)?;
        let slot = id.index();
        if mask.contains(ComponentMask::MESH_RENDERER) {
            self.mesh_renderers.remove(slot);
        }
        if mask.contains(ComponentMask::CAMERA) {
            self.cameras.remove(slot);
        }
        if mask.contains(ComponentMask::LIGHT) {
            self.lights.remove(slot);
        }
        if mask.contains(ComponentMask::ANIMATOR) {
            self.animators.remove(slot);
        }
        self.records[idx].mask.remove(mask);
        Ok(())
    }

    /// True if the entity is alive and has every bit of `mask`.
    pub fn has_component(&self, id: EntityId, mask: ComponentMask) -> bool {
        self.is_alive(id) && self.records[id.index() as usize].mask.contains(mask)
    }

    pub fn components(&self, id: EntityId) -> ComponentMask {
        if self.is_alive(id) {
            self.records[id.index() as usize].mask
        } else {
            ComponentMask::NONE
        }
    }

    pub fn transform(&self, id: EntityId) -> Option<&Transform> {
        self.is_alive(id).then(|| &self.transforms[id.index() as usize])
    }

    pub fn mesh_renderer(&self, id: EntityId) -> Option<&MeshRenderer> {
        self.live(id).and_then(|i| self.mesh_renderers.get(i))
    }

    pub fn mesh_renderer_mut(&mut self, id: EntityId) -> Option<&mut MeshRenderer> {
        self.live(id).and_then(|i| self.mesh_renderers.get_mut(i))
    }

    pub fn camera(&self, id: EntityId) -> Option<&Camera> {
        self.live(id).and_then(|i| self.cameras.get(i))
    }

    pub fn camera_mut(&mut self, id: EntityId) -> Option<&mut Camera> {
        self.live(id).and_then(|i| self.cameras.get_mut(i))
    }

    pub fn light(&self, id: EntityId) -> Option<&Light> {
        self.live(id).and_then(|i| self.lights.get(i))
    }

    pub fn light_mut(&mut self, id: EntityId) -> Option<&mut Light> {
        self.live(id).and_then(|i| self.lights.get_mut(i))
    }

    pub fn animator(&self, id: EntityId) -> Option<&Animator> {
        self.live(id).and_then(|i| self.animators.get(i))
    }

    pub fn animator_mut(&mut self, id: EntityId) -> Option<&mut Animator> {
        self.live(id).and_then(|i| self.animators.get_mut(i))
    }

    fn live(&self, id: EntityId) -> Option<u32> {
        self.is_alive(id).then(|| id.index())
    }

    // =========================================================================
    // Transform
    // =========================================================================

    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> Result<(), SceneError> {
        let idx = self.check(id)?;
        let t = &mut self.transforms[idx];
        t.position = position;
        t.dirty = true;
        Ok(())
    }

    /// Euler angles in radians.
    pub fn set_rotation(&mut self, id: EntityId, rotation: Vec3) -> Result<(), SceneError> {
        let idx = self.check(id)?;
        let t = &mut self.transforms[idx];
        t.rotation = rotation;
        t.dirty = true;
        Ok(())
    }

    pub fn set_scale(&mut self, id: EntityId, scale: Vec3) -> Result<(), SceneError> {
        let idx = self.check(id)?;
        let t = &mut self.transforms[idx];
        t.scale = scale;
        t.dirty = true;
        Ok(())
    }

    /// Local position.
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.transform(id).map(|t| t.position)
    }

    pub fn forward(&self, id: EntityId) -> Vec3 {
        self.transform(id).map_or(Vec3::new(0.0, 0.0, -1.0), Transform::forward)
    }

    pub fn right(&self, id: EntityId) -> Vec3 {
        self.transform(id).map_or(Vec3::new(1.0, 0.0, 0.0), Transform::right)
    }

    pub fn up(&self, id: EntityId) -> Vec3 {
        self.transform(id).map_or(Vec3::UP, Transform::up)
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Attach `child` under `parent`; `EntityId::NULL` detaches.
    ///
    /// Rejected edges leave the hierarchy untouched.
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> Result<(), SceneError> {
        let idx = self.check(child)?;
        if parent.is_null() {
            return self.clear_parent(child);
        }
        if !self.is_alive(parent) {
            return Err(SceneError::UnknownParent(parent));
        }
        if parent == child {
            return Err(SceneError::SelfParent);
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(SceneError::Cycle);
        }
        let depth = self.chain_len(parent) + self.subtree_height(child);
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(SceneError::TooDeep {
                depth,
                max: MAX_HIERARCHY_DEPTH,
            });
        }

        let t = &mut self.transforms[idx];
        t.parent = parent;
        t.dirty = true;
        self.rebuild_order();
        Ok(())
    }

    pub fn clear_parent(&mut self, child: EntityId) -> Result<(), SceneError> {
        let idx = self.check(child)?;
        let t = &mut self.transforms[idx];
        if !t.parent.is_null() {
            t.parent = EntityId::NULL;
            t.dirty = true;
            self.rebuild_order();
        }
        Ok(())
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.transform(id)
            .map(|t| t.parent)
            .filter(|p| !p.is_null())
    }

    /// Entities above `id`, nearest first (not including `id`).
    fn ancestors(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let parent_of = move |e: EntityId| {
            let p = self.transforms[e.index() as usize].parent;
            (!p.is_null()).then_some(p)
        };
        std::iter::successors(parent_of(id), move |&p| parent_of(p)).take(self.transforms.len())
    }

    /// Levels from `id` up to its root, counting both.
    fn chain_len(&self, id: EntityId) -> usize {
        1 + self.ancestors(id).count()
    }

    /// Levels from `id` down to its deepest descendant, counting both.
    fn subtree_height(&self, id: EntityId) -> usize {
        let mut height = 1;
        for &i in &self.order {
            let Some(e) = self.entities.id_at(i) else {
                continue;
            };
            if let Some(pos) = self.ancestors(e).position(|a| a == id) {
                height = height.max(pos + 2);
            }
        }
        height
    }

    /// Sort live slots by depth so every parent precedes its children.
    fn rebuild_order(&mut self) {
        self.order.clear();
        for i in 0..self.capacity() {
            if let Some(id) = self.entities.id_at(i) {
                self.depths[i as usize] = self.ancestors(id).count() as u8;
                self.order.push(i);
            }
        }
        let depths = &self.depths;
        self.order.sort_unstable_by_key(|&i| (depths[i as usize], i));
    }

    /// Bring every world matrix up to date.
    ///
    /// Dirty transforms rebuild their local matrix; then, in parent-first
    /// order, an entity is recomputed if it was dirty or its parent was
    /// recomputed in this pass.
    pub fn resolve_transforms(&mut self) {
        for &i in &self.order {
            let t = &mut self.transforms[i as usize];
            if t.dirty {
                t.local = t.compute_local();
            }
        }

        for k in 0..self.order.len() {
            let i = self.order[k] as usize;
            let parent = self.transforms[i].parent;
            let parent_idx = (!parent.is_null()).then(|| parent.index() as usize);
            let parent_updated = parent_idx.is_some_and(|p| self.updated[p]);

            let recompute = self.transforms[i].dirty || parent_updated;
            self.updated[i] = recompute;
            if !recompute {
                continue;
            }
            let world = match parent_idx {
                Some(p) => mat4_mul(&self.transforms[p].world, &self.transforms[i].local),
                None => self.transforms[i].local,
            };
            let t = &mut self.transforms[i];
            t.world = world;
            t.dirty = false;
        }
    }

    /// Fixed-point resolution in slot order, at most `MAX_HIERARCHY_DEPTH`
    /// passes. Only dirty entities are touched, and a child waits until its
    /// parent is clean.
    ///
    /// Agrees with `resolve_transforms` only when every transform is dirty
    /// (e.g. the first resolve). A clean child of a moved parent keeps its
    /// stale world matrix here.
    pub fn resolve_transforms_bounded(&mut self) {
        let cap = self.capacity();
        for i in 0..cap {
            if self.entities.id_at(i).is_some() {
                let t = &mut self.transforms[i as usize];
                if t.dirty {
                    t.local = t.compute_local();
                }
            }
        }

        for _ in 0..MAX_HIERARCHY_DEPTH {
            let mut any_dirty = false;
            for i in 0..cap {
                let idx = i as usize;
                if self.entities.id_at(i).is_none() || !self.transforms[idx].dirty {
                    continue;
                }
                let parent = self.transforms[idx].parent;
                if parent.is_null() {
                    let t = &mut self.transforms[idx];
                    t.world = t.local;
                    t.dirty = false;
                } else {
                    let p = parent.index() as usize;
                    if self.transforms[p].dirty {
                        any_dirty = true;
                    } else {
                        let world = mat4_mul(&self.transforms[p].world, &self.transforms[idx].local);
                        let t = &mut self.transforms[idx];
                        t.world = world;
                        t.dirty = false;
                    }
                }
            }
            if !any_dirty {
                break;
            }
        }
    }

    // =========================================================================
    // Animation
    // =========================================================================

    /// Step every playing animator on active entities.
    pub fn update_animators(&mut self, dt: f32) {
        let records = &self.records;
        for (i, anim) in self.animators.iter_mut() {
            let record = &records[i as usize];
            if record.active && record.mask.contains(ComponentMask::ANIMATOR) {
                anim.advance(dt);
            }
        }
    }

    /// Copy animator playback state into the mesh renderer.
    pub fn sync_animation(&mut self, id: EntityId) -> bool {
        let Some(anim) = self.animator(id).copied() else {
            return false;
        };
        let Some(renderer) = self.mesh_renderer_mut(id) else {
            return false;
        };
        renderer.frame_a = anim.current_frame.min(u16::MAX as u32) as u16;
        renderer.frame_b = anim.next_frame.min(u16::MAX as u32) as u16;
        renderer.lerp = anim.interpolation;
        true
    }

    /// Despawn everything; all outstanding ids become stale.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.records.iter_mut().for_each(|r| *r = EntityRecord::default());
        self.transforms.iter_mut().for_each(|t| *t = Transform::default());
        self.mesh_renderers.clear();
        self.cameras.clear();
        self.lights.clear();
        self.animators.clear();
        self.order.clear();
    }
}

/// Cut to at most `MAX_NAME_LEN` bytes without splitting a character.
fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
