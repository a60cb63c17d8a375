//! Transform component
//!
//! Local position / Euler rotation / per-axis scale plus the cached local
//! and world matrices. The world matrix is only meaningful while `dirty` is
//! false; the world's resolve pass brings it up to date.

use serde::{Deserialize, Serialize};

use crate::rasterizer::{mat4_get_translation, mat4_identity, mat4_trs, Mat4, Vec3};
use super::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians, applied Z, then X, then Y
    pub rotation: Vec3,
    pub scale: Vec3,
    #[serde(skip, default = "mat4_identity")]
    pub(crate) local: Mat4,
    #[serde(skip, default = "mat4_identity")]
    pub(crate) world: Mat4,
    pub(crate) parent: EntityId,
    #[serde(skip, default = "dirty_default")]
    pub(crate) dirty: bool,
}

fn dirty_default() -> bool {
    true
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// `T * (Ry * Rx) * Rz * S`
    pub fn compute_local(&self) -> Mat4 {
        mat4_trs(self.position, self.rotation, self.scale)
    }

    pub fn local_matrix(&self) -> &Mat4 {
        &self.local
    }

    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    pub fn world_position(&self) -> Vec3 {
        mat4_get_translation(&self.world)
    }

    pub fn parent(&self) -> EntityId {
        self.parent
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Local -Z axis in world space.
    pub fn forward(&self) -> Vec3 {
        let m = &self.world;
        Vec3::new(-m[0][2], -m[1][2], -m[2][2]).normalize()
    }

    pub fn right(&self) -> Vec3 {
        let m = &self.world;
        Vec3::new(m[0][0], m[1][0], m[2][0]).normalize()
    }

    pub fn up(&self) -> Vec3 {
        let m = &self.world;
        Vec3::new(m[0][1], m[1][1], m[2][1]).normalize()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            local: mat4_identity(),
            world: mat4_identity(),
            parent: EntityId::NULL,
            dirty: true,
        }
    }
}
