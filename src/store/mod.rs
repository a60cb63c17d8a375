//! Pool-backed resource stores
//!
//! Meshes and textures are addressed by small opaque handles. A handle is a
//! slot index; the slot records `Span`s into shared fixed-capacity pools.
//! Pools never compact, so freeing one resource never moves another.

pub mod mesh;
pub mod pool;
pub mod texture;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::AssetError;
use crate::rasterizer::{Vec2, Vec3};

pub use mesh::{AnimatedMesh, MeshSlot, MeshStore, MeshStoreStats, StaticMesh};
pub use pool::{PoolAllocator, PoolError, Span};
pub use texture::{TextureSlot, TextureStore};

/// Static mesh vertex
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub texcoord: Vec2,
}

impl Vertex {
    pub const fn new(position: Vec3, normal: Vec3, texcoord: Vec2) -> Self {
        Self { position, normal, texcoord }
    }
}

/// Opaque mesh id. `INVALID` (all ones) means "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub u32);

impl MeshHandle {
    pub const INVALID: MeshHandle = MeshHandle(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for MeshHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Opaque texture id. `INVALID` (all ones) means "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const INVALID: TextureHandle = TextureHandle(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for TextureHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("all {0} slots are in use")]
    SlotsFull(&'static str),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("mesh has no vertices")]
    EmptyMesh,

    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),

    #[error("index {index} out of range for {count} vertices")]
    IndexOutOfRange { index: u32, count: u32 },

    #[error("too many vertices for 16-bit indices: {0}")]
    TooManyVertices(usize),

    #[error("model has {count} frames, limit is {limit}")]
    TooManyFrames { count: usize, limit: u32 },

    #[error("frame {frame} has {actual} vertices, expected {expected}")]
    FrameSizeMismatch { frame: usize, expected: u32, actual: usize },

    #[error("invalid texture size {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("expected {expected} pixels, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },
}

/// First free slot in a fixed table.
pub(crate) fn find_free_slot<T>(slots: &[Option<T>], what: &'static str) -> Result<usize, StoreError> {
    slots
        .iter()
        .position(Option::is_none)
        .ok_or(StoreError::SlotsFull(what))
}
