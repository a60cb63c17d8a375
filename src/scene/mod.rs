//! Scene graph
//!
//! Entities with generational ids, a component mask per entity, and a
//! parent/child transform hierarchy.
//!
//! Key pieces:
//! - `EntityId`: slot index + generation, stale ids are detected
//! - `Transform`: local TRS, cached local/world matrices, dirty flag
//! - `World`: fixed-capacity container; resolves world matrices in
//!   parent-first order and steps animators

pub mod component;
pub mod components;
pub mod entity;
pub mod transform;
pub mod world;

use thiserror::Error;

pub use components::{Animator, Camera, ComponentMask, Light, LightKind, MeshRenderer, ANIMATION_FPS};
pub use entity::EntityId;
pub use transform::Transform;
pub use world::{World, MAX_HIERARCHY_DEPTH, MAX_NAME_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("entity table full ({0} slots)")]
    Full(u32),

    #[error("entity {0:?} is not alive")]
    Stale(EntityId),

    #[error("parent {0:?} is not alive")]
    UnknownParent(EntityId),

    #[error("an entity cannot be its own parent")]
    SelfParent,

    #[error("parenting would create a cycle")]
    Cycle,

    #[error("hierarchy depth {depth} exceeds {max}")]
    TooDeep { depth: usize, max: usize },
}
