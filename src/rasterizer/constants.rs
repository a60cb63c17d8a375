//! Rasterizer constants
//!
//! Display resolution and the fixed clip/projection thresholds used by the
//! geometry stage.

/// Default display width
pub const WIDTH: usize = 1240;

/// Default display height
pub const HEIGHT: usize = 680;

/// Vertices at or beyond this view-space z are rejected (camera looks down -Z).
pub const NEAR_REJECT_Z: f32 = -0.1;

/// Minimum clip-space w accepted before the perspective divide.
pub const MIN_CLIP_W: f32 = 1e-4;

/// Loose NDC guard band for x and y; z must stay inside [0, 1].
pub const NDC_GUARD: f32 = 1.5;

/// Ambient floor of the fixed vertex lighting term.
pub const LIGHT_AMBIENT: f32 = 0.3;

/// Scale of the normal-dependent part of the lighting term.
pub const LIGHT_DIFFUSE: f32 = 0.7;
