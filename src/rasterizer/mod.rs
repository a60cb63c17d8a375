//! Software rasterizer
//!
//! Scan conversion and the types it shares with the geometry stage.
//!
//! # Module Organization
//!
//! - `math` - Vec2/Vec3/Vec4, Mat4 helpers, quaternions
//! - `color` - RGB565 packing, blending and modulation
//! - `raster` - Edge-function triangle scan conversion, depth buffer, stats
//! - `sink` - Pixel sink trait and framebuffers
//! - `constants` - Display size and clip thresholds

pub mod color;
pub mod constants;
pub mod math;
pub mod raster;
pub mod sink;

// =============================================================================
// Convenience re-exports for commonly used items
// =============================================================================

pub use color::Rgb565;

pub use math::{
    Mat4, Quat, Vec2, Vec3, Vec4,
    mat4_identity, mat4_inverse_rigid, mat4_look_at, mat4_mul, mat4_perspective,
    mat4_rotation, mat4_rotation_x, mat4_rotation_y, mat4_rotation_z, mat4_scale,
    mat4_transform_point, mat4_transform_vec4, mat4_transform_vector, mat4_translation,
    mat4_trs, mat4_get_translation,
};

pub use raster::{RasterStats, Rasterizer, ScreenVertex, TextureView, signed_area};

pub use sink::{Framebuffer, LinearFramebuffer, PixelSink};

pub use constants::{HEIGHT, WIDTH};
