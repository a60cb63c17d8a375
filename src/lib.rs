//! pool-raster: a software 3D renderer over fixed-capacity pools
//!
//! Everything is sized once from [`EngineConfig`]; the per-frame path
//! (transform resolution, geometry, scan conversion) does not allocate.
//!
//! # Module Organization
//!
//! - `config` - RON engine configuration (display, pool limits, camera)
//! - `store` - Pool allocator plus mesh and texture stores
//! - `asset` - OBJ / MD2 / BMP parsers feeding the stores
//! - `anim` - MD2 vertex decompression and keyframe blending
//! - `scene` - Entities, components, transform hierarchy
//! - `pipeline` - Model to screen transform, culling, lighting
//! - `rasterizer` - Math, RGB565, pixel sinks, triangle scan conversion

pub mod anim;
pub mod asset;
pub mod config;
pub mod pipeline;
pub mod rasterizer;
pub mod scene;
pub mod store;

pub use config::{CameraConfig, ConfigError, DisplayConfig, EngineConfig, PoolLimits};
pub use pipeline::{render_scene, PipelineStats, RenderContext};
pub use rasterizer::{Framebuffer, LinearFramebuffer, PixelSink, Rasterizer, Rgb565};
pub use scene::{ComponentMask, EntityId, SceneError, World};
pub use store::{MeshHandle, MeshStore, StoreError, TextureHandle, TextureStore};

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
