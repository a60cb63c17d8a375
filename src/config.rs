//! Engine configuration
//!
//! Everything sized at startup lives here: the display, the pool capacities
//! and the default camera. Stored as RON; missing fields take defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rasterizer::{Rgb565, HEIGHT, WIDTH};

/// Largest texture side a config may allow; its square still fits in `u32`.
pub const MAX_TEXTURE_DIM: u32 = 4096;

/// Error type for config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("serialize error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub clear_color: Rgb565,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: WIDTH as u32,
            height: HEIGHT as u32,
            clear_color: Rgb565::BLACK,
        }
    }
}

/// Capacities of every fixed table and pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolLimits {
    pub max_meshes: u32,
    pub max_textures: u32,
    pub max_entities: u32,
    pub max_vertices: u32,
    pub max_indices: u32,
    pub max_frames: u32,
    pub max_compressed_vertices: u32,
    pub max_uvs: u32,
    pub max_texture_pixels: u32,
    pub max_frames_per_model: u32,
    pub max_texture_dim: u32,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_meshes: 64,
            max_textures: 64,
            max_entities: 256,
            max_vertices: 40_960,
            max_indices: 81_920,
            max_frames: 200,
            max_compressed_vertices: 204_800,
            max_uvs: 204_800,
            max_texture_pixels: 262_144,
            max_frames_per_model: 200,
            max_texture_dim: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub display: DisplayConfig,
    pub pools: PoolLimits,
    pub camera: CameraConfig,
}

impl EngineConfig {
    /// Read and validate a RON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&contents)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::new().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.display;
        if d.width == 0 || d.height == 0 || d.width > 8192 || d.height > 8192 {
            return Err(ConfigError::Invalid(format!(
                "display size {}x{} out of range",
                d.width, d.height
            )));
        }

        let p = &self.pools;
        let tables = [
            ("max_meshes", p.max_meshes),
            ("max_textures", p.max_textures),
            ("max_entities", p.max_entities),
            ("max_frames_per_model", p.max_frames_per_model),
            ("max_texture_dim", p.max_texture_dim),
        ];
        for (name, value) in tables {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        // Handles use u32::MAX as the sentinel
        if p.max_meshes == u32::MAX || p.max_textures == u32::MAX || p.max_entities == u32::MAX {
            return Err(ConfigError::Invalid("slot count collides with the invalid handle".into()));
        }
        if p.max_texture_dim > MAX_TEXTURE_DIM {
            return Err(ConfigError::Invalid(format!(
                "max_texture_dim ({}) exceeds {}",
                p.max_texture_dim, MAX_TEXTURE_DIM
            )));
        }
        if p.max_frames_per_model > p.max_frames {
            return Err(ConfigError::Invalid(format!(
                "max_frames_per_model ({}) exceeds max_frames ({})",
                p.max_frames_per_model, p.max_frames
            )));
        }

        let c = &self.camera;
        if !(c.fov_degrees > 0.0 && c.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!("fov {} out of range", c.fov_degrees)));
        }
        if !(c.near > 0.0 && c.far > c.near) {
            return Err(ConfigError::Invalid(format!(
                "near/far planes {} / {} invalid",
                c.near, c.far
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_limits() {
        let c = EngineConfig::default();
        assert_eq!((c.display.width, c.display.height), (1240, 680));
        assert_eq!(c.pools.max_vertices, 40_960);
        assert_eq!(c.pools.max_indices, 81_920);
        assert_eq!(c.pools.max_frames_per_model, 200);
        assert!((c.camera.fov_degrees - 60.0).abs() < 0.001);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_ron_round_trip() {
        let mut c = EngineConfig::default();
        c.pools.max_meshes = 8;
        c.camera.far = 250.0;
        let text = c.to_ron_string().unwrap();
        let back = EngineConfig::from_ron_str(&text).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let c = EngineConfig::from_ron_str("(pools: (max_entities: 16))").unwrap();
        assert_eq!(c.pools.max_entities, 16);
        assert_eq!(c.pools.max_meshes, 64);
        assert_eq!(c.display.width, 1240);
    }

    #[test]
    fn test_validation_rejects_bad_camera() {
        let err = EngineConfig::from_ron_str("(camera: (near: 5.0, far: 1.0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validation_caps_texture_dim() {
        let mut c = EngineConfig::default();
        c.pools.max_texture_dim = 65_536;
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
        c.pools.max_texture_dim = MAX_TEXTURE_DIM;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            EngineConfig::from_ron_str("(display: (width: \"wide\"))"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        let mut c = EngineConfig::default();
        c.display.width = 320;
        c.display.height = 240;
        c.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.display.width, 320);
        assert!(matches!(
            EngineConfig::load(&dir.path().join("missing.ron")),
            Err(ConfigError::Io(_))
        ));
    }
}
