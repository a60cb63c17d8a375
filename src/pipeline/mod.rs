//! Geometry pipeline
//!
//! Bridges the scene, the mesh/texture stores and the rasterizer:
//! model -> world -> view -> clip -> NDC -> screen, with near/NDC rejection,
//! backface culling and a fixed vertex light.
//!
//! View and projection travel in an explicit [`RenderContext`] built once
//! per frame, usually from a camera entity.

pub mod render;
pub mod vertex;

pub use render::{render_scene, PipelineStats};
pub use vertex::{light_intensity, transform_vertex, vertex_light};

use crate::config::CameraConfig;
use crate::rasterizer::{mat4_inverse_rigid, mat4_look_at, mat4_perspective, Mat4, Vec3};
use crate::scene::{EntityId, World};

/// Per-frame view state handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub view: Mat4,
    pub projection: Mat4,
    /// Viewport size in pixels
    pub width: usize,
    pub height: usize,
}

impl RenderContext {
    pub fn new(view: Mat4, projection: Mat4, width: usize, height: usize) -> Self {
        Self {
            view,
            projection,
            width,
            height,
        }
    }

    /// View from a camera entity's resolved world matrix.
    ///
    /// The world matrix must be rigid (no scale). Returns `None` if the
    /// entity is dead or has no camera component.
    pub fn from_camera(world: &World, camera: EntityId, width: usize, height: usize) -> Option<Self> {
        let cam = world.camera(camera)?;
        let transform = world.transform(camera)?;
        let view = mat4_inverse_rigid(transform.world_matrix());
        let projection = mat4_perspective(cam.fov, aspect(width, height), cam.near, cam.far);
        Some(Self::new(view, projection, width, height))
    }

    /// Look-at view with the configured lens.
    pub fn look_at(eye: Vec3, target: Vec3, lens: &CameraConfig, width: usize, height: usize) -> Self {
        let view = mat4_look_at(eye, target, Vec3::UP);
        let projection = mat4_perspective(lens.fov_degrees.to_radians(), aspect(width, height), lens.near, lens.far);
        Self::new(view, projection, width, height)
    }

    pub fn aspect(&self) -> f32 {
        aspect(self.width, self.height)
    }
}

fn aspect(width: usize, height: usize) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{mat4_transform_point, Vec3};
    use crate::scene::ComponentMask;

    #[test]
    fn test_from_camera_inverts_world() {
        let mut world = World::new(4);
        let cam = world.spawn("camera").unwrap();
        world.add_component(cam, ComponentMask::TRANSFORM | ComponentMask::CAMERA).unwrap();
        world.set_position(cam, Vec3::new(0.0, 2.0, 8.0)).unwrap();
        world.resolve_transforms();

        let ctx = RenderContext::from_camera(&world, cam, 320, 240).unwrap();
        let eye = mat4_transform_point(&ctx.view, Vec3::new(0.0, 2.0, 8.0));
        assert!(eye.len() < 0.001);
        let ahead = mat4_transform_point(&ctx.view, Vec3::new(0.0, 2.0, 0.0));
        assert!((ahead.z + 8.0).abs() < 0.001);
        assert!((ctx.aspect() - 320.0 / 240.0).abs() < 0.001);
    }

    #[test]
    fn test_from_camera_needs_component() {
        let mut world = World::new(2);
        let e = world.spawn("not a camera").unwrap();
        world.add_component(e, ComponentMask::TRANSFORM).unwrap();
        assert!(RenderContext::from_camera(&world, e, 64, 64).is_none());
        assert!(RenderContext::from_camera(&world, EntityId::NULL, 64, 64).is_none());
    }

    #[test]
    fn test_look_at_matches_camera_entity() {
        let mut world = World::new(2);
        let cam = world.spawn("camera").unwrap();
        world.add_component(cam, ComponentMask::TRANSFORM | ComponentMask::CAMERA).unwrap();
        world.set_position(cam, Vec3::new(0.0, 0.0, 5.0)).unwrap();
        world.resolve_transforms();

        let lens = CameraConfig {
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
        };
        let a = RenderContext::from_camera(&world, cam, 64, 64).unwrap();
        let b = RenderContext::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, &lens, 64, 64);
        let p = Vec3::new(1.0, 2.0, -3.0);
        let pa = mat4_transform_point(&a.view, p);
        let pb = mat4_transform_point(&b.view, p);
        assert!((pa - pb).len() < 0.001);
    }
}
