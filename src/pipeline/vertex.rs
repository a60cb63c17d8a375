//! Per-vertex geometry
//!
//! Model-view transform, near/w/NDC rejection, viewport mapping and the
//! fixed vertex light.

use crate::rasterizer::constants::{LIGHT_AMBIENT, LIGHT_DIFFUSE, MIN_CLIP_W, NDC_GUARD, NEAR_REJECT_Z};
use crate::rasterizer::{mat4_transform_point, mat4_transform_vec4, Mat4, Rgb565, ScreenVertex, Vec2, Vec3, Vec4};
use super::RenderContext;

/// 5-bit light level for an object-space normal. Brightest facing +Y.
#[inline]
pub fn light_intensity(normal: Vec3) -> u8 {
    let light = LIGHT_AMBIENT + LIGHT_DIFFUSE * (normal.y * 0.5 + 0.5);
    ((light * 31.0) as i32).clamp(0, 31) as u8
}

#[inline]
pub fn vertex_light(normal: Vec3) -> Rgb565 {
    Rgb565::grey(light_intensity(normal))
}

/// Project one vertex to the screen.
///
/// `model_view` is the view matrix times the entity's world matrix. Returns
/// `None` when the vertex is at or behind the near reject distance, has a
/// degenerate clip w, or lands outside the NDC guard box.
pub fn transform_vertex(
    ctx: &RenderContext,
    model_view: &Mat4,
    position: Vec3,
    normal: Vec3,
    uv: Vec2,
) -> Option<ScreenVertex> {
    let view = mat4_transform_point(model_view, position);
    if view.z >= NEAR_REJECT_Z {
        return None;
    }

    let clip = mat4_transform_vec4(&ctx.projection, Vec4::from_vec3(view, 1.0));
    if clip.w <= MIN_CLIP_W {
        return None;
    }

    let w_inv = 1.0 / clip.w;
    let ndc = Vec3::new(clip.x * w_inv, clip.y * w_inv, clip.z * w_inv);
    if ndc.x.abs() > NDC_GUARD || ndc.y.abs() > NDC_GUARD || !(0.0..=1.0).contains(&ndc.z) {
        return None;
    }

    let sx = (ndc.x * 0.5 + 0.5) * ctx.width as f32;
    let sy = (1.0 - (ndc.y * 0.5 + 0.5)) * ctx.height as f32;

    Some(ScreenVertex {
        x: sx as i32,
        y: sy as i32,
        z: ndc.z,
        w_inv,
        u: uv.x,
        v: uv.y,
        color: vertex_light(normal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{mat4_identity, mat4_perspective};

    fn ctx() -> RenderContext {
        RenderContext::new(
            mat4_identity(),
            mat4_perspective(60.0f32.to_radians(), 1.0, 0.1, 100.0),
            64,
            64,
        )
    }

    #[test]
    fn test_light_levels() {
        assert_eq!(light_intensity(Vec3::new(0.0, 1.0, 0.0)), 31);
        assert_eq!(light_intensity(Vec3::new(0.0, -1.0, 0.0)), 9);
        assert_eq!(light_intensity(Vec3::new(0.0, 0.0, 1.0)), 20);
        assert_eq!(vertex_light(Vec3::UP), Rgb565::from_rgb888(248, 248, 248));
    }

    #[test]
    fn test_point_ahead_maps_to_center() {
        let c = ctx();
        let v = transform_vertex(&c, &mat4_identity(), Vec3::new(0.0, 0.0, -5.0), Vec3::UP, Vec2::new(0.25, 0.75))
            .unwrap();
        assert_eq!((v.x, v.y), (32, 32));
        assert!(v.z > 0.0 && v.z < 1.0);
        assert!((v.w_inv - 0.2).abs() < 0.001);
        assert!((v.u - 0.25).abs() < 0.001);
        assert!((v.v - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_up_is_screen_top() {
        let c = ctx();
        let v = transform_vertex(&c, &mat4_identity(), Vec3::new(0.0, 1.0, -5.0), Vec3::UP, Vec2::default())
            .unwrap();
        assert!(v.y < 32);
    }

    #[test]
    fn test_rejections() {
        let c = ctx();
        let m = mat4_identity();
        let uv = Vec2::default();
        // behind the camera and inside the near reject distance
        assert!(transform_vertex(&c, &m, Vec3::new(0.0, 0.0, 1.0), Vec3::UP, uv).is_none());
        assert!(transform_vertex(&c, &m, Vec3::new(0.0, 0.0, -0.05), Vec3::UP, uv).is_none());
        // far off to the side
        assert!(transform_vertex(&c, &m, Vec3::new(50.0, 0.0, -5.0), Vec3::UP, uv).is_none());
        // beyond the far plane
        assert!(transform_vertex(&c, &m, Vec3::new(0.0, 0.0, -200.0), Vec3::UP, uv).is_none());
    }
}
