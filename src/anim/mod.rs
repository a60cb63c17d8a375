//! Keyframe vertex animation
//!
//! MD2 models store every frame as bytes: one scale/translate pair per
//! frame and one `(x, y, z, normal_index)` quadruple per vertex. Decoding is
//! `byte * scale + translate`; playback blends two decoded frames.

pub mod normals;

use crate::rasterizer::Vec3;
use crate::store::Span;

/// One quantized vertex of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressedVertex {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    /// Index into [`normals::NORMALS`]; wraps modulo its length.
    pub normal_index: u8,
}

impl CompressedVertex {
    pub const fn new(x: u8, y: u8, z: u8, normal_index: u8) -> Self {
        Self { x, y, z, normal_index }
    }
}

/// Dequantization parameters for one frame plus where its vertices live.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationFrame {
    pub scale: Vec3,
    pub translate: Vec3,
    /// Range in the compressed-vertex pool
    pub vertices: Span,
}

impl AnimationFrame {
    /// Decode a compressed vertex position into model space.
    #[inline]
    pub fn decompress(&self, v: CompressedVertex) -> Vec3 {
        Vec3::new(
            v.x as f32 * self.scale.x + self.translate.x,
            v.y as f32 * self.scale.y + self.translate.y,
            v.z as f32 * self.scale.z + self.translate.z,
        )
    }
}

/// Decompressed position and unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// `byte * scale + translate` for one vertex.
#[inline]
pub fn decompress(frame: &AnimationFrame, v: CompressedVertex) -> Vec3 {
    frame.decompress(v)
}

/// Blend the same vertex between two frames.
///
/// Positions are lerped. Normals are looked up, lerped and renormalized,
/// which is close enough to a slerp for neighbouring keyframes.
pub fn interpolate(
    frame_a: &AnimationFrame,
    va: CompressedVertex,
    frame_b: &AnimationFrame,
    vb: CompressedVertex,
    t: f32,
) -> AnimatedVertex {
    let pa = frame_a.decompress(va);
    let pb = frame_b.decompress(vb);
    let na = normal_vec(va.normal_index);
    let nb = normal_vec(vb.normal_index);
    AnimatedVertex {
        position: pa.lerp(pb, t),
        normal: na.lerp(nb, t).normalize(),
    }
}

#[inline]
fn normal_vec(index: u8) -> Vec3 {
    let n = normals::lookup(index);
    Vec3::new(n[0], n[1], n[2])
}

/// Inclusive frame range of a named animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationRange {
    pub name: &'static str,
    pub start: u16,
    pub end: u16,
}

/// The standard MD2 character animation table.
pub const MD2_ANIMATIONS: [AnimationRange; 15] = [
    AnimationRange { name: "stand", start: 0, end: 39 },
    AnimationRange { name: "run", start: 40, end: 45 },
    AnimationRange { name: "attack", start: 46, end: 53 },
    AnimationRange { name: "pain1", start: 54, end: 57 },
    AnimationRange { name: "pain2", start: 58, end: 61 },
    AnimationRange { name: "pain3", start: 62, end: 65 },
    AnimationRange { name: "jump", start: 66, end: 71 },
    AnimationRange { name: "flip", start: 72, end: 83 },
    AnimationRange { name: "salute", start: 84, end: 94 },
    AnimationRange { name: "taunt", start: 95, end: 111 },
    AnimationRange { name: "wave", start: 112, end: 122 },
    AnimationRange { name: "point", start: 123, end: 134 },
    AnimationRange { name: "death1", start: 178, end: 183 },
    AnimationRange { name: "death2", start: 184, end: 189 },
    AnimationRange { name: "death3", start: 190, end: 197 },
];

/// Look up a named MD2 animation.
pub fn animation_range(name: &str) -> Option<AnimationRange> {
    MD2_ANIMATIONS.iter().copied().find(|a| a.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_frame() -> AnimationFrame {
        AnimationFrame {
            scale: Vec3::ONE,
            translate: Vec3::ZERO,
            vertices: Span::EMPTY,
        }
    }

    #[test]
    fn test_decompress_identity_frame() {
        let v = CompressedVertex::new(128, 64, 200, 0);
        let p = decompress(&unit_frame(), v);
        assert_eq!(p, Vec3::new(128.0, 64.0, 200.0));
    }

    #[test]
    fn test_decompress_scale_and_translate() {
        let frame = AnimationFrame {
            scale: Vec3::new(0.5, 2.0, 1.0),
            translate: Vec3::new(-10.0, 1.0, 0.25),
            vertices: Span::EMPTY,
        };
        let p = frame.decompress(CompressedVertex::new(10, 3, 4, 0));
        assert!((p - Vec3::new(-5.0, 7.0, 4.25)).len() < 0.0001);
    }

    #[test]
    fn test_interpolate_same_frame_matches_decompress() {
        let frame = AnimationFrame {
            scale: Vec3::new(0.1, 0.2, 0.3),
            translate: Vec3::new(1.0, 2.0, 3.0),
            vertices: Span::EMPTY,
        };
        let v = CompressedVertex::new(17, 99, 250, 40);
        let expected = frame.decompress(v);
        let n = normals::lookup(40);
        for step in 0..=4 {
            let t = step as f32 / 4.0;
            let out = interpolate(&frame, v, &frame, v, t);
            assert!((out.position - expected).len() < 0.0001);
            assert!((out.normal - Vec3::new(n[0], n[1], n[2])).len() < 0.001);
        }
    }

    #[test]
    fn test_interpolate_halfway() {
        let frame = unit_frame();
        let a = CompressedVertex::new(0, 0, 0, 32);
        let b = CompressedVertex::new(10, 20, 30, 32);
        let out = interpolate(&frame, a, &frame, b, 0.5);
        assert!((out.position - Vec3::new(5.0, 10.0, 15.0)).len() < 0.0001);
        assert!((out.normal - Vec3::UP).len() < 0.0001);
    }

    #[test]
    fn test_interpolated_normal_is_unit() {
        let frame = unit_frame();
        let a = CompressedVertex::new(0, 0, 0, 0);
        let b = CompressedVertex::new(0, 0, 0, 5);
        let out = interpolate(&frame, a, &frame, b, 0.3);
        assert!((out.normal.len() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_animation_ranges() {
        let run = animation_range("run").unwrap();
        assert_eq!((run.start, run.end), (40, 45));
        assert_eq!(animation_range("death3").unwrap().end, 197);
        assert!(animation_range("dance").is_none());
    }
}
