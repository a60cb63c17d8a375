//! Component types
//!
//! Plain data attached to entities. Presence is tracked by a
//! [`ComponentMask`] bit on the entity; behavior lives in the world and the
//! render pipeline.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::anim::AnimationRange;
use crate::rasterizer::{Rgb565, Vec3};
use crate::store::{MeshHandle, TextureHandle};

// =============================================================================
// Mask
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentMask(pub u32);

impl ComponentMask {
    pub const NONE: ComponentMask = ComponentMask(0);
    pub const TRANSFORM: ComponentMask = ComponentMask(1 << 0);
    pub const MESH_RENDERER: ComponentMask = ComponentMask(1 << 1);
    pub const CAMERA: ComponentMask = ComponentMask(1 << 3);
    pub const LIGHT: ComponentMask = ComponentMask(1 << 4);
    pub const ANIMATOR: ComponentMask = ComponentMask(1 << 5);

    /// True if every bit of `other` is set.
    pub fn contains(self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: ComponentMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn remove(&mut self, other: ComponentMask) {
        self.0 &= !other.0;
    }
}

impl BitOr for ComponentMask {
    type Output = ComponentMask;

    fn bitor(self, rhs: ComponentMask) -> ComponentMask {
        ComponentMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentMask {
    fn bitor_assign(&mut self, rhs: ComponentMask) {
        self.0 |= rhs.0;
    }
}

// =============================================================================
// Rendering
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshRenderer {
    pub mesh: MeshHandle,
    /// `INVALID` draws flat-shaded with `color`
    pub texture: TextureHandle,
    pub color: Rgb565,
    pub visible: bool,
    /// Keyframe pair and blend for animated meshes
    pub frame_a: u16,
    pub frame_b: u16,
    pub lerp: f32,
}

impl MeshRenderer {
    pub fn new(mesh: MeshHandle) -> Self {
        Self {
            mesh,
            ..Self::default()
        }
    }
}

impl Default for MeshRenderer {
    fn default() -> Self {
        Self {
            mesh: MeshHandle::INVALID,
            texture: TextureHandle::INVALID,
            color: Rgb565::WHITE,
            visible: true,
            frame_a: 0,
            frame_b: 0,
            lerp: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub active: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 60.0f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            active: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    #[default]
    Directional,
    Point,
    Spot,
}

/// Stored for scene description only; shading uses a fixed light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub spot_angle: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Directional,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
            spot_angle: 0.0,
        }
    }
}

// =============================================================================
// Animation
// =============================================================================

/// Keyframe playback rate.
pub const ANIMATION_FPS: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    pub current_frame: u32,
    pub next_frame: u32,
    /// Blend from `current_frame` to `next_frame`, 0..1
    pub interpolation: f32,
    pub frame_time: f32,
    pub playback_speed: f32,
    pub start_frame: u32,
    /// Inclusive
    pub end_frame: u32,
    pub playing: bool,
    pub looping: bool,
}

impl Default for Animator {
    fn default() -> Self {
        Self {
            current_frame: 0,
            next_frame: 0,
            interpolation: 0.0,
            frame_time: 0.0,
            playback_speed: 1.0,
            start_frame: 0,
            end_frame: 0,
            playing: false,
            looping: false,
        }
    }
}

impl Animator {
    /// Start playing a frame range from its first frame.
    pub fn play(&mut self, range: AnimationRange, looping: bool) {
        self.start_frame = range.start as u32;
        self.end_frame = range.end as u32;
        self.current_frame = self.start_frame;
        self.next_frame = (self.start_frame + 1).min(self.end_frame);
        self.frame_time = 0.0;
        self.interpolation = 0.0;
        self.playing = true;
        self.looping = looping;
    }

    /// Step by `dt` seconds. At most one keyframe is crossed per call.
    pub fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        let frame_duration = 1.0 / ANIMATION_FPS;
        self.frame_time += dt * self.playback_speed;

        if self.frame_time >= frame_duration {
            self.frame_time -= frame_duration;
            self.current_frame = self.next_frame;
            self.next_frame += 1;

            if self.next_frame > self.end_frame {
                if self.looping {
                    self.next_frame = self.start_frame;
                } else {
                    self.next_frame = self.end_frame;
                    self.playing = false;
                }
            }
        }

        self.interpolation = self.frame_time / frame_duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::animation_range;

    #[test]
    fn test_mask_operations() {
        let mut mask = ComponentMask::TRANSFORM | ComponentMask::MESH_RENDERER;
        assert_eq!(mask.0, 3);
        assert!(mask.contains(ComponentMask::TRANSFORM));
        assert!(!mask.contains(ComponentMask::TRANSFORM | ComponentMask::CAMERA));
        mask |= ComponentMask::LIGHT;
        assert_eq!(mask.0, 19);
        mask.remove(ComponentMask::MESH_RENDERER);
        assert!(!mask.intersects(ComponentMask::MESH_RENDERER));
    }

    #[test]
    fn test_defaults() {
        assert!((Camera::default().fov - std::f32::consts::FRAC_PI_3).abs() < 0.001);
        assert!(!MeshRenderer::default().mesh.is_valid());
        assert!(MeshRenderer::default().visible);
        assert!((Animator::default().playback_speed - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_animator_advances_and_loops() {
        let mut anim = Animator::default();
        anim.play(AnimationRange { name: "t", start: 0, end: 2 }, true);
        assert_eq!((anim.current_frame, anim.next_frame), (0, 1));

        anim.advance(0.05);
        assert_eq!(anim.current_frame, 0);
        assert!((anim.interpolation - 0.5).abs() < 0.001);

        anim.advance(0.06);
        assert_eq!((anim.current_frame, anim.next_frame), (1, 2));
        anim.advance(0.1);
        assert_eq!((anim.current_frame, anim.next_frame), (2, 0));
        assert!(anim.playing);
    }

    #[test]
    fn test_animator_stops_at_end_without_loop() {
        let mut anim = Animator::default();
        anim.play(animation_range("run").unwrap(), false);
        assert_eq!(anim.start_frame, 40);
        for _ in 0..20 {
            anim.advance(0.101);
        }
        assert!(!anim.playing);
        assert_eq!((anim.current_frame, anim.next_frame), (45, 45));

        let frozen = anim;
        anim.advance(1.0);
        assert_eq!(anim, frozen);
    }

    #[test]
    fn test_playback_speed_scales_time() {
        let mut anim = Animator::default();
        anim.play(AnimationRange { name: "t", start: 0, end: 5 }, true);
        anim.playback_speed = 2.0;
        anim.advance(0.06);
        assert_eq!(anim.current_frame, 1);
    }
}
