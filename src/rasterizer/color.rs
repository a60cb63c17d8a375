//! RGB565 color
//!
//! The native pixel format of both the texture pool and the framebuffer.

use serde::{Deserialize, Serialize};

// =============================================================================
// RGB565 Color Type
// =============================================================================

/// 16-bit packed color
///
/// Format: `RRRRRGGG GGGBBBBB`
/// - Bits 15-11: Red (0-31)
/// - Bits 10-5: Green (0-63)
/// - Bits 4-0: Blue (0-31)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Rgb565 = Rgb565(0x0000);
    pub const WHITE: Rgb565 = Rgb565(0xFFFF);
    pub const RED: Rgb565 = Rgb565(0xF800);
    pub const GREEN: Rgb565 = Rgb565(0x07E0);
    pub const BLUE: Rgb565 = Rgb565(0x001F);

    /// Returned when sampling a texture that does not exist.
    pub const MAGENTA: Rgb565 = Rgb565(0xF81F);

    /// Pack 8-bit channels, dropping the low bits.
    #[inline]
    pub const fn from_rgb888(r: u8, g: u8, b: u8) -> Self {
        Rgb565((((r as u16) & 0xF8) << 8) | (((g as u16) & 0xFC) << 3) | ((b as u16) >> 3))
    }

    /// Pack channels already at native precision (5/6/5 bits).
    #[inline]
    pub fn from_channels(r5: u8, g6: u8, b5: u8) -> Self {
        Rgb565(((r5.min(31) as u16) << 11) | ((g6.min(63) as u16) << 5) | (b5.min(31) as u16))
    }

    /// Red channel (0-31)
    #[inline]
    pub fn r5(self) -> u8 {
        ((self.0 >> 11) & 0x1F) as u8
    }

    /// Green channel (0-63)
    #[inline]
    pub fn g6(self) -> u8 {
        ((self.0 >> 5) & 0x3F) as u8
    }

    /// Blue channel (0-31)
    #[inline]
    pub fn b5(self) -> u8 {
        (self.0 & 0x1F) as u8
    }

    /// Barycentric blend of three colors, rounded and clamped per channel.
    #[inline]
    pub fn lerp3(c0: Rgb565, c1: Rgb565, c2: Rgb565, b0: f32, b1: f32, b2: f32) -> Self {
        let r = c0.r5() as f32 * b0 + c1.r5() as f32 * b1 + c2.r5() as f32 * b2;
        let g = c0.g6() as f32 * b0 + c1.g6() as f32 * b1 + c2.g6() as f32 * b2;
        let b = c0.b5() as f32 * b0 + c1.b5() as f32 * b1 + c2.b5() as f32 * b2;
        let r = ((r + 0.5) as i32).clamp(0, 31) as u8;
        let g = ((g + 0.5) as i32).clamp(0, 63) as u8;
        let b = ((b + 0.5) as i32).clamp(0, 31) as u8;
        Self::from_channels(r, g, b)
    }

    /// Multiply by a light color channel-wise: `(a * b) >> bits`.
    #[inline]
    pub fn modulate(self, light: Rgb565) -> Self {
        let r = (self.r5() as u16 * light.r5() as u16) >> 5;
        let g = (self.g6() as u16 * light.g6() as u16) >> 6;
        let b = (self.b5() as u16 * light.b5() as u16) >> 5;
        Rgb565((r << 11) | (g << 5) | b)
    }

    /// Grey level from a 5-bit intensity, as produced by vertex lighting.
    #[inline]
    pub fn grey(intensity: u8) -> Self {
        let i = intensity.min(31) * 8;
        Self::from_rgb888(i, i, i)
    }

    /// Expand to 8-bit RGBA for display
    #[inline]
    pub fn to_rgba(self) -> [u8; 4] {
        let r = self.r5();
        let g = self.g6();
        let b = self.b5();
        [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 255]
    }
}
