//! Texture storage
//!
//! RGB565 pixels packed back to back in one pixel pool. Wrapping uses
//! `size - 1` masks, so only power-of-two sizes tile correctly; other sizes
//! load with a warning.

use crate::asset::decode_bmp;
use crate::config::PoolLimits;
use crate::rasterizer::{Rgb565, TextureView};
use super::pool::{PoolAllocator, Span};
use super::{find_free_slot, StoreError, TextureHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSlot {
    pub pixels: Span,
    pub width: u32,
    pub height: u32,
    pub width_mask: u32,
    pub height_mask: u32,
}

pub struct TextureStore {
    slots: Vec<Option<TextureSlot>>,
    pixels: PoolAllocator<Rgb565>,
    max_dim: u32,
}

impl TextureStore {
    pub fn new(limits: &PoolLimits) -> Self {
        Self {
            slots: vec![None; limits.max_textures as usize],
            pixels: PoolAllocator::new("pixel", limits.max_texture_pixels),
            max_dim: limits.max_texture_dim,
        }
    }

    /// Claim a slot and a pixel range, fill it with `fill(x, y)`.
    fn create_with(
        &mut self,
        width: u32,
        height: u32,
        fill: impl Fn(u32, u32) -> Rgb565,
    ) -> Result<TextureHandle, StoreError> {
        if width == 0 || height == 0 || width > self.max_dim || height > self.max_dim {
            return Err(StoreError::InvalidDimensions { width, height });
        }
        if !width.is_power_of_two() || !height.is_power_of_two() {
            log::warn!("texture {}x{} is not a power of two, wrapping will be wrong", width, height);
        }

        let count = width
            .checked_mul(height)
            .ok_or(StoreError::InvalidDimensions { width, height })?;

        let slot = find_free_slot(&self.slots, "texture")?;
        let span = self.pixels.allocate(count)?;
        let dst = self.pixels.slice_mut(span);
        for (i, px) in dst.iter_mut().enumerate() {
            let (x, y) = (i % width as usize, i / width as usize);
            *px = fill(x as u32, y as u32);
        }

        self.slots[slot] = Some(TextureSlot {
            pixels: span,
            width,
            height,
            width_mask: width - 1,
            height_mask: height - 1,
        });
        log::debug!("texture {}: {}x{}", slot, width, height);
        Ok(TextureHandle(slot as u32))
    }

    pub fn create_solid(&mut self, width: u32, height: u32, color: Rgb565) -> Result<TextureHandle, StoreError> {
        self.create_with(width, height, |_, _| color)
    }

    /// Square checkerboard with 8 checks per side (at least one pixel each).
    pub fn create_checkerboard(&mut self, size: u32, c1: Rgb565, c2: Rgb565) -> Result<TextureHandle, StoreError> {
        let check = (size / 8).max(1);
        self.create_with(size, size, |x, y| {
            if (x / check + y / check) & 1 == 1 {
                c1
            } else {
                c2
            }
        })
    }

    /// Copy row-major top-down pixels.
    pub fn load_pixels(&mut self, width: u32, height: u32, pixels: &[Rgb565]) -> Result<TextureHandle, StoreError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(StoreError::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        self.create_with(width, height, |x, y| pixels[y as usize * width as usize + x as usize])
    }

    pub fn load_bmp(&mut self, bytes: &[u8]) -> Result<TextureHandle, StoreError> {
        let image = decode_bmp(bytes, self.max_dim).inspect_err(|e| log::warn!("BMP rejected: {}", e))?;
        self.load_pixels(image.width, image.height, &image.pixels)
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureSlot> {
        self.slots.get(handle.0 as usize)?.as_ref()
    }

    pub fn pixels(&self, handle: TextureHandle) -> Option<&[Rgb565]> {
        self.get(handle).map(|t| self.pixels.slice(t.pixels))
    }

    /// Borrowed view for the rasterizer.
    pub fn view(&self, handle: TextureHandle) -> Option<TextureView<'_>> {
        let t = self.get(handle)?;
        Some(TextureView {
            pixels: self.pixels.slice(t.pixels),
            width: t.width,
            height: t.height,
            width_mask: t.width_mask,
            height_mask: t.height_mask,
        })
    }

    /// Nearest sample at normalized `(u, v)`; magenta for a missing texture.
    pub fn sample(&self, handle: TextureHandle, u: f32, v: f32) -> Rgb565 {
        self.view(handle).map_or(Rgb565::MAGENTA, |view| view.sample(u, v))
    }

    /// Texel at integer coordinates, wrapped by the masks.
    pub fn sample_fast(&self, handle: TextureHandle, u: i32, v: i32) -> Rgb565 {
        let Some(t) = self.get(handle) else {
            return Rgb565::MAGENTA;
        };
        let tx = (u as u32) & t.width_mask;
        let ty = (v as u32) & t.height_mask;
        self.pixels
            .get(t.pixels.offset + ty * t.width + tx)
            .copied()
            .unwrap_or(Rgb565::MAGENTA)
    }

    /// Release the slot. Pool storage is not reclaimed.
    pub fn free(&mut self, handle: TextureHandle) -> bool {
        self.slots
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
            .is_some()
    }

    pub fn free_pixel_count(&self) -> u32 {
        self.pixels.remaining()
    }

    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.pixels.reset();
    }
}
