//! Pixel sinks
//!
//! The rasterizer never owns presentation. It writes finished pixels into a
//! [`PixelSink`], which is either the desktop RGBA framebuffer that gets
//! uploaded as a texture, or a borrowed RGB565 region on hardware that scans
//! it out directly.

use super::color::Rgb565;

/// Destination for rasterized pixels.
///
/// Coordinates passed to `put_pixel` are always inside `width() x height()`.
pub trait PixelSink {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn clear(&mut self, color: Rgb565);
    fn put_pixel(&mut self, x: usize, y: usize, color: Rgb565);
}

/// Framebuffer for desktop presentation
pub struct Framebuffer {
    pub pixels: Vec<u8>, // RGBA, 4 bytes per pixel
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            width,
            height,
        }
    }

    /// Read a pixel back as RGBA.
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        Some([
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ])
    }
}

impl PixelSink for Framebuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn clear(&mut self, color: Rgb565) {
        let bytes = color.to_rgba();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    #[inline]
    fn put_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        let idx = (y * self.width + x) * 4;
        self.pixels[idx..idx + 4].copy_from_slice(&color.to_rgba());
    }
}

/// Linear RGB565 framebuffer over caller-provided memory.
///
/// On hardware the slice points at the display controller's scan-out region,
/// so nothing here allocates.
pub struct LinearFramebuffer<'a> {
    pixels: &'a mut [u16],
    width: usize,
    height: usize,
}

impl<'a> LinearFramebuffer<'a> {
    /// Wrap `pixels`; returns `None` if the slice is too small for the size.
    pub fn new(pixels: &'a mut [u16], width: usize, height: usize) -> Option<Self> {
        if pixels.len() < width * height {
            return None;
        }
        Some(Self { pixels, width, height })
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels[..self.width * self.height]
    }
}

impl PixelSink for LinearFramebuffer<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn clear(&mut self, color: Rgb565) {
        self.pixels[..self.width * self.height].fill(color.0);
    }

    #[inline]
    fn put_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        self.pixels[y * self.width + x] = color.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framebuffer_clear_and_put() {
        let mut fb = Framebuffer::new(4, 3);
        fb.clear(Rgb565::BLUE);
        assert_eq!(fb.get_pixel(3, 2), Some([0, 0, 255, 255]));
        fb.put_pixel(1, 1, Rgb565::RED);
        assert_eq!(fb.get_pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(fb.get_pixel(4, 0), None);
    }

    #[test]
    fn test_linear_framebuffer_layout() {
        let mut mem = [0u16; 6];
        {
            let mut fb = LinearFramebuffer::new(&mut mem, 3, 2).unwrap();
            fb.clear(Rgb565::WHITE);
            fb.put_pixel(2, 1, Rgb565::RED);
        }
        assert_eq!(mem[5], 0xF800);
        assert_eq!(mem[0], 0xFFFF);
    }

    #[test]
    fn test_linear_framebuffer_rejects_short_slice() {
        let mut mem = [0u16; 5];
        assert!(LinearFramebuffer::new(&mut mem, 3, 2).is_none());
    }
}
