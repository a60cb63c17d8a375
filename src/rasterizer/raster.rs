//! Triangle rasterization
//!
//! Integer edge functions stepped incrementally across the clamped bounding
//! box. Front faces have positive signed area; anything else is culled.
//! Depth is the linear NDC z handed over by the geometry stage, tested
//! against a buffer owned by the [`Rasterizer`] (smaller is closer).

use super::color::Rgb565;
use super::sink::PixelSink;

/// A vertex after projection, in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenVertex {
    pub x: i32,
    pub y: i32,
    /// NDC depth in [0, 1]
    pub z: f32,
    /// 1 / clip-space w, for perspective-correct attributes
    pub w_inv: f32,
    pub u: f32,
    pub v: f32,
    /// Light color, modulates the texel
    pub color: Rgb565,
}

impl ScreenVertex {
    /// Vertex with neutral depth/perspective and white light.
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            z: 0.5,
            w_inv: 1.0,
            u: 0.0,
            v: 0.0,
            color: Rgb565::WHITE,
        }
    }
}

/// Borrowed texture pixels with power-of-two wrap masks.
#[derive(Debug, Clone, Copy)]
pub struct TextureView<'a> {
    pub pixels: &'a [Rgb565],
    pub width: u32,
    pub height: u32,
    pub width_mask: u32,
    pub height_mask: u32,
}

impl TextureView<'_> {
    /// Nearest sample with wraparound. Only the fractional part of the
    /// coordinate is used; negative values wrap from the far edge.
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> Rgb565 {
        let tx = ((wrap_unit(u) * self.width as f32) as i32 as u32) & self.width_mask;
        let ty = ((wrap_unit(v) * self.height as f32) as i32 as u32) & self.height_mask;
        self.pixels
            .get((ty * self.width + tx) as usize)
            .copied()
            .unwrap_or(Rgb565::MAGENTA)
    }
}

#[inline]
fn wrap_unit(t: f32) -> f32 {
    let f = t - t.trunc();
    if f < 0.0 {
        f + 1.0
    } else {
        f
    }
}

/// Counters accumulated since the last [`Rasterizer::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub triangles_submitted: u32,
    pub triangles_culled: u32,
    pub triangles_drawn: u32,
    pub pixels_written: u32,
}

/// `E(a, b, p) = (b.x - a.x)(p.y - a.y) - (b.y - a.y)(p.x - a.x)`
#[inline]
pub fn edge(ax: i32, ay: i32, bx: i32, by: i32, px: i32, py: i32) -> i32 {
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

/// Twice the signed screen-space area; positive for front faces.
#[inline]
pub fn signed_area(v0: &ScreenVertex, v1: &ScreenVertex, v2: &ScreenVertex) -> i32 {
    edge(v0.x, v0.y, v1.x, v1.y, v2.x, v2.y)
}

/// Per-triangle setup shared by both entry points.
struct Setup {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    inv_area: f32,
    // Edge values at (min_x, min_y) and their x / y increments.
    w0_row: i32,
    w1_row: i32,
    w2_row: i32,
    a12: i32,
    b12: i32,
    a20: i32,
    b20: i32,
    a01: i32,
    b01: i32,
}

/// Scan converter with its own depth buffer.
pub struct Rasterizer {
    width: usize,
    height: usize,
    depth: Vec<f32>,
    stats: RasterStats,
}

impl Rasterizer {
    /// Allocates the depth buffer once; drawing never allocates.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            depth: vec![f32::MAX; width * height],
            stats: RasterStats::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stats(&self) -> RasterStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RasterStats::default();
    }

    pub fn clear_depth(&mut self) {
        self.depth.fill(f32::MAX);
    }

    /// Start a frame: clear color and depth, zero the counters.
    pub fn begin_frame<S: PixelSink + ?Sized>(&mut self, sink: &mut S, clear_color: Rgb565) {
        sink.clear(clear_color);
        self.clear_depth();
        self.reset_stats();
    }

    pub fn depth_at(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.depth[y * self.width + x])
    }

    fn setup(
        &mut self,
        clip_w: usize,
        clip_h: usize,
        v0: &ScreenVertex,
        v1: &ScreenVertex,
        v2: &ScreenVertex,
    ) -> Option<Setup> {
        self.stats.triangles_submitted += 1;

        let area = signed_area(v0, v1, v2);
        if area <= 0 || clip_w == 0 || clip_h == 0 {
            self.stats.triangles_culled += 1;
            return None;
        }

        let min_x = v0.x.min(v1.x).min(v2.x).max(0);
        let min_y = v0.y.min(v1.y).min(v2.y).max(0);
        let max_x = v0.x.max(v1.x).max(v2.x).min(clip_w as i32 - 1);
        let max_y = v0.y.max(v1.y).max(v2.y).min(clip_h as i32 - 1);
        if min_x > max_x || min_y > max_y {
            self.stats.triangles_culled += 1;
            return None;
        }

        self.stats.triangles_drawn += 1;
        Some(Setup {
            min_x,
            min_y,
            max_x,
            max_y,
            inv_area: 1.0 / area as f32,
            w0_row: edge(v1.x, v1.y, v2.x, v2.y, min_x, min_y),
            w1_row: edge(v2.x, v2.y, v0.x, v0.y, min_x, min_y),
            w2_row: edge(v0.x, v0.y, v1.x, v1.y, min_x, min_y),
            a12: v1.y - v2.y,
            b12: v2.x - v1.x,
            a20: v2.y - v0.y,
            b20: v0.x - v2.x,
            a01: v0.y - v1.y,
            b01: v1.x - v0.x,
        })
    }

    /// Depth-test and write one pixel. Returns true if it was written.
    #[inline]
    fn write<S: PixelSink + ?Sized>(
        &mut self,
        sink: &mut S,
        x: usize,
        y: usize,
        z: f32,
        color: Rgb565,
    ) -> bool {
        let idx = y * self.width + x;
        if z >= self.depth[idx] {
            return false;
        }
        self.depth[idx] = z;
        sink.put_pixel(x, y, color);
        self.stats.pixels_written += 1;
        true
    }

    /// Textured, light-modulated triangle with perspective-correct UVs.
    pub fn draw_triangle<S: PixelSink + ?Sized>(
        &mut self,
        sink: &mut S,
        v0: &ScreenVertex,
        v1: &ScreenVertex,
        v2: &ScreenVertex,
        texture: &TextureView,
    ) {
        let (clip_w, clip_h) = self.clip_size(sink);
        let Some(s) = self.setup(clip_w, clip_h, v0, v1, v2) else {
            return;
        };

        let (u0, u1, u2) = (v0.u * v0.w_inv, v1.u * v1.w_inv, v2.u * v2.w_inv);
        let (t0, t1, t2) = (v0.v * v0.w_inv, v1.v * v1.w_inv, v2.v * v2.w_inv);

        let mut w0_row = s.w0_row;
        let mut w1_row = s.w1_row;
        let mut w2_row = s.w2_row;

        for y in s.min_y..=s.max_y {
            let (mut w0, mut w1, mut w2) = (w0_row, w1_row, w2_row);

            for x in s.min_x..=s.max_x {
                if (w0 | w1 | w2) >= 0 {
                    let b0 = w0 as f32 * s.inv_area;
                    let b1 = w1 as f32 * s.inv_area;
                    let b2 = w2 as f32 * s.inv_area;

                    let z = b0 * v0.z + b1 * v1.z + b2 * v2.z;
                    let idx = y as usize * self.width + x as usize;
                    let one_over_w = b0 * v0.w_inv + b1 * v1.w_inv + b2 * v2.w_inv;

                    if z < self.depth[idx] && one_over_w > 0.0 {
                        let u = (b0 * u0 + b1 * u1 + b2 * u2) / one_over_w;
                        let v = (b0 * t0 + b1 * t1 + b2 * t2) / one_over_w;
                        let light = Rgb565::lerp3(v0.color, v1.color, v2.color, b0, b1, b2);
                        let color = texture.sample(u, v).modulate(light);
                        self.write(sink, x as usize, y as usize, z, color);
                    }
                }
                w0 += s.a12;
                w1 += s.a20;
                w2 += s.a01;
            }

            w0_row += s.b12;
            w1_row += s.b20;
            w2_row += s.b01;
        }
    }

    /// Flat-colored triangle, depth tested, no texture fetch.
    pub fn draw_triangle_solid<S: PixelSink + ?Sized>(
        &mut self,
        sink: &mut S,
        v0: &ScreenVertex,
        v1: &ScreenVertex,
        v2: &ScreenVertex,
        color: Rgb565,
    ) {
        let (clip_w, clip_h) = self.clip_size(sink);
        let Some(s) = self.setup(clip_w, clip_h, v0, v1, v2) else {
            return;
        };

        let mut w0_row = s.w0_row;
        let mut w1_row = s.w1_row;
        let mut w2_row = s.w2_row;

        for y in s.min_y..=s.max_y {
            let (mut w0, mut w1, mut w2) = (w0_row, w1_row, w2_row);

            for x in s.min_x..=s.max_x {
                if (w0 | w1 | w2) >= 0 {
                    let z = (w0 as f32 * v0.z + w1 as f32 * v1.z + w2 as f32 * v2.z) * s.inv_area;
                    self.write(sink, x as usize, y as usize, z, color);
                }
                w0 += s.a12;
                w1 += s.a20;
                w2 += s.a01;
            }

            w0_row += s.b12;
            w1_row += s.b20;
            w2_row += s.b01;
        }
    }

    /// Bresenham line, clipped per pixel, no depth test.
    pub fn draw_line<S: PixelSink + ?Sized>(
        &mut self,
        sink: &mut S,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Rgb565,
    ) {
        let (clip_w, clip_h) = self.clip_size(sink);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            if x >= 0 && x < clip_w as i32 && y >= 0 && y < clip_h as i32 {
                sink.put_pixel(x as usize, y as usize, color);
                self.stats.pixels_written += 1;
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Drawable area: the overlap of the depth buffer and the sink.
    fn clip_size<S: PixelSink + ?Sized>(&self, sink: &S) -> (usize, usize) {
        (self.width.min(sink.width()), self.height.min(sink.height()))
    }
}
