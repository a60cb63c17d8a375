//! BMP texture import
//!
//! Headers are validated by hand first (magic, dimensions, depth, section
//! bounds) so nothing oversized reaches the decoder or the pixel pool.
//! Pixel decoding itself goes through the `image` crate.

use image::ImageFormat;

use crate::rasterizer::Rgb565;
use super::{read_i32, read_u16, read_u32, AssetError};

const FILE_HEADER_SIZE: usize = 14;
const INFO_HEADER_SIZE: usize = 40;
const BMP_MAGIC: u16 = 0x4D42; // "BM"

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;

/// Decoded RGB565 image, rows top to bottom.
#[derive(Debug, Clone)]
pub struct Image565 {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgb565>,
}

/// Header fields the validation cares about.
#[derive(Debug, Clone, Copy)]
struct BmpInfo {
    width: u32,
    height: u32,
    bpp: u16,
    pixel_offset: usize,
}

fn read_info(bytes: &[u8], max_dim: u32) -> Result<BmpInfo, AssetError> {
    if bytes.is_empty() {
        return Err(AssetError::Empty);
    }
    let min = FILE_HEADER_SIZE + INFO_HEADER_SIZE;
    if bytes.len() < min {
        return Err(AssetError::Truncated { needed: min, len: bytes.len() });
    }

    let magic = read_u16(bytes, 0)?;
    if magic != BMP_MAGIC {
        return Err(AssetError::BadMagic { found: magic as u32 });
    }
    let pixel_offset = read_u32(bytes, 10)? as usize;
    let info_size = read_u32(bytes, 14)? as usize;
    if info_size < INFO_HEADER_SIZE {
        return Err(AssetError::InvalidHeader("info header too small"));
    }

    let width = read_i32(bytes, 18)?;
    let raw_height = read_i32(bytes, 22)?;
    let height = (raw_height as i64).abs();
    if width <= 0 || height == 0 || width as i64 > max_dim as i64 || height > max_dim as i64 {
        return Err(AssetError::InvalidDimensions { width: width as i64, height: raw_height as i64 });
    }

    let bpp = read_u16(bytes, 28)?;
    let compression = read_u32(bytes, 30)?;
    let row_size = match bpp {
        8 => (width as usize + 3) & !3,
        24 => (width as usize * 3 + 3) & !3,
        32 => width as usize * 4,
        other => return Err(AssetError::UnsupportedDepth(other)),
    };
    let compression_ok = compression == BI_RGB || (bpp == 32 && compression == BI_BITFIELDS);
    if !compression_ok {
        return Err(AssetError::UnsupportedCompression(compression));
    }

    if bpp == 8 {
        // Palette of BGRx entries right after the info header
        let palette_start = FILE_HEADER_SIZE + info_size;
        if palette_start + 4 > pixel_offset {
            return Err(AssetError::InvalidHeader("8-bit image without a palette"));
        }
        // 0 means "up to 256"; an explicit count must fit before the pixels
        let colors_used = read_u32(bytes, 46)? as usize;
        if colors_used > 256 {
            return Err(AssetError::InvalidHeader("palette larger than 256 entries"));
        }
        if palette_start + colors_used * 4 > pixel_offset {
            return Err(AssetError::InvalidHeader("palette truncated"));
        }
    }

    let needed = pixel_offset + row_size * height as usize;
    if needed > bytes.len() {
        return Err(AssetError::Truncated { needed, len: bytes.len() });
    }

    Ok(BmpInfo {
        width: width as u32,
        height: height as u32,
        bpp,
        pixel_offset,
    })
}

/// Decode an uncompressed 8/24/32-bit BMP into RGB565.
///
/// Bottom-up and top-down (negative height) files both come out top-down.
pub fn decode_bmp(bytes: &[u8], max_dim: u32) -> Result<Image565, AssetError> {
    let info = read_info(bytes, max_dim)?;

    let rgb = image::load_from_memory_with_format(bytes, ImageFormat::Bmp)?.to_rgb8();
    if rgb.width() != info.width || rgb.height() != info.height {
        return Err(AssetError::InvalidHeader("decoded size does not match header"));
    }

    let pixels = rgb
        .pixels()
        .map(|p| Rgb565::from_rgb888(p[0], p[1], p[2]))
        .collect();

    log::debug!(
        "decoded BMP {}x{} @ {}bpp (data at {})",
        info.width,
        info.height,
        info.bpp,
        info.pixel_offset
    );

    Ok(Image565 {
        width: info.width,
        height: info.height,
        pixels,
    })
}

/// Build BMP bytes in memory. Shared by tests across the crate.
#[cfg(test)]
pub(crate) mod test_data {
    /// 14-byte file header plus 40-byte info header.
    fn headers(width: usize, height: i32, bpp: u16, compression: u32, offset: usize, data_size: usize, colors_used: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(offset + data_size);
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&((offset + data_size) as u32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&(offset as u32).to_le_bytes());

        out.extend_from_slice(&40u32.to_le_bytes());
        out.extend_from_slice(&(width as i32).to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&bpp.to_le_bytes());
        out.extend_from_slice(&compression.to_le_bytes());
        out.extend_from_slice(&(data_size as u32).to_le_bytes());
        out.extend_from_slice(&2835i32.to_le_bytes());
        out.extend_from_slice(&2835i32.to_le_bytes());
        out.extend_from_slice(&colors_used.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    /// 24-bit image from top-down rows of (r, g, b). `top_down` selects
    /// the negative-height layout.
    pub fn bmp24(width: usize, rows: &[Vec<(u8, u8, u8)>], top_down: bool) -> Vec<u8> {
        let height = rows.len();
        let row_size = (width * 3 + 3) & !3;
        let h = if top_down { -(height as i32) } else { height as i32 };
        let mut out = headers(width, h, 24, 0, 54, row_size * height, 0);

        let ordered: Vec<&Vec<(u8, u8, u8)>> = if top_down {
            rows.iter().collect()
        } else {
            rows.iter().rev().collect()
        };
        for row in ordered {
            let start = out.len();
            for &(r, g, b) in row {
                out.extend_from_slice(&[b, g, r]);
            }
            out.resize(start + row_size, 0);
        }
        out
    }

    /// Bottom-up 8-bit palettized image from top-down rows of indices.
    pub fn bmp8(width: usize, palette: &[(u8, u8, u8)], rows: &[Vec<u8>]) -> Vec<u8> {
        let height = rows.len();
        let row_size = (width + 3) & !3;
        let offset = 54 + palette.len() * 4;
        let mut out = headers(width, height as i32, 8, 0, offset, row_size * height, palette.len() as u32);
        for &(r, g, b) in palette {
            out.extend_from_slice(&[b, g, r, 0]);
        }
        for row in rows.iter().rev() {
            let start = out.len();
            out.extend_from_slice(row);
            out.resize(start + row_size, 0);
        }
        out
    }

    /// Bottom-up 32-bit BI_RGB image from top-down rows of (r, g, b).
    pub fn bmp32(width: usize, rows: &[Vec<(u8, u8, u8)>]) -> Vec<u8> {
        let height = rows.len();
        let mut out = headers(width, height as i32, 32, 0, 54, width * 4 * height, 0);
        for row in rows.iter().rev() {
            for &(r, g, b) in row {
                out.extend_from_slice(&[b, g, r, 0xFF]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::test_data::{bmp24, bmp32, bmp8};
    use super::*;

    #[test]
    fn test_solid_red_bottom_up() {
        let red = vec![(255, 0, 0), (255, 0, 0)];
        let bytes = bmp24(2, &[red.clone(), red], false);
        let img = decode_bmp(&bytes, 1024).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        assert!(img.pixels.iter().all(|&p| p == Rgb565(0xF800)));
    }

    #[test]
    fn test_row_order_bottom_up_and_top_down() {
        let rows = vec![vec![(255, 0, 0)], vec![(0, 0, 255)]];
        for top_down in [false, true] {
            let img = decode_bmp(&bmp24(1, &rows, top_down), 1024).unwrap();
            assert_eq!(img.pixels[0], Rgb565::RED);
            assert_eq!(img.pixels[1], Rgb565::BLUE);
        }
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = bmp24(1, &[vec![(0, 0, 0)]], false);
        bytes[0] = b'X';
        assert!(matches!(decode_bmp(&bytes, 1024), Err(AssetError::BadMagic { .. })));
    }

    #[test]
    fn test_rejects_oversized_dimensions() {
        let bytes = bmp24(4, &[vec![(0, 0, 0); 4]], false);
        assert!(matches!(
            decode_bmp(&bytes, 2),
            Err(AssetError::InvalidDimensions { width: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_unsupported_depth() {
        let mut bytes = bmp24(1, &[vec![(0, 0, 0)]], false);
        bytes[28..30].copy_from_slice(&16u16.to_le_bytes());
        assert!(matches!(decode_bmp(&bytes, 1024), Err(AssetError::UnsupportedDepth(16))));
    }

    #[test]
    fn test_rejects_truncated_pixel_data() {
        let bytes = bmp24(2, &[vec![(0, 0, 0); 2], vec![(0, 0, 0); 2]], false);
        assert!(matches!(
            decode_bmp(&bytes[..bytes.len() - 4], 1024),
            Err(AssetError::Truncated { .. })
        ));
        assert!(matches!(decode_bmp(&bytes[..10], 1024), Err(AssetError::Truncated { .. })));
    }

    #[test]
    fn test_decode_8bpp_palette() {
        let palette = [(255, 0, 0), (0, 0, 255)];
        let bytes = bmp8(2, &palette, &[vec![1, 0], vec![0, 1]]);
        let img = decode_bmp(&bytes, 1024).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        assert_eq!(img.pixels, vec![Rgb565::BLUE, Rgb565::RED, Rgb565::RED, Rgb565::BLUE]);
    }

    #[test]
    fn test_decode_32bpp() {
        let red = vec![(255, 0, 0), (255, 0, 0)];
        let img = decode_bmp(&bmp32(2, &[red.clone(), red]), 1024).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        assert!(img.pixels.iter().all(|&p| p == Rgb565(0xF800)));
    }

    #[test]
    fn test_rejects_truncated_palette() {
        let palette = [(255, 0, 0), (0, 0, 255)];
        let rows = [vec![1, 0], vec![0, 1]];

        // Header claims four entries, only two sit before the pixels
        let mut bytes = bmp8(2, &palette, &rows);
        bytes[46..50].copy_from_slice(&4u32.to_le_bytes());
        assert!(matches!(decode_bmp(&bytes, 1024), Err(AssetError::InvalidHeader(_))));

        // Pixel data starts right after the info header
        let mut bytes = bmp8(2, &palette, &rows);
        bytes[10..14].copy_from_slice(&54u32.to_le_bytes());
        assert!(matches!(decode_bmp(&bytes, 1024), Err(AssetError::InvalidHeader(_))));

        // File ends inside the palette
        let bytes = bmp8(2, &palette, &rows);
        assert!(matches!(decode_bmp(&bytes[..58], 1024), Err(AssetError::Truncated { .. })));
    }
}
