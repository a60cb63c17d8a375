//! Asset parsing
//!
//! Turns raw OBJ / MD2 / BMP bytes into validated in-memory arrays. Nothing
//! here touches the pools; the stores only ever receive data that has
//! already passed every bounds and format check.

pub mod bmp;
pub mod md2;
pub mod obj;

use thiserror::Error;

pub use bmp::{decode_bmp, Image565};
pub use md2::{parse_md2, Md2Frame, Md2Model, Md2Triangle};
pub use obj::{parse_obj, ObjMesh};

/// Why an asset was rejected.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("input is empty")]
    Empty,

    #[error("input truncated: needed {needed} bytes, have {len}")]
    Truncated { needed: usize, len: usize },

    #[error("line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("bad magic number {found:#x}")]
    BadMagic { found: u32 },

    #[error("unsupported version {0}")]
    UnsupportedVersion(i32),

    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("{what} index {index} out of range (count {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: u32,
        count: u32,
    },

    #[error("too many vertices for 16-bit indices: {0}")]
    TooManyVertices(usize),

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("unsupported bit depth {0}")]
    UnsupportedDepth(u16),

    #[error("unsupported compression {0}")]
    UnsupportedCompression(u32),

    #[error("no geometry")]
    NoGeometry,

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Little-endian cursor-free readers with bounds checks.
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, AssetError> {
    let b = field(bytes, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn read_i16(bytes: &[u8], offset: usize) -> Result<i16, AssetError> {
    let b = field(bytes, offset, 2)?;
    Ok(i16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, AssetError> {
    let b = field(bytes, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn read_i32(bytes: &[u8], offset: usize) -> Result<i32, AssetError> {
    let b = field(bytes, offset, 4)?;
    Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn read_f32(bytes: &[u8], offset: usize) -> Result<f32, AssetError> {
    read_u32(bytes, offset).map(f32::from_bits)
}

fn field(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], AssetError> {
    let needed = offset.checked_add(len).ok_or(AssetError::Truncated {
        needed: usize::MAX,
        len: bytes.len(),
    })?;
    bytes.get(offset..needed).ok_or(AssetError::Truncated {
        needed,
        len: bytes.len(),
    })
}
