//! Quake II MD2 model parsing
//!
//! Layout (all little-endian):
//! - 17 x i32 header: magic, version, skin size, frame size, element counts
//!   and section offsets
//! - texcoords: `i16 s, t`
//! - triangles: `u16 vertex[3], u16 texcoord[3]`
//! - frames: `f32 scale[3], f32 translate[3], char name[16]` followed by
//!   `u8 x, y, z, normal_index` per vertex, `frame_size` bytes apart

use crate::anim::CompressedVertex;
use crate::rasterizer::Vec3;
use super::{read_f32, read_i16, read_i32, read_u16, AssetError};

/// "IDP2" read as a little-endian i32
pub const MD2_MAGIC: i32 = 844_121_161;
pub const MD2_VERSION: i32 = 8;

const HEADER_SIZE: usize = 17 * 4;
const FRAME_HEADER_SIZE: usize = 40;
const TRIANGLE_SIZE: usize = 12;
const TEXCOORD_SIZE: usize = 4;

#[derive(Debug, Clone)]
pub struct Md2Frame {
    pub name: String,
    pub scale: Vec3,
    pub translate: Vec3,
    pub vertices: Vec<CompressedVertex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Md2Triangle {
    pub vertex: [u16; 3],
    pub texcoord: [u16; 3],
}

/// A fully validated MD2 model; every index is known to be in range.
#[derive(Debug, Clone)]
pub struct Md2Model {
    pub skin_width: u32,
    pub skin_height: u32,
    pub verts_per_frame: u32,
    pub texcoords: Vec<[i16; 2]>,
    pub triangles: Vec<Md2Triangle>,
    pub frames: Vec<Md2Frame>,
}

impl Md2Model {
    /// Texture coordinate in [0, 1] for a texcoord index.
    pub fn uv(&self, texcoord: u16) -> (f32, f32) {
        let [s, t] = self.texcoords[texcoord as usize];
        (
            s as f32 / self.skin_width as f32,
            t as f32 / self.skin_height as f32,
        )
    }
}

struct Header {
    skin_width: i32,
    skin_height: i32,
    frame_size: i32,
    num_vertices: i32,
    num_texcoords: i32,
    num_triangles: i32,
    num_frames: i32,
    offset_texcoords: i32,
    offset_triangles: i32,
    offset_frames: i32,
}

fn read_header(bytes: &[u8]) -> Result<Header, AssetError> {
    if bytes.is_empty() {
        return Err(AssetError::Empty);
    }
    if bytes.len() < HEADER_SIZE {
        return Err(AssetError::Truncated { needed: HEADER_SIZE, len: bytes.len() });
    }
    let field = |i: usize| read_i32(bytes, i * 4);

    let magic = field(0)?;
    if magic != MD2_MAGIC {
        return Err(AssetError::BadMagic { found: magic as u32 });
    }
    let version = field(1)?;
    if version != MD2_VERSION {
        return Err(AssetError::UnsupportedVersion(version));
    }

    Ok(Header {
        skin_width: field(2)?,
        skin_height: field(3)?,
        frame_size: field(4)?,
        num_vertices: field(6)?,
        num_texcoords: field(7)?,
        num_triangles: field(8)?,
        num_frames: field(10)?,
        offset_texcoords: field(12)?,
        offset_triangles: field(13)?,
        offset_frames: field(14)?,
    })
}

/// Check that `count` records of `size` bytes at `offset` fit in the buffer.
fn check_section(len: usize, offset: i32, count: usize, size: usize) -> Result<usize, AssetError> {
    if offset < 0 {
        return Err(AssetError::InvalidHeader("negative section offset"));
    }
    let start = offset as usize;
    let needed = count
        .checked_mul(size)
        .and_then(|n| n.checked_add(start))
        .ok_or(AssetError::InvalidHeader("section size overflows"))?;
    if needed > len {
        return Err(AssetError::Truncated { needed, len });
    }
    Ok(start)
}

/// Parse and validate an MD2 file. `max_frames` is the per-model ceiling.
pub fn parse_md2(bytes: &[u8], max_frames: u32) -> Result<Md2Model, AssetError> {
    let h = read_header(bytes)?;

    if h.skin_width <= 0 || h.skin_height <= 0 {
        return Err(AssetError::InvalidHeader("skin size must be positive"));
    }
    if h.num_vertices <= 0 || h.num_triangles <= 0 || h.num_frames <= 0 || h.num_texcoords < 0 {
        return Err(AssetError::InvalidHeader("element counts must be positive"));
    }
    if h.num_frames as u32 > max_frames {
        return Err(AssetError::InvalidHeader("too many frames"));
    }
    if h.num_vertices > u16::MAX as i32 + 1 {
        return Err(AssetError::TooManyVertices(h.num_vertices as usize));
    }

    let num_vertices = h.num_vertices as usize;
    let num_texcoords = h.num_texcoords as usize;
    let num_triangles = h.num_triangles as usize;
    let num_frames = h.num_frames as usize;

    if h.frame_size < 0 || (h.frame_size as usize) < FRAME_HEADER_SIZE + num_vertices * 4 {
        return Err(AssetError::InvalidHeader("frame size smaller than frame data"));
    }
    let frame_size = h.frame_size as usize;

    let tc_start = check_section(bytes.len(), h.offset_texcoords, num_texcoords, TEXCOORD_SIZE)?;
    let tri_start = check_section(bytes.len(), h.offset_triangles, num_triangles, TRIANGLE_SIZE)?;
    let frame_start = check_section(bytes.len(), h.offset_frames, num_frames, frame_size)?;

    let mut texcoords = Vec::with_capacity(num_texcoords);
    for i in 0..num_texcoords {
        let at = tc_start + i * TEXCOORD_SIZE;
        texcoords.push([read_i16(bytes, at)?, read_i16(bytes, at + 2)?]);
    }

    let mut triangles = Vec::with_capacity(num_triangles);
    for i in 0..num_triangles {
        let at = tri_start + i * TRIANGLE_SIZE;
        let mut tri = Md2Triangle { vertex: [0; 3], texcoord: [0; 3] };
        for j in 0..3 {
            tri.vertex[j] = read_u16(bytes, at + j * 2)?;
            tri.texcoord[j] = read_u16(bytes, at + 6 + j * 2)?;
            if tri.vertex[j] as usize >= num_vertices {
                return Err(AssetError::IndexOutOfRange {
                    what: "vertex",
                    index: tri.vertex[j] as u32,
                    count: num_vertices as u32,
                });
            }
            if tri.texcoord[j] as usize >= num_texcoords {
                return Err(AssetError::IndexOutOfRange {
                    what: "texcoord",
                    index: tri.texcoord[j] as u32,
                    count: num_texcoords as u32,
                });
            }
        }
        triangles.push(tri);
    }

    let mut frames = Vec::with_capacity(num_frames);
    for f in 0..num_frames {
        let at = frame_start + f * frame_size;
        let scale = Vec3::new(read_f32(bytes, at)?, read_f32(bytes, at + 4)?, read_f32(bytes, at + 8)?);
        let translate = Vec3::new(
            read_f32(bytes, at + 12)?,
            read_f32(bytes, at + 16)?,
            read_f32(bytes, at + 20)?,
        );
        let name_bytes = &bytes[at + 24..at + 40];
        let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(16);
        let name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();

        let vert_base = at + FRAME_HEADER_SIZE;
        let vertices = bytes[vert_base..vert_base + num_vertices * 4]
            .chunks_exact(4)
            .map(|c| CompressedVertex::new(c[0], c[1], c[2], c[3]))
            .collect();

        frames.push(Md2Frame { name, scale, translate, vertices });
    }

    log::debug!(
        "parsed MD2: {} frames, {} verts/frame, {} triangles",
        num_frames,
        num_vertices,
        num_triangles
    );

    Ok(Md2Model {
        skin_width: h.skin_width as u32,
        skin_height: h.skin_height as u32,
        verts_per_frame: num_vertices as u32,
        texcoords,
        triangles,
        frames,
    })
}

/// Build MD2 bytes in memory. Shared by tests across the crate.
#[cfg(test)]
pub(crate) mod test_data {
    use super::*;

    pub struct Md2Builder {
        pub skin: (i32, i32),
        pub texcoords: Vec<[i16; 2]>,
        pub triangles: Vec<Md2Triangle>,
        /// (scale, translate, vertices)
        pub frames: Vec<([f32; 3], [f32; 3], Vec<[u8; 4]>)>,
        pub version: i32,
    }

    impl Md2Builder {
        /// One triangle, `frame_count` frames; frame `f` moves vertex 0 by `f` on x.
        pub fn triangle(frame_count: usize) -> Self {
            let frames = (0..frame_count)
                .map(|f| {
                    (
                        [1.0, 1.0, 1.0],
                        [0.0, 0.0, 0.0],
                        vec![[f as u8, 0, 0, 32], [10, 0, 0, 32], [0, 10, 0, 32]],
                    )
                })
                .collect();
            Self {
                skin: (64, 32),
                texcoords: vec![[0, 0], [64, 0], [0, 32]],
                triangles: vec![Md2Triangle { vertex: [0, 1, 2], texcoord: [0, 1, 2] }],
                frames,
                version: MD2_VERSION,
            }
        }

        pub fn build(&self) -> Vec<u8> {
            let num_vertices = self.frames.first().map(|f| f.2.len()).unwrap_or(0);
            let frame_size = FRAME_HEADER_SIZE + num_vertices * 4;
            let offset_texcoords = HEADER_SIZE;
            let offset_triangles = offset_texcoords + self.texcoords.len() * TEXCOORD_SIZE;
            let offset_frames = offset_triangles + self.triangles.len() * TRIANGLE_SIZE;
            let offset_end = offset_frames + self.frames.len() * frame_size;

            let header = [
                MD2_MAGIC,
                self.version,
                self.skin.0,
                self.skin.1,
                frame_size as i32,
                0,
                num_vertices as i32,
                self.texcoords.len() as i32,
                self.triangles.len() as i32,
                0,
                self.frames.len() as i32,
                offset_end as i32,
                offset_texcoords as i32,
                offset_triangles as i32,
                offset_frames as i32,
                offset_end as i32,
                offset_end as i32,
            ];

            let mut out = Vec::with_capacity(offset_end);
            for v in header {
                out.extend_from_slice(&v.to_le_bytes());
            }
            for [s, t] in &self.texcoords {
                out.extend_from_slice(&s.to_le_bytes());
                out.extend_from_slice(&t.to_le_bytes());
            }
            for tri in &self.triangles {
                for v in tri.vertex {
                    out.extend_from_slice(&v.to_le_bytes());
                }
                for t in tri.texcoord {
                    out.extend_from_slice(&t.to_le_bytes());
                }
            }
            for (i, (scale, translate, verts)) in self.frames.iter().enumerate() {
                for v in scale.iter().chain(translate.iter()) {
                    out.extend_from_slice(&v.to_le_bytes());
                }
                let mut name = [0u8; 16];
                let label = format!("frame{}", i);
                name[..label.len()].copy_from_slice(label.as_bytes());
                out.extend_from_slice(&name);
                for v in verts {
                    out.extend_from_slice(v);
                }
            }
            out
        }
    }
}
