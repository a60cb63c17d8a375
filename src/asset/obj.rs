//! Wavefront OBJ import
//!
//! Supports `v`, `vt`, `vn` and `f`. Every face corner becomes its own
//! vertex (no sharing), quads are split along the 0-2 diagonal, and
//! texture v is flipped so row 0 of the texture is the top.

use crate::rasterizer::{Vec2, Vec3};
use crate::store::Vertex;
use super::AssetError;

/// Triangle list ready for `MeshStore::load_static`.
#[derive(Debug, Clone, Default)]
pub struct ObjMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

/// Parse OBJ text.
pub fn parse_obj(contents: &str) -> Result<ObjMesh, AssetError> {
    if contents.trim().is_empty() {
        return Err(AssetError::Empty);
    }

    let mut positions: Vec<Vec3> = Vec::new();
    let mut tex_coords: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut mesh = ObjMesh::default();

    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&parts, line_num)?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&parts, line_num)?;
                tex_coords.push(Vec2::new(u, 1.0 - v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&parts, line_num)?;
                normals.push(Vec3::new(x, y, z).normalize());
            }
            "f" => {
                let mut corners = [Vertex::default(); 4];
                let mut count = 0;
                for token in parts.iter().skip(1).take(4) {
                    let (vi, ti, ni) = parse_face_corner(token, line_num)?;
                    if vi == 0 {
                        break;
                    }
                    corners[count] = Vertex {
                        position: resolve(&positions, vi).unwrap_or(Vec3::ZERO),
                        texcoord: resolve(&tex_coords, ti).unwrap_or_default(),
                        normal: resolve(&normals, ni).unwrap_or(Vec3::UP),
                    };
                    count += 1;
                }
                if count < 3 {
                    continue;
                }

                let base = mesh.vertices.len();
                if base + count > u16::MAX as usize + 1 {
                    return Err(AssetError::TooManyVertices(base + count));
                }
                mesh.vertices.extend_from_slice(&corners[..count]);

                let b = base as u16;
                mesh.indices.extend_from_slice(&[b, b + 1, b + 2]);
                if count == 4 {
                    mesh.indices.extend_from_slice(&[b, b + 2, b + 3]);
                }
            }
            _ => {}
        }
    }

    if mesh.indices.is_empty() {
        return Err(AssetError::NoGeometry);
    }
    Ok(mesh)
}

/// 1-based index; negative counts back from the end; 0 means absent.
fn resolve<T: Copy>(items: &[T], index: i32) -> Option<T> {
    let i = if index > 0 {
        index as i64 - 1
    } else if index < 0 {
        items.len() as i64 + index as i64
    } else {
        return None;
    };
    if i < 0 {
        return None;
    }
    items.get(i as usize).copied()
}

fn parse_floats<const N: usize>(parts: &[&str], line_num: usize) -> Result<[f32; N], AssetError> {
    if parts.len() < N + 1 {
        return Err(AssetError::Parse {
            line: line_num + 1,
            msg: format!("expected {} values after '{}'", N, parts[0]),
        });
    }
    let mut out = [0.0; N];
    for (slot, s) in out.iter_mut().zip(&parts[1..]) {
        *slot = s.parse::<f32>().map_err(|_| AssetError::Parse {
            line: line_num + 1,
            msg: format!("invalid float '{}'", s),
        })?;
    }
    Ok(out)
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`. Missing parts are 0.
fn parse_face_corner(token: &str, line_num: usize) -> Result<(i32, i32, i32), AssetError> {
    let mut fields = token.split('/');
    let mut next = || -> Result<i32, AssetError> {
        match fields.next() {
            None | Some("") => Ok(0),
            Some(s) => s.parse::<i32>().map_err(|_| AssetError::Parse {
                line: line_num + 1,
                msg: format!("invalid face index '{}'", token),
            }),
        }
    };
    let v = next()?;
    let vt = next()?;
    let vn = next()?;
    Ok((v, vt, vn))
}
