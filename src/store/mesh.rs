//! Mesh storage
//!
//! Static meshes keep their vertices and indices in the shared vertex and
//! index pools. Animated (MD2) meshes keep one `AnimationFrame` per keyframe,
//! each pointing at its compressed vertices, plus a UV array expanded per
//! triangle corner so it lines up with the index buffer.

use crate::anim::{AnimatedVertex, AnimationFrame, CompressedVertex};
use crate::asset::{parse_md2, parse_obj, Md2Model};
use crate::config::PoolLimits;
use crate::rasterizer::{Vec2, Vec3};
use super::pool::{PoolAllocator, Span};
use super::{find_free_slot, MeshHandle, StoreError, Vertex};

/// Largest vertex count a `u16` index buffer can address.
const MAX_INDEXED_VERTICES: usize = u16::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticMesh {
    pub vertices: Span,
    pub indices: Span,
    pub bounds_center: Vec3,
    pub bounds_radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedMesh {
    pub frames: Span,
    pub indices: Span,
    /// One UV per index, same order as `indices`
    pub uvs: Span,
    pub verts_per_frame: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshSlot {
    Static(StaticMesh),
    Animated(AnimatedMesh),
}

impl MeshSlot {
    pub fn indices(&self) -> Span {
        match self {
            MeshSlot::Static(m) => m.indices,
            MeshSlot::Animated(m) => m.indices,
        }
    }

    pub fn triangle_count(&self) -> u32 {
        self.indices().count / 3
    }
}

/// Occupancy snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStoreStats {
    pub static_meshes: u32,
    pub animated_meshes: u32,
    pub vertices_used: u32,
    pub vertices_capacity: u32,
    pub indices_used: u32,
    pub indices_capacity: u32,
    pub frames_used: u32,
    pub compressed_used: u32,
    pub uvs_used: u32,
}

pub struct MeshStore {
    slots: Vec<Option<MeshSlot>>,
    vertices: PoolAllocator<Vertex>,
    indices: PoolAllocator<u16>,
    frames: PoolAllocator<AnimationFrame>,
    compressed: PoolAllocator<CompressedVertex>,
    uvs: PoolAllocator<Vec2>,
    max_frames_per_model: u32,
}

impl MeshStore {
    pub fn new(limits: &PoolLimits) -> Self {
        Self {
            slots: vec![None; limits.max_meshes as usize],
            vertices: PoolAllocator::new("vertex", limits.max_vertices),
            indices: PoolAllocator::new("index", limits.max_indices),
            frames: PoolAllocator::new("frame", limits.max_frames),
            compressed: PoolAllocator::new("compressed vertex", limits.max_compressed_vertices),
            uvs: PoolAllocator::new("uv", limits.max_uvs),
            max_frames_per_model: limits.max_frames_per_model,
        }
    }

    // ========================================================================
    // Procedural meshes
    // ========================================================================

    /// Axis-aligned cube centered on the origin, 4 vertices per face.
    pub fn create_cube(&mut self, size: f32) -> Result<MeshHandle, StoreError> {
        let h = size * 0.5;
        // (normal, four corners) per face, CCW seen from outside
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            (
                Vec3::new(0.0, 0.0, 1.0),
                [Vec3::new(-h, -h, h), Vec3::new(h, -h, h), Vec3::new(h, h, h), Vec3::new(-h, h, h)],
            ),
            (
                Vec3::new(0.0, 0.0, -1.0),
                [Vec3::new(h, -h, -h), Vec3::new(-h, -h, -h), Vec3::new(-h, h, -h), Vec3::new(h, h, -h)],
            ),
            (
                Vec3::new(0.0, 1.0, 0.0),
                [Vec3::new(-h, h, h), Vec3::new(h, h, h), Vec3::new(h, h, -h), Vec3::new(-h, h, -h)],
            ),
            (
                Vec3::new(0.0, -1.0, 0.0),
                [Vec3::new(-h, -h, -h), Vec3::new(h, -h, -h), Vec3::new(h, -h, h), Vec3::new(-h, -h, h)],
            ),
            (
                Vec3::new(1.0, 0.0, 0.0),
                [Vec3::new(h, -h, h), Vec3::new(h, -h, -h), Vec3::new(h, h, -h), Vec3::new(h, h, h)],
            ),
            (
                Vec3::new(-1.0, 0.0, 0.0),
                [Vec3::new(-h, -h, -h), Vec3::new(-h, -h, h), Vec3::new(-h, h, h), Vec3::new(-h, h, -h)],
            ),
        ];
        let face_uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        let mut vertices = [Vertex::default(); 24];
        let mut indices = [0u16; 36];
        for (f, (normal, corners)) in faces.iter().enumerate() {
            for (c, corner) in corners.iter().enumerate() {
                vertices[f * 4 + c] = Vertex::new(*corner, *normal, face_uvs[c]);
            }
            let base = (f * 4) as u16;
            indices[f * 6..f * 6 + 6]
                .copy_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        self.load_static(&vertices, &indices)
    }

    /// Flat quad in the XZ plane facing +Y.
    pub fn create_plane(&mut self, width: f32, height: f32) -> Result<MeshHandle, StoreError> {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let up = Vec3::UP;
        let vertices = [
            Vertex::new(Vec3::new(-hw, 0.0, -hh), up, Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::new(hw, 0.0, -hh), up, Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::new(hw, 0.0, hh), up, Vec2::new(1.0, 1.0)),
            Vertex::new(Vec3::new(-hw, 0.0, hh), up, Vec2::new(0.0, 1.0)),
        ];
        let indices = [0, 2, 1, 0, 3, 2];

        let handle = self.load_static(&vertices, &indices)?;
        if let Some(Some(MeshSlot::Static(mesh))) = self.slots.get_mut(handle.0 as usize) {
            mesh.bounds_radius = hw.max(hh);
        }
        Ok(handle)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Copy a validated triangle list into the pools.
    ///
    /// Vertices are allocated before indices; if the index allocation fails
    /// the vertex range stays consumed until `reset`.
    pub fn load_static(&mut self, vertices: &[Vertex], indices: &[u16]) -> Result<MeshHandle, StoreError> {
        self.load_static_inner(vertices, indices).inspect_err(|e| {
            log::warn!("static mesh rejected: {}", e);
        })
    }

    fn load_static_inner(&mut self, vertices: &[Vertex], indices: &[u16]) -> Result<MeshHandle, StoreError> {
        if vertices.is_empty() {
            return Err(StoreError::EmptyMesh);
        }
        if indices.len() % 3 != 0 {
            return Err(StoreError::PartialTriangle(indices.len()));
        }
        if vertices.len() > MAX_INDEXED_VERTICES {
            return Err(StoreError::TooManyVertices(vertices.len()));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(StoreError::IndexOutOfRange {
                index: bad as u32,
                count: vertices.len() as u32,
            });
        }

        let slot = find_free_slot(&self.slots, "mesh")?;
        let vertex_span = self.vertices.push_slice(vertices)?;
        let index_span = self.indices.push_slice(indices)?;

        let (min, max) = vertices.iter().fold(
            (vertices[0].position, vertices[0].position),
            |(lo, hi), v| (lo.min(v.position), hi.max(v.position)),
        );
        let center = (min + max).scale(0.5);

        self.slots[slot] = Some(MeshSlot::Static(StaticMesh {
            vertices: vertex_span,
            indices: index_span,
            bounds_center: center,
            bounds_radius: max.distance(center),
        }));
        log::debug!(
            "static mesh {}: {} vertices, {} triangles",
            slot,
            vertices.len(),
            indices.len() / 3
        );
        Ok(MeshHandle(slot as u32))
    }

    /// Copy a parsed MD2 model into the animation pools.
    ///
    /// Triangle corners are stored as (0, 2, 1) to turn MD2's clockwise
    /// front faces into counter-clockwise ones; the UVs follow the same order.
    pub fn load_animated(&mut self, model: &Md2Model) -> Result<MeshHandle, StoreError> {
        self.load_animated_inner(model).inspect_err(|e| {
            log::warn!("animated mesh rejected: {}", e);
        })
    }

    fn load_animated_inner(&mut self, model: &Md2Model) -> Result<MeshHandle, StoreError> {
        let frame_count = model.frames.len();
        if frame_count > self.max_frames_per_model as usize {
            return Err(StoreError::TooManyFrames {
                count: frame_count,
                limit: self.max_frames_per_model,
            });
        }
        if frame_count == 0 || model.triangles.is_empty() || model.verts_per_frame == 0 {
            return Err(StoreError::EmptyMesh);
        }
        if model.verts_per_frame as usize > MAX_INDEXED_VERTICES {
            return Err(StoreError::TooManyVertices(model.verts_per_frame as usize));
        }
        for (i, frame) in model.frames.iter().enumerate() {
            if frame.vertices.len() != model.verts_per_frame as usize {
                return Err(StoreError::FrameSizeMismatch {
                    frame: i,
                    expected: model.verts_per_frame,
                    actual: frame.vertices.len(),
                });
            }
        }
        for tri in &model.triangles {
            if let Some(&v) = tri.vertex.iter().find(|&&v| v as u32 >= model.verts_per_frame) {
                return Err(StoreError::IndexOutOfRange {
                    index: v as u32,
                    count: model.verts_per_frame,
                });
            }
            if let Some(&t) = tri.texcoord.iter().find(|&&t| t as usize >= model.texcoords.len()) {
                return Err(StoreError::IndexOutOfRange {
                    index: t as u32,
                    count: model.texcoords.len() as u32,
                });
            }
        }

        let slot = find_free_slot(&self.slots, "mesh")?;
        let corner_count = (model.triangles.len() * 3) as u32;

        let uv_span = self.uvs.allocate(corner_count)?;
        for (out, tri) in self.uvs.slice_mut(uv_span).chunks_exact_mut(3).zip(&model.triangles) {
            for (dst, src) in out.iter_mut().zip([0usize, 2, 1]) {
                let (u, v) = model.uv(tri.texcoord[src]);
                *dst = Vec2::new(u, v);
            }
        }

        let index_span = self.indices.allocate(corner_count)?;
        for (out, tri) in self.indices.slice_mut(index_span).chunks_exact_mut(3).zip(&model.triangles) {
            out.copy_from_slice(&[tri.vertex[0], tri.vertex[2], tri.vertex[1]]);
        }

        let frame_span = self.frames.allocate(frame_count as u32)?;
        for (i, frame) in model.frames.iter().enumerate() {
            let vertices = self.compressed.push_slice(&frame.vertices)?;
            self.frames.slice_mut(frame_span)[i] = AnimationFrame {
                scale: frame.scale,
                translate: frame.translate,
                vertices,
            };
        }

        self.slots[slot] = Some(MeshSlot::Animated(AnimatedMesh {
            frames: frame_span,
            indices: index_span,
            uvs: uv_span,
            verts_per_frame: model.verts_per_frame,
        }));
        log::debug!(
            "animated mesh {}: {} frames x {} vertices, {} triangles",
            slot,
            frame_count,
            model.verts_per_frame,
            model.triangles.len()
        );
        Ok(MeshHandle(slot as u32))
    }

    /// Parse OBJ text and load it as a static mesh.
    pub fn load_obj(&mut self, contents: &str) -> Result<MeshHandle, StoreError> {
        let mesh = parse_obj(contents).inspect_err(|e| log::warn!("OBJ rejected: {}", e))?;
        self.load_static(&mesh.vertices, &mesh.indices)
    }

    /// Parse MD2 bytes and load them as an animated mesh.
    pub fn load_md2(&mut self, bytes: &[u8]) -> Result<MeshHandle, StoreError> {
        let model = parse_md2(bytes, self.max_frames_per_model)
            .inspect_err(|e| log::warn!("MD2 rejected: {}", e))?;
        self.load_animated(&model)
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn get(&self, handle: MeshHandle) -> Option<&MeshSlot> {
        self.slots.get(handle.0 as usize)?.as_ref()
    }

    pub fn vertices(&self, mesh: &StaticMesh) -> &[Vertex] {
        self.vertices.slice(mesh.vertices)
    }

    pub fn indices(&self, span: Span) -> &[u16] {
        self.indices.slice(span)
    }

    pub fn frames(&self, mesh: &AnimatedMesh) -> &[AnimationFrame] {
        self.frames.slice(mesh.frames)
    }

    pub fn compressed(&self, frame: &AnimationFrame) -> &[CompressedVertex] {
        self.compressed.slice(frame.vertices)
    }

    pub fn uvs(&self, mesh: &AnimatedMesh) -> &[Vec2] {
        self.uvs.slice(mesh.uvs)
    }

    /// Keyframe count of an animated mesh, 0 for anything else.
    pub fn frame_count(&self, handle: MeshHandle) -> u32 {
        match self.get(handle) {
            Some(MeshSlot::Animated(m)) => m.frames.count,
            _ => 0,
        }
    }

    /// One vertex blended between two keyframes. Frame indices are clamped
    /// to the model's range.
    pub fn interpolated_vertex(
        &self,
        handle: MeshHandle,
        vertex: u32,
        frame_a: u32,
        frame_b: u32,
        t: f32,
    ) -> Option<AnimatedVertex> {
        let Some(MeshSlot::Animated(mesh)) = self.get(handle) else {
            return None;
        };
        let frames = self.frames(mesh);
        let last = frames.len().checked_sub(1)?;
        let fa = frames[(frame_a as usize).min(last)];
        let fb = frames[(frame_b as usize).min(last)];
        let va = *self.compressed(&fa).get(vertex as usize)?;
        let vb = *self.compressed(&fb).get(vertex as usize)?;
        Some(crate::anim::interpolate(&fa, va, &fb, vb, t))
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    /// Release the slot. Pool storage is not reclaimed.
    pub fn free(&mut self, handle: MeshHandle) -> bool {
        self.slots
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
            .is_some()
    }

    pub fn free_vertex_count(&self) -> u32 {
        self.vertices.remaining()
    }

    pub fn free_index_count(&self) -> u32 {
        self.indices.remaining()
    }

    pub fn stats(&self) -> MeshStoreStats {
        let mut stats = MeshStoreStats {
            vertices_used: self.vertices.used(),
            vertices_capacity: self.vertices.capacity(),
            indices_used: self.indices.used(),
            indices_capacity: self.indices.capacity(),
            frames_used: self.frames.used(),
            compressed_used: self.compressed.used(),
            uvs_used: self.uvs.used(),
            ..Default::default()
        };
        for slot in self.slots.iter().flatten() {
            match slot {
                MeshSlot::Static(_) => stats.static_meshes += 1,
                MeshSlot::Animated(_) => stats.animated_meshes += 1,
            }
        }
        stats
    }

    /// Drop every mesh and rewind all pools.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.vertices.reset();
        self.indices.reset();
        self.frames.reset();
        self.compressed.reset();
        self.uvs.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::md2::test_data::Md2Builder;

    fn store() -> MeshStore {
        MeshStore::new(&PoolLimits::default())
    }

    fn small_store(max_vertices: u32, max_indices: u32) -> MeshStore {
        MeshStore::new(&PoolLimits {
            max_vertices,
            max_indices,
            ..PoolLimits::default()
        })
    }

    fn static_mesh(store: &MeshStore, handle: MeshHandle) -> StaticMesh {
        match store.get(handle) {
            Some(MeshSlot::Static(m)) => *m,
            other => panic!("expected static mesh, got {:?}", other),
        }
    }

    #[test]
    fn test_cube_extents_and_bounds() {
        let mut store = store();
        let handle = store.create_cube(2.0).unwrap();
        let mesh = static_mesh(&store, handle);
        assert_eq!(mesh.vertices.count, 24);
        assert_eq!(mesh.indices.count, 36);

        for v in store.vertices(&mesh) {
            for c in [v.position.x, v.position.y, v.position.z] {
                assert!((c.abs() - 1.0).abs() < 0.001);
            }
        }
        assert!(mesh.bounds_center.len() < 0.001);
        assert!((mesh.bounds_radius - 3.0f32.sqrt()).abs() < 0.001);
    }

    #[test]
    fn test_cube_faces_wind_counter_clockwise_outward() {
        let mut store = store();
        let handle = store.create_cube(1.0).unwrap();
        let mesh = static_mesh(&store, handle);
        let verts = store.vertices(&mesh);
        for tri in store.indices(mesh.indices).chunks_exact(3) {
            let [a, b, c] = [verts[tri[0] as usize], verts[tri[1] as usize], verts[tri[2] as usize]];
            let n = (b.position - a.position).cross(c.position - a.position);
            assert!(n.dot(a.normal) > 0.0);
        }
    }

    #[test]
    fn test_plane_layout() {
        let mut store = store();
        let handle = store.create_plane(4.0, 2.0).unwrap();
        let mesh = static_mesh(&store, handle);
        assert_eq!(store.indices(mesh.indices), &[0, 2, 1, 0, 3, 2]);
        assert!((mesh.bounds_radius - 2.0).abs() < 0.001);
        assert!(store.vertices(&mesh).iter().all(|v| v.normal == Vec3::UP));

        // Front face points up: winding (0, 2, 1) as stored is CCW from above
        let verts = store.vertices(&mesh);
        let n = (verts[2].position - verts[0].position).cross(verts[1].position - verts[0].position);
        assert!(n.y > 0.0);
    }

    #[test]
    fn test_load_static_validates_before_allocating() {
        let mut store = store();
        let tri = [Vertex::default(); 3];
        assert!(matches!(store.load_static(&[], &[]), Err(StoreError::EmptyMesh)));
        assert!(matches!(store.load_static(&tri, &[0, 1]), Err(StoreError::PartialTriangle(2))));
        assert!(matches!(
            store.load_static(&tri, &[0, 1, 3]),
            Err(StoreError::IndexOutOfRange { index: 3, count: 3 })
        ));
        assert_eq!(store.stats().vertices_used, 0);
    }

    #[test]
    fn test_load_static_bounds() {
        let mut store = store();
        let verts = [
            Vertex::new(Vec3::new(0.0, 0.0, 0.0), Vec3::UP, Vec2::default()),
            Vertex::new(Vec3::new(4.0, 0.0, 0.0), Vec3::UP, Vec2::default()),
            Vertex::new(Vec3::new(0.0, 2.0, 0.0), Vec3::UP, Vec2::default()),
        ];
        let handle = store.load_static(&verts, &[0, 1, 2]).unwrap();
        let mesh = static_mesh(&store, handle);
        assert_eq!(mesh.bounds_center, Vec3::new(2.0, 1.0, 0.0));
        assert!((mesh.bounds_radius - 5.0f32.sqrt()).abs() < 0.001);
    }

    #[test]
    fn test_vertex_exhaustion_keeps_earlier_allocations() {
        let mut store = small_store(40, 1000);
        store.create_cube(1.0).unwrap();
        assert!(matches!(store.create_cube(1.0), Err(StoreError::Pool(_))));
        assert_eq!(store.stats().vertices_used, 24);
        assert_eq!(store.free_vertex_count(), 16);
    }

    #[test]
    fn test_index_exhaustion_does_not_roll_back_vertices() {
        let mut store = small_store(1000, 40);
        store.create_cube(1.0).unwrap();
        assert!(store.create_cube(1.0).is_err());
        let stats = store.stats();
        assert_eq!(stats.vertices_used, 48);
        assert_eq!(stats.indices_used, 36);
        assert_eq!(stats.static_meshes, 1);
    }

    #[test]
    fn test_slot_table_full() {
        let mut store = MeshStore::new(&PoolLimits {
            max_meshes: 1,
            ..PoolLimits::default()
        });
        store.create_cube(1.0).unwrap();
        assert!(matches!(store.create_cube(1.0), Err(StoreError::SlotsFull(_))));
    }

    #[test]
    fn test_free_keeps_pool_storage() {
        let mut store = store();
        let a = store.create_cube(1.0).unwrap();
        assert!(store.free(a));
        assert!(!store.free(a));
        assert!(store.get(a).is_none());
        assert_eq!(store.stats().vertices_used, 24);

        // The slot is reused, the pool keeps growing
        let b = store.create_cube(1.0).unwrap();
        assert_eq!(b, a);
        assert_eq!(store.stats().vertices_used, 48);

        store.reset();
        assert_eq!(store.stats(), MeshStoreStats {
            vertices_capacity: 40_960,
            indices_capacity: 81_920,
            ..Default::default()
        });
    }

    #[test]
    fn test_load_obj() {
        let mut store = store();
        let handle = store.load_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(store.get(handle).map(MeshSlot::triangle_count), Some(1));
        assert!(matches!(store.load_obj("# nothing\n"), Err(StoreError::Asset(_))));
    }

    #[test]
    fn test_md2_corner_order_and_uvs() {
        let mut store = store();
        let handle = store.load_md2(&Md2Builder::triangle(2).build()).unwrap();
        let Some(MeshSlot::Animated(mesh)) = store.get(handle).copied() else {
            panic!("expected animated mesh");
        };
        assert_eq!(mesh.verts_per_frame, 3);
        assert_eq!(store.frame_count(handle), 2);
        assert_eq!(store.indices(mesh.indices), &[0, 2, 1]);

        let uvs = store.uvs(&mesh);
        assert_eq!(uvs[0], Vec2::new(0.0, 0.0));
        assert_eq!(uvs[1], Vec2::new(0.0, 1.0));
        assert_eq!(uvs[2], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_md2_frame_limit() {
        let mut store = MeshStore::new(&PoolLimits {
            max_frames_per_model: 2,
            ..PoolLimits::default()
        });
        assert!(store.load_md2(&Md2Builder::triangle(3).build()).is_err());
        assert_eq!(store.stats().frames_used, 0);
        assert!(store.load_md2(&Md2Builder::triangle(2).build()).is_ok());
    }

    #[test]
    fn test_interpolated_vertex_clamps_frames() {
        let mut store = store();
        let handle = store.load_md2(&Md2Builder::triangle(2).build()).unwrap();

        let v = store.interpolated_vertex(handle, 0, 0, 5, 0.5).unwrap();
        assert!((v.position.x - 0.5).abs() < 0.001);
        let end = store.interpolated_vertex(handle, 0, 9, 9, 0.0).unwrap();
        assert!((end.position.x - 1.0).abs() < 0.001);
        assert!((v.normal.len() - 1.0).abs() < 0.001);

        assert!(store.interpolated_vertex(handle, 3, 0, 1, 0.0).is_none());
        let cube = store.create_cube(1.0).unwrap();
        assert!(store.interpolated_vertex(cube, 0, 0, 1, 0.0).is_none());
        assert!(store.interpolated_vertex(MeshHandle::INVALID, 0, 0, 1, 0.0).is_none());
    }
}
