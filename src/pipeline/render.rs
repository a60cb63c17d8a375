//! Scene rendering
//!
//! Walks visible mesh renderers, transforms their triangles and hands the
//! survivors to the rasterizer. Nothing here allocates.

use crate::rasterizer::{
    mat4_mul, signed_area, Mat4, PixelSink, Rasterizer, Rgb565, ScreenVertex, TextureView,
};
use crate::scene::{ComponentMask, MeshRenderer, World};
use crate::store::{AnimatedMesh, MeshSlot, MeshStore, StaticMesh, TextureStore};
use super::vertex::{light_intensity, transform_vertex};
use super::RenderContext;

/// Per-call counters for [`render_scene`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Mesh renderers that reached the triangle loop
    pub meshes: u32,
    /// Front-facing triangles handed to the rasterizer
    pub triangles: u32,
    /// Triangles with a vertex outside the near/NDC limits
    pub rejected: u32,
    pub backfacing: u32,
}

/// How a mesh's triangles are filled.
#[derive(Clone, Copy)]
enum Fill<'a> {
    Textured(TextureView<'a>),
    Solid(Rgb565),
}

/// Draw every active entity with a transform and a visible mesh renderer.
///
/// World matrices must already be resolved. Renderers whose mesh handle does
/// not resolve are skipped without counting.
pub fn render_scene<S: PixelSink + ?Sized>(
    world: &World,
    meshes: &MeshStore,
    textures: &TextureStore,
    ctx: &RenderContext,
    rasterizer: &mut Rasterizer,
    sink: &mut S,
) -> PipelineStats {
    let mut stats = PipelineStats::default();

    for id in world.iter_with(ComponentMask::TRANSFORM | ComponentMask::MESH_RENDERER) {
        let (Some(transform), Some(renderer)) = (world.transform(id), world.mesh_renderer(id)) else {
            continue;
        };
        if !renderer.visible {
            continue;
        }
        let Some(slot) = meshes.get(renderer.mesh) else {
            continue;
        };

        let model_view = mat4_mul(&ctx.view, transform.world_matrix());
        let fill = match textures.view(renderer.texture) {
            Some(view) => Fill::Textured(view),
            None => Fill::Solid(renderer.color),
        };

        stats.meshes += 1;
        match slot {
            MeshSlot::Static(mesh) => draw_static(meshes, mesh, ctx, &model_view, fill, rasterizer, sink, &mut stats),
            MeshSlot::Animated(mesh) => {
                draw_animated(meshes, mesh, renderer, ctx, &model_view, fill, rasterizer, sink, &mut stats)
            }
        }
    }

    log::trace!("render_scene: {:?}", stats);
    stats
}

#[allow(clippy::too_many_arguments)]
fn draw_static<S: PixelSink + ?Sized>(
    meshes: &MeshStore,
    mesh: &StaticMesh,
    ctx: &RenderContext,
    model_view: &Mat4,
    fill: Fill,
    rasterizer: &mut Rasterizer,
    sink: &mut S,
    stats: &mut PipelineStats,
) {
    let vertices = meshes.vertices(mesh);
    let indices = meshes.indices(mesh.indices);

    for tri in indices.chunks_exact(3) {
        let mut screen = [None; 3];
        let mut levels = [0u8; 3];
        for (corner, &index) in tri.iter().enumerate() {
            let Some(v) = vertices.get(index as usize) else {
                continue;
            };
            screen[corner] = transform_vertex(ctx, model_view, v.position, v.normal, v.texcoord);
            levels[corner] = light_intensity(v.normal);
        }
        submit(screen, levels, fill, rasterizer, sink, stats);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_animated<S: PixelSink + ?Sized>(
    meshes: &MeshStore,
    mesh: &AnimatedMesh,
    renderer: &MeshRenderer,
    ctx: &RenderContext,
    model_view: &Mat4,
    fill: Fill,
    rasterizer: &mut Rasterizer,
    sink: &mut S,
    stats: &mut PipelineStats,
) {
    let frames = meshes.frames(mesh);
    let Some(last) = frames.len().checked_sub(1) else {
        return;
    };
    let frame_a = frames[(renderer.frame_a as usize).min(last)];
    let frame_b = frames[(renderer.frame_b as usize).min(last)];
    let verts_a = meshes.compressed(&frame_a);
    let verts_b = meshes.compressed(&frame_b);
    let indices = meshes.indices(mesh.indices);
    let uvs = meshes.uvs(mesh);

    for (t, tri) in indices.chunks_exact(3).enumerate() {
        let mut screen = [None; 3];
        let mut levels = [0u8; 3];
        for (corner, &index) in tri.iter().enumerate() {
            let (Some(&va), Some(&vb)) = (verts_a.get(index as usize), verts_b.get(index as usize)) else {
                continue;
            };
            let v = crate::anim::interpolate(&frame_a, va, &frame_b, vb, renderer.lerp);
            let uv = uvs.get(t * 3 + corner).copied().unwrap_or_default();
            screen[corner] = transform_vertex(ctx, model_view, v.position, v.normal, uv);
            levels[corner] = light_intensity(v.normal);
        }
        submit(screen, levels, fill, rasterizer, sink, stats);
    }
}

/// Cull and rasterize one triangle given in object-space CCW order.
fn submit<S: PixelSink + ?Sized>(
    screen: [Option<ScreenVertex>; 3],
    levels: [u8; 3],
    fill: Fill,
    rasterizer: &mut Rasterizer,
    sink: &mut S,
    stats: &mut PipelineStats,
) {
    let [Some(s0), Some(s1), Some(s2)] = screen else {
        stats.rejected += 1;
        return;
    };

    // Screen Y points down, which mirrors winding: (0, 2, 1) is front-positive.
    if signed_area(&s0, &s2, &s1) <= 0 {
        stats.backfacing += 1;
        return;
    }

    stats.triangles += 1;
    match fill {
        Fill::Textured(texture) => rasterizer.draw_triangle(sink, &s0, &s2, &s1, &texture),
        Fill::Solid(color) => {
            let level = (levels.iter().map(|&l| l as u32).sum::<u32>() / 3) as u8;
            rasterizer.draw_triangle_solid(sink, &s0, &s2, &s1, color.modulate(Rgb565::grey(level)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::md2::test_data::Md2Builder;
    use crate::config::PoolLimits;
    use crate::rasterizer::{Framebuffer, Vec3};
    use crate::scene::EntityId;
    use crate::store::MeshHandle;

    const SIZE: usize = 64;

    struct Scene {
        world: World,
        meshes: MeshStore,
        textures: TextureStore,
        camera: EntityId,
    }

    fn scene(camera_position: Vec3, camera_rotation: Vec3) -> Scene {
        let limits = PoolLimits::default();
        let mut world = World::new(16);
        let camera = world.spawn("camera").unwrap();
        world.add_component(camera, ComponentMask::TRANSFORM | ComponentMask::CAMERA).unwrap();
        world.set_position(camera, camera_position).unwrap();
        world.set_rotation(camera, camera_rotation).unwrap();
        Scene {
            world,
            meshes: MeshStore::new(&limits),
            textures: TextureStore::new(&limits),
            camera,
        }
    }

    impl Scene {
        fn add(&mut self, name: &str, mesh: MeshHandle, position: Vec3) -> EntityId {
            let e = self.world.spawn(name).unwrap();
            self.world
                .add_component(e, ComponentMask::TRANSFORM | ComponentMask::MESH_RENDERER)
                .unwrap();
            self.world.mesh_renderer_mut(e).unwrap().mesh = mesh;
            self.world.set_position(e, position).unwrap();
            e
        }

        fn render(&mut self, fb: &mut Framebuffer, raster: &mut Rasterizer) -> PipelineStats {
            self.world.resolve_transforms();
            let ctx = RenderContext::from_camera(&self.world, self.camera, SIZE, SIZE).unwrap();
            raster.begin_frame(fb, Rgb565::BLACK);
            render_scene(&self.world, &self.meshes, &self.textures, &ctx, raster, fb)
        }
    }

    #[test]
    fn test_cube_front_face_drawn_rest_culled() {
        let mut s = scene(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let cube = s.meshes.create_cube(2.0).unwrap();
        s.add("cube", cube, Vec3::ZERO);

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut raster = Rasterizer::new(SIZE, SIZE);
        let stats = s.render(&mut fb, &mut raster);

        assert_eq!(stats.meshes, 1);
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.backfacing, 10);
        assert_eq!(stats.rejected, 0);
        assert_ne!(fb.get_pixel(32, 32), Some(Rgb565::BLACK.to_rgba()));
        assert!(raster.depth_at(32, 32).unwrap() < 1.0);
        assert_eq!(fb.get_pixel(0, 0), Some(Rgb565::BLACK.to_rgba()));
    }

    #[test]
    fn test_solid_color_is_lit() {
        let mut s = scene(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let cube = s.meshes.create_cube(2.0).unwrap();
        let e = s.add("cube", cube, Vec3::ZERO);
        s.world.mesh_renderer_mut(e).unwrap().color = Rgb565::RED;

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut raster = Rasterizer::new(SIZE, SIZE);
        s.render(&mut fb, &mut raster);

        // +Z face: light level 20 of 31
        let expected = Rgb565::RED.modulate(Rgb565::grey(20));
        assert_eq!(fb.get_pixel(32, 32), Some(expected.to_rgba()));
    }

    #[test]
    fn test_textured_mesh_samples_texture() {
        let mut s = scene(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let cube = s.meshes.create_cube(2.0).unwrap();
        let tex = s.textures.create_solid(4, 4, Rgb565::BLUE).unwrap();
        let e = s.add("cube", cube, Vec3::ZERO);
        s.world.mesh_renderer_mut(e).unwrap().texture = tex;

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut raster = Rasterizer::new(SIZE, SIZE);
        s.render(&mut fb, &mut raster);

        let [r, g, b, _] = fb.get_pixel(32, 32).unwrap();
        assert_eq!((r, g), (0, 0));
        assert!(b > 0);
    }

    #[test]
    fn test_behind_camera_is_rejected() {
        let mut s = scene(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let cube = s.meshes.create_cube(2.0).unwrap();
        s.add("cube", cube, Vec3::new(0.0, 0.0, 10.0));

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut raster = Rasterizer::new(SIZE, SIZE);
        let stats = s.render(&mut fb, &mut raster);

        assert_eq!(stats.rejected, 12);
        assert_eq!(stats.triangles, 0);
        assert_eq!(raster.stats().pixels_written, 0);
    }

    #[test]
    fn test_hidden_and_missing_meshes_are_skipped() {
        let mut s = scene(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let cube = s.meshes.create_cube(2.0).unwrap();
        let hidden = s.add("hidden", cube, Vec3::ZERO);
        s.world.mesh_renderer_mut(hidden).unwrap().visible = false;
        s.add("missing", MeshHandle::INVALID, Vec3::ZERO);
        let inactive = s.add("inactive", cube, Vec3::ZERO);
        s.world.set_active(inactive, false).unwrap();

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut raster = Rasterizer::new(SIZE, SIZE);
        let stats = s.render(&mut fb, &mut raster);
        assert_eq!(stats, PipelineStats::default());
    }

    #[test]
    fn test_nearer_mesh_wins_depth() {
        let mut s = scene(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let cube = s.meshes.create_cube(2.0).unwrap();
        let far = s.add("far", cube, Vec3::new(0.0, 0.0, -3.0));
        s.world.mesh_renderer_mut(far).unwrap().color = Rgb565::GREEN;
        let near = s.add("near", cube, Vec3::ZERO);
        s.world.mesh_renderer_mut(near).unwrap().color = Rgb565::RED;

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut raster = Rasterizer::new(SIZE, SIZE);
        s.render(&mut fb, &mut raster);

        let [r, g, _, _] = fb.get_pixel(32, 32).unwrap();
        assert!(r > 0);
        assert_eq!(g, 0);
    }

    #[test]
    fn test_md2_winding_through_pipeline() {
        // Stored MD2 triangles face -Z after the corner swap.
        let bytes = Md2Builder::triangle(2).build();

        let mut behind = scene(Vec3::new(0.0, 0.0, -30.0), Vec3::new(0.0, std::f32::consts::PI, 0.0));
        let mesh = behind.meshes.load_md2(&bytes).unwrap();
        let e = behind.add("md2", mesh, Vec3::ZERO);
        let r = behind.world.mesh_renderer_mut(e).unwrap();
        r.frame_b = 1;
        r.lerp = 0.5;
        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut raster = Rasterizer::new(SIZE, SIZE);
        let stats = behind.render(&mut fb, &mut raster);
        assert_eq!((stats.triangles, stats.backfacing), (1, 0));

        let mut front = scene(Vec3::new(0.0, 0.0, 30.0), Vec3::ZERO);
        let mesh = front.meshes.load_md2(&bytes).unwrap();
        front.add("md2", mesh, Vec3::ZERO);
        let stats = front.render(&mut fb, &mut raster);
        assert_eq!((stats.triangles, stats.backfacing), (0, 1));
    }
}
