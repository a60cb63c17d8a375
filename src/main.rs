//! pool-raster demo
//!
//! A spinning cube, a ground plane, an OBJ model and an animated MD2 model,
//! rendered in software and presented through a macroquad window.
//!
//! Usage: `pool-raster [config.ron]`
//!
//! Controls: WASD move, arrow keys look, Space/Ctrl up/down, Esc quits.

use std::path::Path;

use macroquad::prelude::*;

use pool_raster::anim::animation_range;
use pool_raster::rasterizer::{Framebuffer, Rasterizer, Rgb565, Vec3, HEIGHT, WIDTH};
use pool_raster::scene::{Camera as CameraComponent, ComponentMask, EntityId, World};
use pool_raster::store::{MeshHandle, MeshStore, TextureHandle, TextureStore};
use pool_raster::{render_scene, EngineConfig, RenderContext, VERSION};

const OBJ_PATH: &str = "data/suzanne.obj";
const MD2_PATH: &str = "data/md2/tris.md2";
const MD2_SKIN_PATH: &str = "data/md2/skin.bmp";

const MOVE_SPEED: f32 = 5.0;
const ROTATE_SPEED: f32 = 2.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("pool-raster v{}", VERSION),
        window_width: WIDTH as i32,
        window_height: HEIGHT as i32,
        window_resizable: true,
        ..Default::default()
    }
}

/// Config from the first argument, or defaults.
fn load_config() -> EngineConfig {
    let Some(path) = std::env::args().nth(1) else {
        return EngineConfig::default();
    };
    match EngineConfig::load(Path::new(&path)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}: {}, using defaults", path, e);
            EngineConfig::default()
        }
    }
}

fn read_asset(path: &str) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("{} not loaded: {}", path, e);
            None
        }
    }
}

/// Entities the frame loop drives directly.
struct Demo {
    camera: EntityId,
    cube: EntityId,
    obj: EntityId,
    md2: Option<EntityId>,
}

fn spawn_renderable(
    world: &mut World,
    name: &str,
    mesh: MeshHandle,
    color: Rgb565,
    position: Vec3,
) -> Option<EntityId> {
    let id = world
        .spawn(name)
        .inspect_err(|e| log::warn!("cannot spawn {}: {}", name, e))
        .ok()?;
    world
        .add_component(id, ComponentMask::TRANSFORM | ComponentMask::MESH_RENDERER)
        .ok()?;
    let renderer = world.mesh_renderer_mut(id)?;
    renderer.mesh = mesh;
    renderer.color = color;
    world.set_position(id, position).ok()?;
    Some(id)
}

fn build_scene(config: &EngineConfig, world: &mut World, meshes: &mut MeshStore, textures: &mut TextureStore) -> Option<Demo> {
    let cube_mesh = meshes.create_cube(1.0).unwrap_or(MeshHandle::INVALID);
    let plane_mesh = meshes.create_plane(10.0, 10.0).unwrap_or(MeshHandle::INVALID);
    let checker = textures
        .create_checkerboard(64, Rgb565::WHITE, Rgb565(0x8410))
        .unwrap_or(TextureHandle::INVALID);

    let obj_mesh = read_asset(OBJ_PATH)
        .and_then(|bytes| {
            let text = String::from_utf8_lossy(&bytes);
            meshes.load_obj(&text).ok()
        })
        .unwrap_or(cube_mesh);
    let md2_mesh = read_asset(MD2_PATH).and_then(|bytes| meshes.load_md2(&bytes).ok());
    let md2_skin = read_asset(MD2_SKIN_PATH)
        .and_then(|bytes| textures.load_bmp(&bytes).ok())
        .unwrap_or(checker);

    let camera = world.spawn("MainCamera").ok()?;
    world
        .add_component(camera, ComponentMask::TRANSFORM | ComponentMask::CAMERA)
        .ok()?;
    *world.camera_mut(camera)? = CameraComponent {
        fov: config.camera.fov_degrees.to_radians(),
        near: config.camera.near,
        far: config.camera.far,
        active: true,
    };
    world.set_position(camera, Vec3::new(0.0, 2.0, 8.0)).ok()?;

    spawn_renderable(world, "Ground", plane_mesh, Rgb565(0x8410), Vec3::new(0.0, -1.0, 0.0))?;
    let cube = spawn_renderable(world, "SpinningCube", cube_mesh, Rgb565::RED, Vec3::new(-3.0, 0.0, 0.0))?;
    let obj = spawn_renderable(world, "OBJModel", obj_mesh, Rgb565::GREEN, Vec3::ZERO)?;
    world.set_scale(obj, Vec3::new(0.5, 0.5, 0.5)).ok()?;

    let md2 = md2_mesh.and_then(|mesh| {
        let id = spawn_renderable(world, "MD2Player", mesh, Rgb565::BLUE, Vec3::new(3.0, 0.0, 0.0))?;
        world.mesh_renderer_mut(id)?.texture = md2_skin;
        world.set_scale(id, Vec3::new(0.05, 0.05, 0.05)).ok()?;
        world.set_rotation(id, Vec3::new(-1.8, 4.9, 0.0)).ok()?;
        world.add_component(id, ComponentMask::ANIMATOR).ok()?;
        let range = animation_range("death1").or_else(|| animation_range("stand"))?;
        world.animator_mut(id)?.play(range, true);
        Some(id)
    });

    log::info!(
        "scene ready: {} entities, {:?}",
        world.entity_count(),
        meshes.stats()
    );
    Some(Demo { camera, cube, obj, md2 })
}

/// Fly-camera input; returns the new (position, rotation).
fn update_camera(mut position: Vec3, mut rotation: Vec3, dt: f32) -> (Vec3, Vec3) {
    let step = MOVE_SPEED * dt;
    let turn = ROTATE_SPEED * dt;

    if is_key_down(KeyCode::Left) {
        rotation.y += turn;
    }
    if is_key_down(KeyCode::Right) {
        rotation.y -= turn;
    }
    if is_key_down(KeyCode::Up) {
        rotation.x += turn;
    }
    if is_key_down(KeyCode::Down) {
        rotation.x -= turn;
    }

    let (sin_y, cos_y) = rotation.y.sin_cos();
    if is_key_down(KeyCode::W) {
        position.x -= sin_y * step;
        position.z -= cos_y * step;
    }
    if is_key_down(KeyCode::S) {
        position.x += sin_y * step;
        position.z += cos_y * step;
    }
    if is_key_down(KeyCode::A) {
        position.x -= cos_y * step;
        position.z += sin_y * step;
    }
    if is_key_down(KeyCode::D) {
        position.x += cos_y * step;
        position.z -= sin_y * step;
    }
    if is_key_down(KeyCode::Space) {
        position.y += step;
    }
    if is_key_down(KeyCode::LeftControl) {
        position.y -= step;
    }
    (position, rotation)
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config();
    let width = config.display.width as usize;
    let height = config.display.height as usize;

    let mut world = World::from_limits(&config.pools);
    let mut meshes = MeshStore::new(&config.pools);
    let mut textures = TextureStore::new(&config.pools);
    let Some(demo) = build_scene(&config, &mut world, &mut meshes, &mut textures) else {
        log::error!("scene setup failed");
        return;
    };

    let mut fb = Framebuffer::new(width, height);
    let mut rasterizer = Rasterizer::new(width, height);
    let mut cam_position = Vec3::new(0.0, 2.0, 8.0);
    let mut cam_rotation = Vec3::ZERO;
    let mut spin = 0.0f32;

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        let dt = get_frame_time();
        spin += dt;

        (cam_position, cam_rotation) = update_camera(cam_position, cam_rotation, dt);
        if let Err(e) = world.set_position(demo.camera, cam_position) {
            log::warn!("camera position not updated: {}", e);
        }
        if let Err(e) = world.set_rotation(demo.camera, cam_rotation) {
            log::warn!("camera rotation not updated: {}", e);
        }
        if let Err(e) = world.set_rotation(demo.cube, Vec3::new(spin * 0.5, spin, 0.0)) {
            log::warn!("cube rotation not updated: {}", e);
        }
        if let Err(e) = world.set_rotation(demo.obj, Vec3::new(0.0, spin * 0.3, 0.0)) {
            log::warn!("model rotation not updated: {}", e);
        }

        world.update_animators(dt);
        if let Some(md2) = demo.md2 {
            world.sync_animation(md2);
        }
        world.resolve_transforms();

        rasterizer.begin_frame(&mut fb, config.display.clear_color);
        let stats = RenderContext::from_camera(&world, demo.camera, width, height)
            .map(|ctx| render_scene(&world, &meshes, &textures, &ctx, &mut rasterizer, &mut fb))
            .unwrap_or_default();

        let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
        texture.set_filter(FilterMode::Nearest);

        clear_background(Color::from_rgba(10, 10, 12, 255));
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        let raster = rasterizer.stats();
        draw_text(
            &format!(
                "{} fps  tris {}  culled {}  rejected {}  px {}",
                get_fps(),
                stats.triangles,
                stats.backfacing + raster.triangles_culled,
                stats.rejected,
                raster.pixels_written
            ),
            8.0,
            20.0,
            20.0,
            WHITE,
        );

        next_frame().await;
    }
}
