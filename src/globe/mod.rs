//! Globe layer
//!
//! The WGS84 globe, its pan-orbit camera and sunlight. Everything here is in
//! render layer 0, in kilometres relative to the `GlobeOrigin` floating origin.

use bevy::anti_alias::fxaa::Fxaa;
use bevy::camera::visibility::RenderLayers;
use bevy::light::GlobalAmbientLight;
use bevy::math::DVec3;
use bevy::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;

pub mod fly_to;
pub mod mesh;

use fly_to::{PendingFlyTo, orbit_target, start_fly_to};

use crate::core::config::OverlayConfig;
use crate::core::space::{GlobeOrigin, geocentric_dir_to_render};
use crate::sync::StartupSet;
use crate::sync::components::{GLOBE_CAMERA_ORDER, GLOBE_LAYER, GlobeCamera};

const GLOBE_SUBDIVISIONS: u32 = 5;
const SITE_PATCH_HALF_EXTENT_M: f64 = 20_000.0;
const SITE_PATCH_SEGMENTS: u32 = 128;
/// Starting distance from the Earth's centre, about 4x its radius.
const INITIAL_CAMERA_DISTANCE_KM: f32 = 25_000.0;

/// Marker for the sun directional light
#[derive(Component)]
pub struct SunLight;

/// Marker for the globe surface meshes
#[derive(Component)]
pub struct GlobeSurface;

/// Plugin for the globe layer
pub struct GlobePlugin;

impl Plugin for GlobePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingFlyTo>()
            .add_systems(
                Startup,
                (spawn_globe, spawn_globe_camera, spawn_sun).in_set(StartupSet::Globe),
            )
            .add_systems(Update, start_fly_to);
    }
}

/// Spawn the whole-Earth ellipsoid and the precise patch around the reference site.
pub fn spawn_globe(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    origin: Res<GlobeOrigin>,
    config: Res<OverlayConfig>,
) {
    let material = materials.add(StandardMaterial {
        base_color: if config.globe_texture.is_some() {
            Color::WHITE
        } else {
            Color::srgb(0.22, 0.42, 0.33)
        },
        base_color_texture: config
            .globe_texture
            .as_ref()
            .map(|path| asset_server.load(path.clone())),
        perceptual_roughness: 1.0,
        ..default()
    });

    // The ellipsoid mesh is Earth-centred; move it so the origin site sits at zero.
    commands.spawn((
        Mesh3d(meshes.add(mesh::generate_ellipsoid(GLOBE_SUBDIVISIONS))),
        MeshMaterial3d(material.clone()),
        Transform::from_translation(origin.to_render(DVec3::ZERO)),
        Visibility::Visible,
        RenderLayers::layer(GLOBE_LAYER),
        GlobeSurface,
        Name::new("Globe"),
    ));

    commands.spawn((
        Mesh3d(meshes.add(mesh::generate_local_patch(
            config.reference.base(),
            SITE_PATCH_HALF_EXTENT_M,
            SITE_PATCH_SEGMENTS,
            &origin,
        ))),
        MeshMaterial3d(material),
        Transform::IDENTITY,
        Visibility::Visible,
        RenderLayers::layer(GLOBE_LAYER),
        GlobeSurface,
        Name::new("Globe Site Patch"),
    ));

    match &config.globe_texture {
        Some(path) => info!("Globe spawned with texture {}", path),
        None => info!("Globe spawned without texture"),
    }
}

/// Spawn the globe camera high above the fly-to destination and queue the
/// flight down to it.
pub fn spawn_globe_camera(
    mut commands: Commands,
    origin: Res<GlobeOrigin>,
    config: Res<OverlayConfig>,
    mut pending: ResMut<PendingFlyTo>,
) {
    let (_, _, up) = config.fly_to.destination.enu_basis();
    let above = geocentric_dir_to_render(up);
    let earth_center = origin.to_render(DVec3::ZERO);

    let pan_orbit = PanOrbitCamera {
        focus: earth_center,
        radius: Some(INITIAL_CAMERA_DISTANCE_KM),
        yaw: Some(above.x.atan2(above.z)),
        pitch: Some(above.y.clamp(-1.0, 1.0).asin()),
        force_update: true,
        ..default()
    };

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            // Kilometres: a 1 m near plane for street-level views, far enough for the whole Earth.
            near: 0.001,
            far: 250_000.0,
            ..default()
        }),
        Camera {
            order: GLOBE_CAMERA_ORDER,
            clear_color: ClearColorConfig::Custom(Color::BLACK),
            ..default()
        },
        // Post-process AA in place of multisampling.
        Fxaa::default(),
        Msaa::Off,
        pan_orbit,
        Transform::from_translation(earth_center + above * INITIAL_CAMERA_DISTANCE_KM)
            .looking_at(earth_center, Vec3::Y),
        RenderLayers::layer(GLOBE_LAYER),
        GlobeCamera,
        Name::new("Globe Camera"),
    ));

    pending.0 = Some(orbit_target(&config.fly_to, &origin));
}

/// Sunlight for the globe layer, shining down on the reference site from the
/// south-east.
pub fn spawn_sun(mut commands: Commands, config: Res<OverlayConfig>) {
    // Ensure the globe is visible even where the sun does not reach.
    commands.insert_resource(GlobalAmbientLight {
        brightness: 150.0,
        ..default()
    });

    let (east, north, up) = config.reference.base().enu_basis();
    let toward_sun = geocentric_dir_to_render((up * 2.0 + east - north).normalize());

    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
        Transform::default().looking_to(-toward_sun, Vec3::Y),
        RenderLayers::layer(GLOBE_LAYER),
        SunLight,
        Name::new("Sun"),
    ));
}
