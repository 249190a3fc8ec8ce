//! Overlay scene content
//!
//! A translucent red box and a ground square hung under the scene root, so
//! they stand on the reference site with the root's up along the local
//! vertical. All of it is in the overlay render layer, in metres.

use bevy::camera::visibility::RenderLayers;
use bevy::gizmos::config::{DefaultGizmoConfigGroup, GizmoConfigStore};
use bevy::math::DVec3;
use bevy::prelude::*;

use crate::core::config::OverlayConfig;
use crate::core::space::local_to_render;
use crate::sync::components::{OVERLAY_LAYER, SceneRoot};
use crate::sync::{OverlaySyncSet, StartupSet};

const BOX_SIZE_M: f32 = 10.0;
const GROUND_SIZE_M: f32 = 100.0;
const ROOT_AXES_LENGTH_M: f32 = 25.0;

/// Marker for overlay content meshes
#[derive(Component)]
pub struct OverlayContent;

/// Plugin for the overlay scene content
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Startup,
            (spawn_scene_content, spawn_overlay_light, route_gizmos_to_overlay)
                .in_set(StartupSet::Scene),
        )
        .add_systems(
            PostUpdate,
            draw_root_axes.in_set(OverlaySyncSet::ComposeScene),
        );
    }
}

/// Spawn the box and ground as children of the scene root.
pub fn spawn_scene_content(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    root_query: Query<Entity, With<SceneRoot>>,
) {
    let Ok(root) = root_query.single() else {
        warn!("spawn_scene_content: scene root not found");
        return;
    };

    let material = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 0.0, 0.0, 0.5),
        emissive: LinearRgba::RED,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });

    commands.spawn((
        Mesh3d(meshes.add(Cuboid::from_length(BOX_SIZE_M))),
        MeshMaterial3d(material.clone()),
        Transform::IDENTITY,
        RenderLayers::layer(OVERLAY_LAYER),
        OverlayContent,
        ChildOf(root),
        Name::new("Box"),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::new(Vec3::Y, Vec2::splat(GROUND_SIZE_M / 2.0)))),
        MeshMaterial3d(material),
        Transform::IDENTITY,
        RenderLayers::layer(OVERLAY_LAYER),
        OverlayContent,
        ChildOf(root),
        Name::new("Ground"),
    ));

    info!(
        "Overlay content spawned: box {} m, ground {} m",
        BOX_SIZE_M, GROUND_SIZE_M
    );
}

/// Overlay light, shining from local (1, 1, 0) toward the origin.
pub fn spawn_overlay_light(mut commands: Commands) {
    let toward_light = local_to_render(DVec3::new(1.0, 1.0, 0.0).normalize());
    commands.spawn((
        DirectionalLight {
            illuminance: 5_000.0,
            ..default()
        },
        Transform::default().looking_to(-toward_light, Vec3::Y),
        RenderLayers::layer(OVERLAY_LAYER),
        Name::new("Overlay Light"),
    ));
}

/// Gizmos draw in every camera by default; keep them in the overlay.
pub fn route_gizmos_to_overlay(config_store: Option<ResMut<GizmoConfigStore>>) {
    let Some(mut config_store) = config_store else {
        return;
    };
    let (config, _) = config_store.config_mut::<DefaultGizmoConfigGroup>();
    config.render_layers = RenderLayers::layer(OVERLAY_LAYER);
}

/// Draw the scene root's axes when enabled in config.
pub fn draw_root_axes(
    mut gizmos: Gizmos,
    config: Res<OverlayConfig>,
    query: Query<&Transform, With<SceneRoot>>,
) {
    if !config.show_root_axes {
        return;
    }
    for &transform in &query {
        gizmos.axes(transform, ROOT_AXES_LENGTH_M);
    }
}
