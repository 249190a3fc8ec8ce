//! Per-frame synchronization systems
//!
//! Run in `OverlaySyncSet` order every tick:
//! capture the globe camera, apply the extracted pose to the overlay camera,
//! then keep the overlay's view of the shared surface in step with the globe.

use bevy::camera::Viewport;
use bevy::camera::visibility::RenderLayers;
use bevy::log::warn_once;
use bevy::prelude::*;

use crate::core::config::OverlayConfig;
use crate::core::space::GlobeOrigin;
use crate::sync::components::{GlobeCamera, OVERLAY_CAMERA_ORDER, OVERLAY_LAYER, OverlayCamera};
use crate::sync::frame::LocalFrame;
use crate::sync::pose::{GlobeCameraSnapshot, extract_pose};

/// Overlay near/far planes, metres.
const OVERLAY_NEAR_M: f32 = 0.1;
const OVERLAY_FAR_M: f32 = 1_000_000.0;

/// Globe camera state captured this tick.
#[derive(Resource, Default, Debug)]
pub struct GlobeCameraState {
    pub snapshot: Option<GlobeCameraSnapshot>,
}

/// Spawn the overlay camera. It draws after the globe camera and does not
/// clear the colour target, so the overlay composites over the globe image.
pub fn spawn_overlay_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Camera {
            order: OVERLAY_CAMERA_ORDER,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        // Same sample count as the globe camera drawing to this window.
        Msaa::Off,
        Projection::Perspective(PerspectiveProjection {
            near: OVERLAY_NEAR_M,
            far: OVERLAY_FAR_M,
            ..default()
        }),
        Transform::default(),
        RenderLayers::layer(OVERLAY_LAYER),
        OverlayCamera,
        Name::new("Overlay Camera"),
    ));
}

/// Snapshot the globe camera as it will be rendered this frame.
pub fn capture_globe_camera(
    origin: Option<Res<GlobeOrigin>>,
    globe_query: Query<(&Transform, &Projection), With<GlobeCamera>>,
    mut state: ResMut<GlobeCameraState>,
) {
    state.snapshot = None;

    let Some(origin) = origin else {
        return;
    };
    let Ok((transform, projection)) = globe_query.single() else {
        warn_once!("capture_globe_camera: globe camera not found");
        return;
    };
    let Projection::Perspective(perspective) = projection else {
        warn_once!("capture_globe_camera: globe camera is not perspective");
        return;
    };

    state.snapshot = Some(GlobeCameraSnapshot::from_render_camera(
        transform,
        perspective.fov,
        &origin,
    ));
}

/// Extract the overlay pose from this tick's snapshot and write it to the
/// overlay camera. Non-finite poses are not written.
pub fn apply_overlay_pose(
    state: Res<GlobeCameraState>,
    frame: Option<Res<LocalFrame>>,
    config: Res<OverlayConfig>,
    mut overlay_query: Query<(&mut Transform, &mut Projection), With<OverlayCamera>>,
) {
    let (Some(snapshot), Some(frame)) = (state.snapshot.as_ref(), frame) else {
        return;
    };
    let Ok((mut transform, mut projection)) = overlay_query.single_mut() else {
        warn_once!("apply_overlay_pose: overlay camera not found");
        return;
    };

    let pose = extract_pose(snapshot, frame.base_point, config.euler_solver);
    if !pose.is_finite() {
        debug!("Skipping non-finite overlay pose: {:?}", pose);
        return;
    }

    *transform = pose.render_transform();
    match projection.as_mut() {
        Projection::Perspective(perspective) => perspective.fov = pose.fov_y as f32,
        _ => {
            warn_once!("apply_overlay_pose: overlay camera is not perspective");
        }
    }

    debug!(
        "Overlay pose: position {:?} rotation {:?} fov {:.4}",
        pose.position, pose.rotation, pose.fov_y
    );
}

/// Keep the overlay camera's viewport identical to the globe camera's. Both
/// draw to the same window, so the aspect ratio (and with it the FOV
/// pass-through) only holds while the rectangles match.
pub fn sync_overlay_viewport(
    globe_query: Query<&Camera, (With<GlobeCamera>, Without<OverlayCamera>)>,
    mut overlay_query: Query<&mut Camera, (With<OverlayCamera>, Without<GlobeCamera>)>,
) {
    let (Ok(globe), Ok(mut overlay)) = (globe_query.single(), overlay_query.single_mut()) else {
        return;
    };
    if viewports_match(globe.viewport.as_ref(), overlay.viewport.as_ref()) {
        return;
    }

    overlay.viewport = globe.viewport.clone();
    debug!("Overlay viewport re-synced: {:?}", overlay.viewport);
}

pub fn viewports_match(a: Option<&Viewport>, b: Option<&Viewport>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.physical_position == b.physical_position
                && a.physical_size == b.physical_size
                && a.depth == b.depth
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(x: u32, y: u32, w: u32, h: u32) -> Viewport {
        Viewport {
            physical_position: UVec2::new(x, y),
            physical_size: UVec2::new(w, h),
            ..default()
        }
    }

    #[test]
    fn test_viewports_match() {
        assert!(viewports_match(None, None));
        assert!(viewports_match(
            Some(&viewport(0, 0, 800, 600)),
            Some(&viewport(0, 0, 800, 600))
        ));
        assert!(!viewports_match(Some(&viewport(0, 0, 800, 600)), None));
        assert!(!viewports_match(
            Some(&viewport(0, 0, 800, 600)),
            Some(&viewport(10, 0, 800, 600))
        ));
        assert!(!viewports_match(
            Some(&viewport(0, 0, 800, 600)),
            Some(&viewport(0, 0, 1024, 600))
        ));
    }

    #[test]
    fn test_overlay_camera_composites_over_globe() {
        let mut app = App::new();
        app.add_systems(Startup, spawn_overlay_camera);
        app.update();

        let mut query = app
            .world_mut()
            .query_filtered::<(&Camera, &Msaa, &RenderLayers), With<OverlayCamera>>();
        let (camera, msaa, layers) = query.single(app.world()).unwrap();
        assert_eq!(camera.order, OVERLAY_CAMERA_ORDER);
        assert!(matches!(camera.clear_color, ClearColorConfig::None));
        assert_eq!(*msaa, Msaa::Off);
        assert_eq!(*layers, RenderLayers::layer(OVERLAY_LAYER));
    }

    fn viewport_app(globe_viewport: Option<Viewport>) -> (App, Entity, Entity) {
        let mut app = App::new();
        app.add_systems(Update, sync_overlay_viewport);
        let globe = app
            .world_mut()
            .spawn((
                GlobeCamera,
                Camera {
                    viewport: globe_viewport,
                    ..default()
                },
            ))
            .id();
        let overlay = app
            .world_mut()
            .spawn((OverlayCamera, Camera::default()))
            .id();
        (app, globe, overlay)
    }

    fn camera_viewport(app: &App, entity: Entity) -> Option<Viewport> {
        app.world()
            .get::<Camera>(entity)
            .and_then(|camera| camera.viewport.clone())
    }

    #[test]
    fn test_overlay_viewport_follows_globe() {
        let (mut app, globe, overlay) = viewport_app(Some(viewport(0, 0, 800, 600)));
        assert!(camera_viewport(&app, overlay).is_none());

        app.update();
        assert!(viewports_match(
            camera_viewport(&app, overlay).as_ref(),
            Some(&viewport(0, 0, 800, 600))
        ));

        // Window resized: the overlay follows on the next tick.
        if let Some(mut camera) = app.world_mut().get_mut::<Camera>(globe) {
            camera.viewport = Some(viewport(20, 10, 1280, 720));
        }
        app.update();
        assert!(viewports_match(
            camera_viewport(&app, overlay).as_ref(),
            Some(&viewport(20, 10, 1280, 720))
        ));

        // Back to the full window.
        if let Some(mut camera) = app.world_mut().get_mut::<Camera>(globe) {
            camera.viewport = None;
        }
        app.update();
        assert!(camera_viewport(&app, overlay).is_none());
    }

    #[test]
    fn test_overlay_viewport_left_alone_without_globe_camera() {
        let (mut app, globe, overlay) = viewport_app(Some(viewport(0, 0, 800, 600)));
        app.world_mut().despawn(globe);
        if let Some(mut camera) = app.world_mut().get_mut::<Camera>(overlay) {
            camera.viewport = Some(viewport(5, 5, 640, 480));
        }

        app.update();
        assert!(viewports_match(
            camera_viewport(&app, overlay).as_ref(),
            Some(&viewport(5, 5, 640, 480))
        ));
    }
}
