//! Camera synchronization between the globe layer and the overlay scene
//!
//! This module owns the local frame, the overlay camera and the per-frame
//! pipeline that derives the overlay camera pose from the globe camera.

use bevy::camera::CameraUpdateSystems;
use bevy::prelude::*;
use bevy::transform::TransformSystems;
use bevy_panorbit_camera::PanOrbitCameraSystemSet;

pub mod components;
pub mod frame;
pub mod pose;
pub mod systems;

use frame::setup_local_frame;
use systems::{
    GlobeCameraState, apply_overlay_pose, capture_globe_camera, spawn_overlay_camera,
    sync_overlay_viewport,
};

use crate::core::config::OverlayConfig;

/// Startup ordering: the local frame (and globe origin) exist before the
/// globe and the scene content are spawned.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum StartupSet {
    LocalFrame,
    Globe,
    Scene,
}

/// Per-frame ordering of the synchronization tick.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum OverlaySyncSet {
    /// Read the globe camera after its controller has moved it.
    CaptureGlobe,
    /// Write the overlay camera from this tick's capture.
    ApplyPose,
    /// Overlay scene-content systems.
    ComposeScene,
    /// Re-derive overlay state that depends on the shared window.
    ResetSurface,
}

/// Plugin for globe/overlay camera synchronization
pub struct CameraSyncPlugin;

impl Plugin for CameraSyncPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlayConfig>()
            .init_resource::<GlobeCameraState>();
        configure_sync_sets(app);

        app.add_systems(
            Startup,
            (setup_local_frame, spawn_overlay_camera).in_set(StartupSet::LocalFrame),
        );
        add_sync_systems(app);
    }
}

/// Register the per-tick capture, pose and surface systems in their sets.
pub fn add_sync_systems(app: &mut App) {
    app.add_systems(
        PostUpdate,
        (
            capture_globe_camera.in_set(OverlaySyncSet::CaptureGlobe),
            apply_overlay_pose.in_set(OverlaySyncSet::ApplyPose),
            sync_overlay_viewport.in_set(OverlaySyncSet::ResetSurface),
        ),
    );
}

pub fn configure_sync_sets(app: &mut App) {
    app.configure_sets(
        Startup,
        (StartupSet::LocalFrame, StartupSet::Globe, StartupSet::Scene).chain(),
    )
    .configure_sets(
        PostUpdate,
        (
            OverlaySyncSet::CaptureGlobe,
            OverlaySyncSet::ApplyPose,
            OverlaySyncSet::ComposeScene,
            OverlaySyncSet::ResetSurface,
        )
            .chain()
            .after(PanOrbitCameraSystemSet)
            // Camera matrices and global transforms must see this tick's pose.
            .before(CameraUpdateSystems)
            .before(TransformSystems::Propagate),
    );
}
