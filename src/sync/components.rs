//! Markers and layer constants shared by the globe and overlay layers

use bevy::prelude::*;

/// Render layer of the globe (ellipsoid, sun).
pub const GLOBE_LAYER: usize = 0;
/// Render layer of the overlay scene.
pub const OVERLAY_LAYER: usize = 1;

/// The globe renders first and clears the target.
pub const GLOBE_CAMERA_ORDER: isize = 0;
/// The overlay renders second, over the globe image.
pub const OVERLAY_CAMERA_ORDER: isize = 1;

/// Component marker for the user-driven globe camera
#[derive(Component)]
pub struct GlobeCamera;

/// Component marker for the synchronized overlay camera
#[derive(Component)]
pub struct OverlayCamera;

/// Component marker for the root node all overlay content is parented to
#[derive(Component)]
pub struct SceneRoot;
