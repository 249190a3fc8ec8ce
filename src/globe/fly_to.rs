//! Initial globe camera flight
//!
//! The destination, heading and pitch describe a camera pose in the
//! destination's east/north/up frame. The pan-orbit controller can only orbit
//! a focus point, so the pose is turned into a focus, yaw, pitch and radius
//! and handed over as targets; the controller animates the flight.

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy_panorbit_camera::PanOrbitCamera;

use crate::core::config::FlyToConfig;
use crate::core::space::{GlobeOrigin, geocentric_dir_to_render};
use crate::sync::components::GlobeCamera;

/// Below this downward pitch the view ray is treated as parallel to the ground.
const MIN_DOWN_PITCH_DEG: f64 = 1.0;
/// Focus distance used when the view ray does not meet the ground.
const LEVEL_FOCUS_DISTANCE_M: f64 = 1_000.0;

/// Pan-orbit targets for a fly-to, in globe render units (km).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitTarget {
    pub focus: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub radius: f32,
}

/// Fly-to still waiting for the globe camera to initialize.
#[derive(Resource, Debug, Default)]
pub struct PendingFlyTo(pub Option<OrbitTarget>);

/// Unit view direction for a heading (clockwise from north) and pitch
/// (negative is down), in the geocentric frame.
pub fn view_direction(east: DVec3, north: DVec3, up: DVec3, heading_deg: f64, pitch_deg: f64) -> DVec3 {
    let (sin_h, cos_h) = heading_deg.to_radians().sin_cos();
    let (sin_p, cos_p) = pitch_deg.to_radians().sin_cos();
    (east * sin_h * cos_p + north * cos_h * cos_p + up * sin_p).normalize()
}

/// Focus, orientation and distance that put the camera at the fly-to
/// destination looking along its heading and pitch.
pub fn orbit_target(fly_to: &FlyToConfig, origin: &GlobeOrigin) -> OrbitTarget {
    let destination = fly_to.destination;
    let (east, north, up) = destination.enu_basis();
    let direction = view_direction(east, north, up, fly_to.heading_deg, fly_to.pitch_deg);

    let distance_m = if fly_to.pitch_deg < -MIN_DOWN_PITCH_DEG {
        // Ray against the height-zero tangent plane.
        destination.height_m / (-fly_to.pitch_deg).to_radians().sin()
    } else {
        LEVEL_FOCUS_DISTANCE_M
    };
    // A destination below the ground would put the focus behind the camera.
    let distance_m = distance_m.max(1.0);

    let camera = destination.to_geocentric();
    let focus = camera + direction * distance_m;
    let offset = geocentric_dir_to_render(-direction).normalize();

    OrbitTarget {
        focus: origin.to_render(focus),
        yaw: offset.x.atan2(offset.z),
        pitch: offset.y.clamp(-1.0, 1.0).asin(),
        radius: (distance_m / 1000.0) as f32,
    }
}

/// Hand the pending fly-to to the pan-orbit controller once it has
/// initialized; before that it would overwrite the targets.
pub fn start_fly_to(
    mut pending: ResMut<PendingFlyTo>,
    mut camera_query: Query<&mut PanOrbitCamera, With<GlobeCamera>>,
) {
    let Some(target) = pending.0 else {
        return;
    };
    let Ok(mut pan_orbit) = camera_query.single_mut() else {
        return;
    };
    if !pan_orbit.initialized {
        return;
    }

    pan_orbit.target_focus = target.focus;
    pan_orbit.target_yaw = target.yaw;
    pan_orbit.target_pitch = target.pitch;
    pan_orbit.target_radius = target.radius;
    pending.0 = None;

    info!(
        "Flying to focus {:?} (yaw {:.3}, pitch {:.3}, radius {:.3} km)",
        target.focus, target.yaw, target.pitch, target.radius
    );
}
