//! Pose extraction: globe camera state -> overlay camera pose.
//!
//! Pure functions only. The systems that feed and consume these live in
//! `sync::systems`.

use bevy::math::{DMat3, DMat4, DVec3, EulerRot, Vec3};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::core::space::{
    GlobeOrigin, geocentric_to_local, local_rotation_to_render, local_to_render,
    render_dir_to_geocentric,
};

/// Globe camera state for one frame, in the geocentric frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobeCameraSnapshot {
    /// Vertical field of view, radians.
    pub fov_y: f64,
    /// Camera-to-world transform, column-major.
    pub inverse_view: [f64; 16],
    /// Unit view direction.
    pub direction: DVec3,
    /// Unit up vector.
    pub up: DVec3,
}

impl GlobeCameraSnapshot {
    /// Snapshot of a globe-layer camera given its render transform (km,
    /// relative to `origin`). Render cameras look down -Z, like the globe's
    /// own camera space, so the basis columns carry over unchanged.
    pub fn from_render_camera(transform: &Transform, fov_y: f32, origin: &GlobeOrigin) -> Self {
        let right = render_dir_to_geocentric(transform.right().as_vec3());
        let up = render_dir_to_geocentric(transform.up().as_vec3());
        let back = render_dir_to_geocentric(transform.back().as_vec3());
        let position = origin.to_geocentric(transform.translation);

        let inverse_view = DMat4::from_cols(
            right.extend(0.0),
            up.extend(0.0),
            back.extend(0.0),
            position.extend(1.0),
        );

        Self {
            fov_y: fov_y as f64,
            inverse_view: inverse_view.to_cols_array(),
            direction: -back,
            up,
        }
    }

    /// Camera position in the geocentric frame (translation column).
    pub fn position(&self) -> DVec3 {
        DVec3::new(
            self.inverse_view[12],
            self.inverse_view[13],
            self.inverse_view[14],
        )
    }
}

/// How Euler angles are rebuilt from the direction and up vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EulerSolver {
    /// `atan` with a sign branch for yaw, `acos` for roll. Singular at
    /// `d.x == 0` and when the roll dot product drifts outside [-1, 1].
    Branching,
    /// `atan2` for yaw and roll. Same angles (mod 2π) on the non-singular
    /// range, finite everywhere except straight up/down.
    #[default]
    FourQuadrant,
}

/// Overlay camera pose in the local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Metres, relative to BasePoint.
    pub position: DVec3,
    /// Radians: x = pitch, y = yaw, z = roll. Applied as `Ry * Rx * Rz`.
    pub rotation: DVec3,
    /// Vertical field of view, radians.
    pub fov_y: f64,
}

impl CameraPose {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.fov_y.is_finite()
    }

    /// Local-frame rotation matrix. Camera forward is +Z, up is +Y.
    pub fn rotation_matrix(&self) -> DMat3 {
        DMat3::from_euler(
            EulerRot::YXZ,
            self.rotation.y,
            self.rotation.x,
            self.rotation.z,
        )
    }

    pub fn forward(&self) -> DVec3 {
        self.rotation_matrix() * DVec3::Z
    }

    pub fn up(&self) -> DVec3 {
        self.rotation_matrix() * DVec3::Y
    }

    /// The pose as an overlay render-space camera transform.
    pub fn render_transform(&self) -> Transform {
        Transform {
            translation: local_to_render(self.position),
            rotation: local_rotation_to_render(self.rotation_matrix()),
            scale: Vec3::ONE,
        }
    }
}

/// Derive the overlay camera pose from a globe camera snapshot.
///
/// Only the translation of the inverse view matrix is used. Orientation comes
/// from the direction and up vectors; the matrix rotation is discarded.
pub fn extract_pose(
    snapshot: &GlobeCameraSnapshot,
    base_point: DVec3,
    solver: EulerSolver,
) -> CameraPose {
    let inverse_view = DMat4::from_cols_array(&snapshot.inverse_view);
    let (_scale, _rotation, translation) = inverse_view.to_scale_rotation_translation();

    let position = geocentric_to_local(translation) - base_point;
    let direction = geocentric_to_local(snapshot.direction);
    let up = geocentric_to_local(snapshot.up);

    let rotation = match solver {
        EulerSolver::Branching => branching_euler(direction, up),
        EulerSolver::FourQuadrant => four_quadrant_euler(direction, up),
    };

    CameraPose {
        position,
        rotation,
        fov_y: snapshot.fov_y,
    }
}

/// Horizontal axis that roll is measured against: the camera's negated right
/// vector at this yaw.
fn reference_up(yaw: f64) -> DVec3 {
    DVec3::new(-yaw.cos(), 0.0, yaw.sin())
}

fn branching_euler(d: DVec3, u: DVec3) -> DVec3 {
    let mut yaw = (d.z / d.x).atan();
    if d.x < 0.0 {
        yaw += PI;
    }
    yaw = FRAC_PI_2 - yaw;

    let pitch = (-d.y).asin();

    let mut roll = u.dot(reference_up(yaw)).acos();
    roll = FRAC_PI_2 - roll;
    if u.y < 0.0 {
        roll = PI - roll;
    }

    DVec3::new(pitch, yaw, roll)
}

fn four_quadrant_euler(d: DVec3, u: DVec3) -> DVec3 {
    let yaw = d.x.atan2(d.z);
    let pitch = (-d.y).clamp(-1.0, 1.0).asin();

    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    let level_up = DVec3::new(sin_yaw * sin_pitch, cos_pitch, cos_yaw * sin_pitch);
    let roll = u.dot(reference_up(yaw)).atan2(u.dot(level_up));

    DVec3::new(pitch, yaw, roll)
}
