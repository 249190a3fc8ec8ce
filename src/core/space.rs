//! Coordinate space boundaries.
//!
//! Three frames meet here:
//! - geocentric: standard ECEF, metres, f64, Z toward the north pole
//! - local: the overlay scene frame, `local = (geo.x, geo.z, geo.y)`, left-handed, Y up
//! - render: Bevy world space (right-handed, Y up, f32)
//!
//! The globe layer renders ECEF in kilometres relative to a floating origin.
//! The overlay layer renders the local frame in metres, mirrored on Z.

use bevy::math::{DMat3, DVec3, Quat, Vec3};
use bevy::prelude::*;

/// Mirror between the left-handed local frame and right-handed render space.
const MIRROR_Z: DVec3 = DVec3::new(1.0, 1.0, -1.0);

// ========================= Geocentric <-> local =========================

/// Geocentric -> local axis permutation. Applies to positions and directions alike.
pub fn geocentric_to_local(geo: DVec3) -> DVec3 {
    DVec3::new(geo.x, geo.z, geo.y)
}

/// Local -> geocentric. The permutation is its own inverse.
pub fn local_to_geocentric(local: DVec3) -> DVec3 {
    DVec3::new(local.x, local.z, local.y)
}

// ========================= Local <-> overlay render =========================

/// Local position (metres, f64) to overlay render space (metres, f32).
pub fn local_to_render(local: DVec3) -> Vec3 {
    (local * MIRROR_Z).as_vec3()
}

pub fn render_to_local(render: Vec3) -> DVec3 {
    render.as_dvec3() * MIRROR_Z
}

/// Carry a local-frame rotation into render space: `M * R * M` with `M = diag(1, 1, -1)`.
///
/// The result is a proper rotation. A render-space camera using it looks along
/// the mirrored local +Z and keeps the mirrored local +Y as up.
pub fn local_rotation_to_render(rotation: DMat3) -> Quat {
    let mirror = DMat3::from_diagonal(MIRROR_Z);
    Quat::from_mat3(&(mirror * rotation * mirror).as_mat3())
}

// ========================= Geocentric <-> globe render =========================

/// Convert standard ECEF km (f64) to globe render km.
/// Mapping: Bevy (x,y,z) = (ECEF.y, ECEF.z, ECEF.x)
pub fn ecef_to_bevy_km(ecef_km: DVec3) -> DVec3 {
    DVec3::new(ecef_km.y, ecef_km.z, ecef_km.x)
}

/// Convert globe render km to standard ECEF km (f64).
/// Inverse mapping: ECEF (x,y,z) = (Bevy.z, Bevy.x, Bevy.y)
pub fn bevy_to_ecef_km(bevy_km: DVec3) -> DVec3 {
    DVec3::new(bevy_km.z, bevy_km.x, bevy_km.y)
}

/// Floating origin of the globe layer: the geocentric point (metres) that sits
/// at the render-space origin. Keeps f32 render coordinates small around the
/// area of interest.
#[derive(Resource, Copy, Clone, Debug, PartialEq, Deref)]
pub struct GlobeOrigin(pub DVec3);

impl GlobeOrigin {
    /// Geocentric metres to globe render km, relative to the origin.
    pub fn to_render(&self, ecef_m: DVec3) -> Vec3 {
        ecef_to_bevy_km((ecef_m - self.0) / 1000.0).as_vec3()
    }

    /// Globe render km back to absolute geocentric metres.
    pub fn to_geocentric(&self, render_km: Vec3) -> DVec3 {
        bevy_to_ecef_km(render_km.as_dvec3()) * 1000.0 + self.0
    }
}

/// Globe render direction to a geocentric direction (rotation only, no offset or scale).
pub fn render_dir_to_geocentric(dir: Vec3) -> DVec3 {
    bevy_to_ecef_km(dir.as_dvec3())
}

/// Geocentric direction to a globe render direction.
pub fn geocentric_dir_to_render(dir: DVec3) -> Vec3 {
    ecef_to_bevy_km(dir).as_vec3()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::EulerRot;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_permutation_round_trip() {
        for v in [
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(-6_378_137.0, 0.5, 1e-9),
            DVec3::new(0.0, -0.0, f64::MAX),
        ] {
            assert_eq!(local_to_geocentric(geocentric_to_local(v)), v);
            assert_eq!(geocentric_to_local(local_to_geocentric(v)), v);
        }
    }

    #[test]
    fn test_permutation_maps_pole_to_local_up() {
        let local = geocentric_to_local(DVec3::Z);
        assert_eq!(local, DVec3::Y);
    }

    #[test]
    fn test_render_mirror_round_trip() {
        let v = DVec3::new(12.5, -3.25, 7.0);
        let render = local_to_render(v);
        assert_eq!(render, Vec3::new(12.5, -3.25, -7.0));
        assert!((render_to_local(render) - v).length() < EPSILON);
    }

    #[test]
    fn test_local_rotation_to_render_is_mirrored_basis() {
        let rotation = DMat3::from_euler(EulerRot::YXZ, 0.7, -0.3, 0.2);
        let q = local_rotation_to_render(rotation);
        let transform = Transform::from_rotation(q);

        let forward = local_to_render(rotation * DVec3::Z);
        let up = local_to_render(rotation * DVec3::Y);
        assert!((transform.forward().as_vec3() - forward).length() < 1e-5);
        assert!((transform.up().as_vec3() - up).length() < 1e-5);
    }

    #[test]
    fn test_ecef_bevy_round_trip() {
        let ecef = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(ecef_to_bevy_km(ecef), DVec3::new(2.0, 3.0, 1.0));
        assert_eq!(bevy_to_ecef_km(ecef_to_bevy_km(ecef)), ecef);
    }

    #[test]
    fn test_globe_origin_keeps_nearby_points_small() {
        let origin = GlobeOrigin(DVec3::new(-2_770_000.0, 4_800_000.0, 3_145_000.0));
        let nearby = origin.0 + DVec3::new(120.0, -40.0, 250.0);

        let render = origin.to_render(nearby);
        assert!(render.length() < 1.0);
        assert!((origin.to_geocentric(render) - nearby).length() < 1e-3);
    }

    #[test]
    fn test_render_direction_round_trip() {
        let dir = DVec3::new(0.2, -0.5, 0.8).normalize();
        let back = render_dir_to_geocentric(geocentric_dir_to_render(dir));
        assert!((back - dir).length() < 1e-6);
    }
}
