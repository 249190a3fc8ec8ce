//! Local frame initialization
//!
//! The overlay scene lives in a local frame whose origin is BasePoint and
//! whose "up" is the direction from BasePoint to BasePointUp. Both points
//! share a longitude/latitude and differ only in height.

use bevy::camera::visibility::RenderLayers;
use bevy::math::{DMat3, DVec3, EulerRot};
use bevy::prelude::*;
use std::f64::consts::FRAC_PI_2;

use crate::core::config::{OverlayConfig, ReferenceConfig};
use crate::core::space::{GlobeOrigin, geocentric_to_local, local_rotation_to_render};
use crate::sync::components::{OVERLAY_LAYER, SceneRoot};

/// Fixed rotation about local X applied after the look-at, so content
/// authored Y-up stands along the local up direction.
pub const UP_CORRECTION_RAD: f64 = FRAC_PI_2;

/// Orientation of the scene root in the local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootTransform {
    look_rotation: DMat3,
    rotation: DMat3,
}

impl RootTransform {
    /// Orient +Z along `direction`, then apply the up correction in local space.
    pub fn looking_along(direction: DVec3) -> Self {
        let yaw = direction.x.atan2(direction.z);
        let pitch = -direction.y.atan2(direction.x.hypot(direction.z));
        let look_rotation = DMat3::from_euler(EulerRot::YXZ, yaw, pitch, 0.0);
        let rotation = look_rotation * DMat3::from_rotation_x(UP_CORRECTION_RAD);
        Self {
            look_rotation,
            rotation,
        }
    }

    /// Look-at forward axis, before the up correction.
    pub fn forward(&self) -> DVec3 {
        self.look_rotation * DVec3::Z
    }

    /// The root's +Y axis after the correction.
    pub fn up(&self) -> DVec3 {
        self.rotation * DVec3::Y
    }

    pub fn rotation(&self) -> DMat3 {
        self.rotation
    }

    /// The root node transform in overlay render space. The root sits at the
    /// local origin (BasePoint).
    pub fn render_transform(&self) -> Transform {
        Transform::from_rotation(local_rotation_to_render(self.rotation))
    }
}

/// BasePoint, BasePointUp and the root orientation. Set once at startup.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// Local-frame BasePoint (metres).
    pub base_point: DVec3,
    /// Local-frame BasePointUp (metres).
    pub base_point_up: DVec3,
    /// BasePoint in the geocentric frame (metres).
    pub base_geocentric: DVec3,
    pub root: RootTransform,
}

impl LocalFrame {
    pub fn from_reference(reference: &ReferenceConfig) -> Self {
        let base_geocentric = reference.base().to_geocentric();
        let base_point = geocentric_to_local(base_geocentric);
        let base_point_up = geocentric_to_local(reference.up().to_geocentric());
        let root = RootTransform::looking_along(base_point_up - base_point);

        Self {
            base_point,
            base_point_up,
            base_geocentric,
            root,
        }
    }

    /// BasePointUp - BasePoint.
    pub fn up_offset(&self) -> DVec3 {
        self.base_point_up - self.base_point
    }

    /// The globe layer renders relative to BasePoint as well.
    pub fn globe_origin(&self) -> GlobeOrigin {
        GlobeOrigin(self.base_geocentric)
    }
}

/// Build the local frame from config, spawn the scene root and publish
/// `LocalFrame` and `GlobeOrigin`.
pub fn setup_local_frame(mut commands: Commands, config: Res<OverlayConfig>) {
    let frame = LocalFrame::from_reference(&config.reference);

    info!(
        "Local frame at lon {:.6} lat {:.6}: base {:?}, up {:?}",
        config.reference.longitude_deg,
        config.reference.latitude_deg,
        frame.base_point,
        frame.base_point_up
    );

    commands.spawn((
        frame.root.render_transform(),
        Visibility::default(),
        RenderLayers::layer(OVERLAY_LAYER),
        SceneRoot,
        Name::new("Scene Root"),
    ));
    commands.insert_resource(frame.globe_origin());
    commands.insert_resource(frame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::GeodeticPoint;
    use crate::core::space::local_to_render;

    const EPSILON: f64 = 1e-9;

    fn assert_parallel(a: DVec3, b: DVec3) {
        let cross = a.normalize().cross(b.normalize()).length();
        assert!(cross < 1e-9, "{a:?} not parallel to {b:?}");
        assert!(a.dot(b) > 0.0, "{a:?} opposes {b:?}");
    }

    #[test]
    fn test_reference_heights_50_and_300() {
        let reference = ReferenceConfig::default();
        let frame = LocalFrame::from_reference(&reference);

        // The offset is the permuted ellipsoid normal scaled by the height difference.
        let (_, _, up) = reference.base().enu_basis();
        let offset = frame.up_offset();
        assert!((offset.length() - 250.0).abs() < 1e-6);
        assert_parallel(offset, geocentric_to_local(up));

        let forward = frame.root.forward();
        assert!((forward.length() - 1.0).abs() < EPSILON);
        assert_parallel(forward, offset);
    }

    #[test]
    fn test_offset_at_pole_is_only_vertical() {
        let reference = ReferenceConfig {
            longitude_deg: 0.0,
            latitude_deg: 90.0,
            base_height_m: 50.0,
            up_height_m: 300.0,
        };
        let frame = LocalFrame::from_reference(&reference);
        let offset = frame.up_offset();

        assert!(offset.x.abs() < 1e-6);
        assert!(offset.z.abs() < 1e-6);
        assert!((offset.y - 250.0).abs() < 1e-6);
    }

    #[test]
    fn test_offset_parallel_for_many_locations() {
        for &(lon, lat) in &[(0.0, 0.0), (-73.9, 40.7), (151.2, -33.9), (179.9, -89.0)] {
            let base = GeodeticPoint::new(lon, lat, 10.0);
            let reference = ReferenceConfig {
                longitude_deg: lon,
                latitude_deg: lat,
                base_height_m: 10.0,
                up_height_m: 2000.0,
            };
            let frame = LocalFrame::from_reference(&reference);
            let (_, _, up) = base.enu_basis();
            assert_parallel(frame.up_offset(), geocentric_to_local(up));
        }
    }

    #[test]
    fn test_up_correction_turns_forward_into_up() {
        let root = RootTransform::looking_along(DVec3::new(0.3, 0.8, -0.5));
        assert!((root.up() - root.forward()).length() < EPSILON);
        // The corrected forward axis points away from the look direction.
        assert!(root.rotation().mul_vec3(DVec3::Z).dot(root.forward()).abs() < EPSILON);
    }

    #[test]
    fn test_looking_along_vertical() {
        let root = RootTransform::looking_along(DVec3::Y * 250.0);
        assert!((root.forward() - DVec3::Y).length() < EPSILON);
        assert!((root.up() - DVec3::Y).length() < EPSILON);
    }

    #[test]
    fn test_root_render_transform_up_is_mirrored_local_up() {
        let frame = LocalFrame::from_reference(&ReferenceConfig::default());
        let transform = frame.root.render_transform();
        let expected = local_to_render(frame.up_offset().normalize());
        assert!((transform.up().as_vec3() - expected).length() < 1e-5);
        assert_eq!(transform.translation, Vec3::ZERO);
    }

    #[test]
    fn test_globe_origin_is_base_point() {
        let reference = ReferenceConfig::default();
        let frame = LocalFrame::from_reference(&reference);
        assert_eq!(frame.globe_origin().0, reference.base().to_geocentric());
        assert_eq!(geocentric_to_local(frame.base_geocentric), frame.base_point);
    }

    #[test]
    fn test_setup_local_frame_spawns_root_once() {
        let mut app = App::new();
        app.insert_resource(OverlayConfig::default());
        app.add_systems(Startup, setup_local_frame);
        app.update();
        app.update();

        let frame = *app.world().resource::<LocalFrame>();
        assert_eq!(
            frame,
            LocalFrame::from_reference(&OverlayConfig::default().reference)
        );
        assert!(app.world().get_resource::<GlobeOrigin>().is_some());

        let mut roots = app
            .world_mut()
            .query_filtered::<&Transform, With<SceneRoot>>();
        let transforms: Vec<Transform> = roots.iter(app.world()).copied().collect();
        assert_eq!(transforms.len(), 1);
        assert_eq!(transforms[0], frame.root.render_transform());
    }
}
