//! Core coordinate utilities
//!
//! Geodetic points on the WGS84 ellipsoid and their geocentric (ECEF)
//! counterparts:
//! - `GeodeticPoint`: longitude/latitude in degrees, height in metres
//! - geodetic -> geocentric conversion and the local east/north/up basis
//! - `Coordinates`: lat/lon recovered from a globe-render direction, used for texture UVs

use bevy::math::{DVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;

/// WGS84 semi-major axis in metres.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 first eccentricity squared: e² = 2f - f²
pub const WGS84_E2: f64 = 2.0 * WGS84_F - WGS84_F * WGS84_F;
/// WGS84 semi-minor axis in metres.
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

// ========================= Errors =========================

#[derive(Debug, Clone, PartialEq)]
pub struct CoordError {
    pub msg: String,
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for CoordError {}

// ========================= Geodetic points =========================

/// A location on the WGS84 ellipsoid.
///
/// Angles are kept in degrees because that is how they are configured; the
/// conversion to radians happens at the point of use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub height_m: f64,
}

impl GeodeticPoint {
    /// Unchecked constructor for constants and already validated input.
    pub const fn new(longitude_deg: f64, latitude_deg: f64, height_m: f64) -> Self {
        Self {
            longitude_deg,
            latitude_deg,
            height_m,
        }
    }

    /// Validating constructor.
    pub fn from_degrees(
        longitude_deg: f64,
        latitude_deg: f64,
        height_m: f64,
    ) -> Result<Self, CoordError> {
        let point = Self::new(longitude_deg, latitude_deg, height_m);
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), CoordError> {
        if !(-90.0..=90.0).contains(&self.latitude_deg) {
            return Err(CoordError {
                msg: format!("Invalid latitude: {:?}", self.latitude_deg),
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude_deg) {
            return Err(CoordError {
                msg: format!("Invalid longitude: {:?}", self.longitude_deg),
            });
        }
        if !self.height_m.is_finite() {
            return Err(CoordError {
                msg: format!("Invalid height: {:?}", self.height_m),
            });
        }
        Ok(())
    }

    /// Same horizontal location, different height.
    pub fn with_height(&self, height_m: f64) -> Self {
        Self::new(self.longitude_deg, self.latitude_deg, height_m)
    }

    /// Geocentric (ECEF) position in metres.
    pub fn to_geocentric(&self) -> DVec3 {
        let lon = self.longitude_deg.to_radians();
        let lat = self.latitude_deg.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();

        // Radius of curvature in the prime vertical
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let h = self.height_m;

        DVec3::new(
            (n + h) * cos_lat * cos_lon,
            (n + h) * cos_lat * sin_lon,
            (n * (1.0 - WGS84_E2) + h) * sin_lat,
        )
    }

    /// East, north and up unit vectors at this point, in the geocentric frame.
    ///
    /// Up is the ellipsoid normal, which is also the direction in which
    /// `to_geocentric` moves when only the height changes.
    pub fn enu_basis(&self) -> (DVec3, DVec3, DVec3) {
        let lon = self.longitude_deg.to_radians();
        let lat = self.latitude_deg.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();

        let east = DVec3::new(-sin_lon, cos_lon, 0.0);
        let north = DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
        let up = DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);
        (east, north, up)
    }
}

// ========================= Texture coordinates =========================

#[derive(Debug)]
pub struct Coordinates {
    // Stored internally in radians (f64 for precision)
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Vec3> for Coordinates {
    /// Direction in the globe render frame (Y toward the north pole).
    fn from(value: Vec3) -> Self {
        let n = value.normalize().as_dvec3();
        let latitude = n.y.clamp(-1.0, 1.0).asin();
        let longitude = n.x.atan2(n.z);
        Coordinates {
            latitude,
            longitude,
        }
    }
}

impl Coordinates {
    pub fn as_degrees(&self) -> (f64, f64) {
        (self.latitude.to_degrees(), self.longitude.to_degrees())
    }

    /// Equirectangular UV: u runs -180..180 -> 0..1, v runs 90..-90 -> 0..1.
    pub fn texture_uv(&self) -> [f32; 2] {
        let u = (self.longitude + PI) / TAU;
        let v = (FRAC_PI_2 - self.latitude) / PI;
        [u.clamp(0.0, 1.0) as f32, v.clamp(0.0, 1.0) as f32]
    }
}

// =================================== Tests ===================================
