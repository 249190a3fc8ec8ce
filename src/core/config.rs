//! Overlay configuration
//!
//! Loaded once at startup from JSON. Resolution order:
//! - `$GLOBE_OVERLAY_CONFIG` if set
//! - `<platform config dir>/globe-overlay/config.json`
//!   (Linux: ~/.config/globe-overlay/, macOS: ~/Library/Application Support/globe-overlay/)
//!
//! A missing file is not an error; defaults are used.

use anyhow::{Context, bail};
use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::coordinates::GeodeticPoint;
use crate::sync::pose::EulerSolver;

pub const CONFIG_ENV_VAR: &str = "GLOBE_OVERLAY_CONFIG";

const DEFAULT_LONGITUDE_DEG: f64 = 120.24318610821572;
const DEFAULT_LATITUDE_DEG: f64 = 29.7218163632983;

/// Two geodetic points at one horizontal location defining the local frame.
///
/// BasePoint and BasePointUp share a single longitude/latitude and differ
/// only in height, so local up always lies along the ellipsoid normal at the
/// site. A vertically misaligned pair (an up point with its own lon/lat)
/// cannot be configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    /// Height of BasePoint, the local origin.
    pub base_height_m: f64,
    /// Height of BasePointUp; `up - base` is local up.
    pub up_height_m: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            longitude_deg: DEFAULT_LONGITUDE_DEG,
            latitude_deg: DEFAULT_LATITUDE_DEG,
            base_height_m: 50.0,
            up_height_m: 300.0,
        }
    }
}

impl ReferenceConfig {
    pub fn base(&self) -> GeodeticPoint {
        GeodeticPoint::new(self.longitude_deg, self.latitude_deg, self.base_height_m)
    }

    pub fn up(&self) -> GeodeticPoint {
        GeodeticPoint::new(self.longitude_deg, self.latitude_deg, self.up_height_m)
    }
}

/// Initial globe camera flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyToConfig {
    pub destination: GeodeticPoint,
    /// Clockwise from north.
    pub heading_deg: f64,
    /// Negative looks down; -90 is straight down.
    pub pitch_deg: f64,
}

impl Default for FlyToConfig {
    fn default() -> Self {
        Self {
            destination: GeodeticPoint::new(DEFAULT_LONGITUDE_DEG, DEFAULT_LATITUDE_DEG, 300.0),
            heading_deg: 0.0,
            pitch_deg: -90.0,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub reference: ReferenceConfig,
    pub fly_to: FlyToConfig,
    pub euler_solver: EulerSolver,
    /// Asset path of an equirectangular globe texture. Plain colour when unset.
    pub globe_texture: Option<String>,
    pub show_root_axes: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            reference: ReferenceConfig::default(),
            fly_to: FlyToConfig::default(),
            euler_solver: EulerSolver::default(),
            globe_texture: None,
            show_root_axes: false,
        }
    }
}

impl OverlayConfig {
    /// Resolve the config path and load it.
    ///
    /// Returns defaults when no file exists at the resolved path.
    pub fn load() -> Result<Self, anyhow::Error> {
        let Some(path) = Self::resolve_path() else {
            info!("No config directory available, using default overlay config");
            return Ok(Self::default());
        };
        Self::load_from_path(&path)
    }

    pub fn resolve_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        let proj_dirs = ProjectDirs::from("", "", "globe-overlay")?;
        Some(proj_dirs.config_dir().join("config.json"))
    }

    /// Read and validate a config file.
    ///
    /// Returns defaults if the file doesn't exist.
    /// Returns Err if it exists but cannot be read, parsed or validated.
    pub fn load_from_path(path: &Path) -> Result<Self, anyhow::Error> {
        if !path.exists() {
            info!("Overlay config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading overlay config {}", path.display()))?;
        let config: OverlayConfig = serde_json::from_str(&contents)
            .with_context(|| format!("parsing overlay config {}", path.display()))?;
        config.validate()?;

        info!("Loaded overlay config from {}", path.display());
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), anyhow::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.reference.base().validate()?;
        self.reference.up().validate()?;
        if self.reference.up_height_m == self.reference.base_height_m {
            bail!(
                "reference heights must differ (both are {} m)",
                self.reference.base_height_m
            );
        }
        self.fly_to.destination.validate()?;
        if !self.fly_to.heading_deg.is_finite() || !self.fly_to.pitch_deg.is_finite() {
            bail!("fly_to heading and pitch must be finite");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(test_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "globe-overlay-config-{}-{}-{}",
            test_name,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn test_defaults_match_reference_site() {
        let config = OverlayConfig::default();
        assert_eq!(config.reference.base_height_m, 50.0);
        assert_eq!(config.reference.up_height_m, 300.0);
        assert_eq!(config.fly_to.destination.height_m, 300.0);
        assert_eq!(config.fly_to.pitch_deg, -90.0);
        assert_eq!(config.euler_solver, EulerSolver::FourQuadrant);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = unique_temp_dir("missing");
        let config = OverlayConfig::load_from_path(&dir.join("config.json")).unwrap();
        assert_eq!(config, OverlayConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = unique_temp_dir("save-load");
        let path = dir.join("config.json");

        let mut config = OverlayConfig::default();
        config.reference.longitude_deg = -122.4;
        config.reference.latitude_deg = 37.8;
        config.euler_solver = EulerSolver::Branching;
        config.globe_texture = Some("earth.png".to_string());
        config.save_to_path(&path).unwrap();

        let loaded = OverlayConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = unique_temp_dir("partial");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(
            &path,
            r#"{ "reference": { "base_height_m": 10.0 }, "euler_solver": "branching" }"#,
        )
        .unwrap();

        let loaded = OverlayConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.reference.base_height_m, 10.0);
        assert_eq!(loaded.reference.up_height_m, 300.0);
        assert_eq!(loaded.reference.longitude_deg, DEFAULT_LONGITUDE_DEG);
        assert_eq!(loaded.euler_solver, EulerSolver::Branching);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_latitude_rejected() {
        let dir = unique_temp_dir("invalid-lat");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, r#"{ "reference": { "latitude_deg": 95.0 } }"#).unwrap();

        let err = OverlayConfig::load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("latitude"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reference_points_differ_only_in_height() {
        let mut config = OverlayConfig::default();
        config.reference.longitude_deg = -70.5;
        config.reference.latitude_deg = -33.2;
        let (base, up) = (config.reference.base(), config.reference.up());
        assert_eq!(base.longitude_deg, up.longitude_deg);
        assert_eq!(base.latitude_deg, up.latitude_deg);
        assert_eq!(up.height_m - base.height_m, 250.0);

        // So local up is the ellipsoid normal at the site.
        let along = (up.to_geocentric() - base.to_geocentric()).normalize();
        let (_, _, normal) = base.enu_basis();
        assert!(along.dot(normal) > 1.0 - 1e-12);
    }

    #[test]
    fn test_equal_heights_rejected() {
        let mut config = OverlayConfig::default();
        config.reference.up_height_m = config.reference.base_height_m;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_error() {
        let dir = unique_temp_dir("malformed");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(OverlayConfig::load_from_path(&path).is_err());

        let _ = fs::remove_dir_all(&dir);
    }
}
