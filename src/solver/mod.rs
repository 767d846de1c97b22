//! Position fix solver.
//!
//! The fix is computed in four strictly ordered stages:
//!
//! 1. **Angular scale** ([`scale`]): per-axis half-field angle from pairs of
//!    stars, using pixel separations against catalog separations.
//! 2. **Sky projection** ([`crate::camera_model`]): each pixel becomes an
//!    altitude and an azimuth relative to the optical axis.
//! 3. **Latitude and azimuth origin** ([`latitude`]): a 5×5 multi-start
//!    Levenberg-Marquardt search ([`lm`]) over `(azimuth, cos φ)` with a
//!    hemisphere consistency check.
//! 4. **Longitude** ([`longitude`]): hour angles turned into local apparent
//!    solar time, corrected by the equation of time, compared with UT.
//!
//! [`StarCluster`](crate::StarCluster) runs the whole pipeline.

pub mod latitude;
pub mod lm;
pub mod longitude;
pub mod scale;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

use crate::camera_model::AzimuthResolution;
use crate::ephemeris::SolarModel;
use crate::FixError;

pub use latitude::{CandidateFix, LatitudeAzimuthSolver, LatitudeSolution};
pub use lm::LmConfig;
pub use longitude::{LongitudeSolution, LongitudeSolver};
pub use scale::{AngularScaleSolver, ScaleEstimate};

// ── Hemisphere hint ─────────────────────────────────────────────────────────

/// Hemisphere the observer is known to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hemisphere {
    #[default]
    North,
    South,
}

impl Hemisphere {
    /// Whether `cos φ` (signed by the solver's convention) is on this side.
    pub fn admits(self, cos_latitude: f64) -> bool {
        match self {
            Hemisphere::North => cos_latitude >= 0.0,
            Hemisphere::South => cos_latitude <= 0.0,
        }
    }
}

impl FromStr for Hemisphere {
    type Err = FixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Hemisphere::North),
            "south" | "s" => Ok(Hemisphere::South),
            _ => Err(FixError::InvalidHemisphere(s.to_string())),
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hemisphere::North => write!(f, "North"),
            Hemisphere::South => write!(f, "South"),
        }
    }
}

// ── Latitude search tuning ──────────────────────────────────────────────────

/// Parameters of the multi-start latitude / azimuth search.
#[derive(Debug, Clone)]
pub struct LatitudeSolveConfig {
    /// Starts per dimension. Default 5 (25 starts).
    pub grid_size: usize,
    /// Local solver settings for every start.
    pub lm: LmConfig,
    /// A candidate is rejected when its mean unsquared residual exceeds the
    /// mirrored-latitude residual by more than this. Default 1e-3.
    ///
    /// Near the equator the two residuals almost coincide, so pixel noise can
    /// reject the better candidate and leave a worse one. At 1° latitude with
    /// 2% pixel noise this costs up to a few degrees. A larger tolerance avoids
    /// that at the price of accepting wrong-hemisphere roots; `f64::INFINITY`
    /// disables the check.
    pub hemisphere_tolerance: f64,
    /// Reject candidates whose largest quadratic residual exceeds this.
    /// Default `None`: the smallest residual wins whatever its size.
    pub max_residual: Option<f64>,
}

impl Default for LatitudeSolveConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            lm: LmConfig::default(),
            hemisphere_tolerance: 1e-3,
            max_residual: None,
        }
    }
}

// ── Fix configuration ───────────────────────────────────────────────────────

/// Everything the pipeline needs besides the stars.
#[derive(Debug, Clone)]
pub struct FixConfig {
    /// Tilt of the optical axis above the horizon, degrees.
    pub positional_angle_deg: f64,
    /// Camera roll about the optical axis, counter-clockwise, degrees.
    pub rotation_angle_deg: f64,
    /// Exposure time with its UTC offset.
    pub observed_at: DateTime<FixedOffset>,
    /// Hemisphere hint for the latitude search. Default North.
    pub hemisphere: Hemisphere,
    /// Pixel half-extents `[x, y]` the angular scale refers to.
    /// Any consistent unit works since the projection is scale-relative.
    /// Default `[50, 50]` (a normalized 100×100 frame).
    pub frame_half_extent: [f64; 2],
    /// Relative azimuth quadrant handling. Default principal value.
    pub azimuth_resolution: AzimuthResolution,
    /// Sun right ascension model. Default low-precision ephemeris.
    pub solar_model: SolarModel,
    /// Multi-start search parameters.
    pub latitude: LatitudeSolveConfig,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            positional_angle_deg: 0.0,
            rotation_angle_deg: 0.0,
            observed_at: DateTime::default(),
            hemisphere: Hemisphere::North,
            frame_half_extent: [50.0, 50.0],
            azimuth_resolution: AzimuthResolution::Principal,
            solar_model: SolarModel::LowPrecision,
            latitude: LatitudeSolveConfig::default(),
        }
    }
}

impl FixConfig {
    /// Configuration for a camera pose and exposure time, other fields default.
    pub fn new(
        positional_angle_deg: f64,
        rotation_angle_deg: f64,
        observed_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            positional_angle_deg,
            rotation_angle_deg,
            observed_at,
            ..Default::default()
        }
    }

    /// Like [`FixConfig::new`], parsing an RFC 3339 timestamp such as
    /// `2025-04-25T23:46:00+02:00`.
    pub fn from_rfc3339(
        positional_angle_deg: f64,
        rotation_angle_deg: f64,
        observed_at: &str,
    ) -> Result<Self, FixError> {
        let observed_at = DateTime::parse_from_rfc3339(observed_at.trim())?;
        Ok(Self::new(positional_angle_deg, rotation_angle_deg, observed_at))
    }

    pub fn positional_angle_rad(&self) -> f64 {
        self.positional_angle_deg.to_radians()
    }

    pub fn rotation_angle_rad(&self) -> f64 {
        self.rotation_angle_deg.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hemisphere_parse() {
        assert_eq!("North".parse::<Hemisphere>().unwrap(), Hemisphere::North);
        assert_eq!(" south ".parse::<Hemisphere>().unwrap(), Hemisphere::South);
        assert!(matches!(
            "East".parse::<Hemisphere>(),
            Err(FixError::InvalidHemisphere(_))
        ));
        assert_eq!(Hemisphere::South.to_string(), "South");
    }

    #[test]
    fn test_hemisphere_admits() {
        assert!(Hemisphere::North.admits(0.6));
        assert!(!Hemisphere::North.admits(-0.6));
        assert!(Hemisphere::South.admits(-0.6));
        assert!(Hemisphere::North.admits(0.0) && Hemisphere::South.admits(0.0));
    }

    #[test]
    fn test_config_from_rfc3339() {
        let config = FixConfig::from_rfc3339(81.96, 29.99, "2025-04-25T23:46:00+02:00").unwrap();
        assert_eq!(config.observed_at.offset().local_minus_utc(), 7200);
        assert_eq!(config.frame_half_extent, [50.0, 50.0]);
        assert_eq!(config.latitude.grid_size, 5);
        assert!((config.positional_angle_rad() - 81.96_f64.to_radians()).abs() < 1e-15);
    }

    #[test]
    fn test_config_rejects_bad_timestamp() {
        let err = FixConfig::from_rfc3339(10.0, 0.0, "25/04/2025 23:46").unwrap_err();
        assert!(matches!(err, FixError::InvalidTimestamp(_)), "got {err:?}");
    }
}
