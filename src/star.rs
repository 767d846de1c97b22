use crate::angle::{acos_clamped, wrap_two_pi, CelestialAngle, SexagesimalUnit};
use crate::FixError;

/// A detected star paired with its catalog position.
///
/// Pixel coordinates are relative to the optical axis with +X right and +Y up.
/// RA is kept in `[0, 2π)` and Dec in `[-π/2, π/2]`, both in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarObservation {
    pub pixel: [f64; 2],
    pub ra_rad: f64,
    pub dec_rad: f64,
}

impl StarObservation {
    /// Build an observation from radians, wrapping RA and validating Dec.
    pub fn new(x: f64, y: f64, ra_rad: f64, dec_rad: f64) -> Result<Self, FixError> {
        if !(x.is_finite() && y.is_finite() && ra_rad.is_finite() && dec_rad.is_finite()) {
            return Err(FixError::InvalidCoordinate(format!(
                "non-finite star data: pixel ({x}, {y}), ra {ra_rad}, dec {dec_rad}"
            )));
        }
        if dec_rad.abs() > std::f64::consts::FRAC_PI_2 {
            return Err(FixError::InvalidCoordinate(format!(
                "declination {:.6}° outside [-90°, 90°]",
                dec_rad.to_degrees()
            )));
        }
        Ok(Self {
            pixel: [x, y],
            ra_rad: wrap_two_pi(ra_rad),
            dec_rad,
        })
    }

    /// Build an observation from catalog angles.
    ///
    /// A sexagesimal RA is read as hours, a sexagesimal Dec as degrees.
    pub fn from_angles(
        x: f64,
        y: f64,
        ra: CelestialAngle,
        dec: CelestialAngle,
    ) -> Result<Self, FixError> {
        Self::new(
            x,
            y,
            ra.to_radians(SexagesimalUnit::Hours),
            dec.to_radians(SexagesimalUnit::Degrees),
        )
    }

    /// Great-circle separation from another star (spherical law of cosines).
    pub fn angular_distance(&self, other: &StarObservation) -> f64 {
        let (sd1, cd1) = self.dec_rad.sin_cos();
        let (sd2, cd2) = other.dec_rad.sin_cos();
        acos_clamped(sd1 * sd2 + cd1 * cd2 * (self.ra_rad - other.ra_rad).cos())
    }
}

/// A star after sky projection.
///
/// `az_rel_rad` is measured from the optical axis' azimuth, increasing
/// eastward. `az_abs_rad` is set once the azimuth origin has been solved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedStar {
    pub observation: StarObservation,
    /// Rotation-corrected pixel position.
    pub projected_pixel: [f64; 2],
    pub alt_rad: f64,
    pub az_rel_rad: f64,
    pub az_abs_rad: Option<f64>,
}

impl ProjectedStar {
    /// Return a copy with the absolute azimuth set to `az_rel + origin` mod 2π.
    pub fn anchored(self, azimuth_origin: f64) -> Self {
        Self {
            az_abs_rad: Some(wrap_two_pi(self.az_rel_rad + azimuth_origin)),
            ..self
        }
    }

    /// Absolute azimuth when anchored, otherwise the relative one.
    pub fn az_rad(&self) -> f64 {
        self.az_abs_rad.unwrap_or(self.az_rel_rad)
    }

    pub fn alt_deg(&self) -> f64 {
        self.alt_rad.to_degrees()
    }

    pub fn az_deg(&self) -> f64 {
        self.az_rad().to_degrees()
    }
}
