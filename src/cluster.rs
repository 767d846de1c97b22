//! The full position-fix pipeline over one cluster of stars.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use tracing::info;

use crate::camera_model::{derotate, SkyProjector};
use crate::solver::latitude::MIN_STARS;
use crate::solver::{
    AngularScaleSolver, FixConfig, LatitudeAzimuthSolver, LatitudeSolution, LongitudeSolution,
    LongitudeSolver, ScaleEstimate,
};
use crate::{FixError, ProjectedStar, StarObservation};

/// A solved cluster: the stars in horizon coordinates and the observer fix.
///
/// Built by [`StarCluster::solve`], which runs scale, projection, latitude
/// and longitude in order. Every accessor reflects the finished solve; there
/// is no partially solved state.
#[derive(Debug, Clone)]
pub struct StarCluster {
    stars: Vec<ProjectedStar>,
    angular_scale: [f64; 2],
    scale_estimates: Option<[ScaleEstimate; 2]>,
    latitude: LatitudeSolution,
    longitude: LongitudeSolution,
    positional_angle_rad: f64,
    rotation_angle_rad: f64,
    observed_at: DateTime<FixedOffset>,
}

impl StarCluster {
    /// Solve a fix from star observations.
    ///
    /// Pixel coordinates must be relative to the optical axis with +Y up.
    /// The first star anchors relative azimuths.
    pub fn solve(stars: Vec<StarObservation>, config: &FixConfig) -> Result<Self, FixError> {
        check_star_count(&stars)?;
        let rotation = config.rotation_angle_rad();
        let upright: Vec<[f64; 2]> = stars.iter().map(|s| derotate(s.pixel, rotation)).collect();

        let estimates = AngularScaleSolver::new(config.frame_half_extent).solve(&stars, &upright)?;
        let angular_scale = [estimates[0].angle_rad, estimates[1].angle_rad];
        info!(
            "Angular scale {:.6} × {:.6} rad over half extents {:?}",
            angular_scale[0], angular_scale[1], config.frame_half_extent
        );
        Self::finish(stars, angular_scale, Some(estimates), config)
    }

    /// Solve a fix with known angular half-field extents `[x, y]` in radians,
    /// referring to `config.frame_half_extent`.
    pub fn solve_with_scale(
        stars: Vec<StarObservation>,
        angular_scale: [f64; 2],
        config: &FixConfig,
    ) -> Result<Self, FixError> {
        check_star_count(&stars)?;
        for (axis, scale) in [crate::Axis::X, crate::Axis::Y].into_iter().zip(angular_scale) {
            if !(scale.is_finite() && scale > 0.0 && scale < std::f64::consts::FRAC_PI_2) {
                return Err(FixError::UnsolvableScale {
                    axis,
                    reason: format!("given half-field angle {scale} outside (0, π/2)"),
                });
            }
        }
        Self::finish(stars, angular_scale, None, config)
    }

    fn finish(
        stars: Vec<StarObservation>,
        angular_scale: [f64; 2],
        scale_estimates: Option<[ScaleEstimate; 2]>,
        config: &FixConfig,
    ) -> Result<Self, FixError> {
        let projector = SkyProjector {
            angular_scale,
            half_extent: config.frame_half_extent,
            positional_angle_rad: config.positional_angle_rad(),
            rotation_angle_rad: config.rotation_angle_rad(),
            azimuth_resolution: config.azimuth_resolution,
        };
        let projected = projector.project_all(&stars);

        let latitude = LatitudeAzimuthSolver::new(config.latitude.clone(), config.hemisphere)
            .solve(&projected)?;
        let origin = latitude.azimuth_origin();
        let anchored: Vec<ProjectedStar> = projected.into_iter().map(|s| s.anchored(origin)).collect();

        let longitude = LongitudeSolver::new(&config.observed_at, config.solar_model)
            .solve(&anchored, latitude.latitude())?;

        info!(
            "Fix: latitude {:.6}°, longitude {:.6}° from {} stars",
            latitude.latitude().to_degrees(),
            longitude.longitude.to_degrees(),
            anchored.len()
        );
        Ok(Self {
            stars: anchored,
            angular_scale,
            scale_estimates,
            latitude,
            longitude,
            positional_angle_rad: config.positional_angle_rad(),
            rotation_angle_rad: config.rotation_angle_rad(),
            observed_at: config.observed_at,
        })
    }

    /// Stars with altitude and absolute azimuth, in input order.
    pub fn stars(&self) -> &[ProjectedStar] {
        &self.stars
    }

    pub fn star_count(&self) -> usize {
        self.stars.len()
    }

    pub fn latitude_rad(&self) -> f64 {
        self.latitude.latitude()
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude_rad().to_degrees()
    }

    pub fn longitude_rad(&self) -> f64 {
        self.longitude.longitude
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude_rad().to_degrees()
    }

    /// Half-field angle along x, radians.
    pub fn angular_scale_x(&self) -> f64 {
        self.angular_scale[0]
    }

    /// Half-field angle along y, radians.
    pub fn angular_scale_y(&self) -> f64 {
        self.angular_scale[1]
    }

    /// Per-axis pair statistics, `None` when the scale was given.
    pub fn scale_estimates(&self) -> Option<&[ScaleEstimate; 2]> {
        self.scale_estimates.as_ref()
    }

    /// Offset added to relative azimuths, radians in `[0, 2π)`.
    pub fn azimuth_origin(&self) -> f64 {
        self.latitude.azimuth_origin()
    }

    pub fn positional_angle_rad(&self) -> f64 {
        self.positional_angle_rad
    }

    pub fn rotation_angle_rad(&self) -> f64 {
        self.rotation_angle_rad
    }

    pub fn observed_at(&self) -> &DateTime<FixedOffset> {
        &self.observed_at
    }

    pub fn latitude_solution(&self) -> &LatitudeSolution {
        &self.latitude
    }

    pub fn longitude_solution(&self) -> &LongitudeSolution {
        &self.longitude
    }

    /// Per-star longitude estimates in radians, `None` where the hour angle
    /// was invalid.
    pub fn longitude_estimates(&self) -> &[Option<f64>] {
        &self.longitude.per_star
    }

    /// Write the plain-text report.
    pub fn write_report<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "Number of stars: {}", self.stars.len())?;
        writeln!(out, "Angular X size: {:.6} radians", self.angular_scale[0])?;
        writeln!(out, "Angular Y size: {:.6} radians", self.angular_scale[1])?;
        for star in &self.stars {
            writeln!(
                out,
                "{:.6} {:.6} {:.6} {:.6}",
                star.observation.ra_rad,
                star.observation.dec_rad,
                star.alt_rad,
                star.az_rad()
            )?;
            writeln!(out)?;
        }
        writeln!(out, "Latitude: {:.6} deg", self.latitude_deg())?;
        writeln!(out, "Longitude: {:.6} deg", self.longitude_deg())?;
        Ok(())
    }

    /// Write the report to a file, replacing any existing one.
    pub fn save_report<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating report {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        self.write_report(&mut out)
            .and_then(|()| out.flush())
            .with_context(|| format!("writing report {}", path.display()))
    }
}

fn check_star_count(stars: &[StarObservation]) -> Result<(), FixError> {
    if stars.len() < MIN_STARS {
        return Err(FixError::InsufficientStars {
            found: stars.len(),
            required: MIN_STARS,
        });
    }
    Ok(())
}
