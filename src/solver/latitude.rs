//! Observer latitude and azimuth origin from projected stars.
//!
//! With `u = cos φ` and a trial azimuth `az` for a star, the altitude relation
//! `sin Alt = sin φ sin Dec + cos φ cos Dec cos H` rearranges into a quadratic
//! in `u`:
//!
//! ```text
//! a = cos²Alt·cos²az + sin²Alt
//! b = 2·cos Alt·cos az·sin Dec
//! c = sin²Dec − sin²Alt
//! r = a·u² + b·u + c
//! ```
//!
//! All stars share one unknown azimuth offset, so each star's trial azimuth is
//! `az0 + (Az_rel_i − Az_rel_0)`. The pair `(az0, u)` is found by
//! Levenberg-Marquardt from a grid of starts and the candidate with the
//! smallest worst-case residual wins.
//!
//! Squaring discards the sign of `cos φ`: `(az0, u)` and `(az0 + π, −u)` give
//! identical residuals. Candidates are folded into the hinted hemisphere and
//! then checked against the unsquared relation, which does tell the two
//! hemispheres apart.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::Vector2;
use tracing::{debug, info};

use super::lm::{optimize, ResidualModel};
use super::{Hemisphere, LatitudeSolveConfig};
use crate::angle::{acos_clamped, wrap_two_pi};
use crate::{FixError, ProjectedStar};

/// Minimum number of stars for a latitude solve.
pub const MIN_STARS: usize = 3;

/// One accepted start of the multi-start search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFix {
    /// Latitude in `[-π/2, π/2]`, radians.
    pub latitude: f64,
    /// Offset from relative to absolute (north-referenced) azimuth, radians.
    pub azimuth_origin: f64,
    /// Largest absolute quadratic residual across stars.
    pub max_abs_residual: f64,
    /// Grid indices `(i, j)` of the start that produced it.
    pub start: (usize, usize),
}

/// Result of the latitude / azimuth solve.
#[derive(Debug, Clone)]
pub struct LatitudeSolution {
    pub best: CandidateFix,
    /// Starts whose local solve converged.
    pub converged_starts: usize,
    /// Candidates folded across the equator into the hinted hemisphere.
    pub mirrored: usize,
    /// Candidates rejected by the unsquared consistency check.
    pub rejected_hemisphere: usize,
    /// All surviving candidates in grid scan order.
    pub candidates: Vec<CandidateFix>,
}

impl LatitudeSolution {
    pub fn latitude(&self) -> f64 {
        self.best.latitude
    }

    pub fn azimuth_origin(&self) -> f64 {
        self.best.azimuth_origin
    }
}

/// Per-star inputs to the quadratic residuals.
struct QuadraticResiduals {
    alt: Vec<f64>,
    /// `Az_rel_i − Az_rel_0`
    az_offset: Vec<f64>,
    sin_dec: Vec<f64>,
}

impl QuadraticResiduals {
    fn new(stars: &[ProjectedStar]) -> Self {
        let anchor = stars.first().map_or(0.0, |s| s.az_rel_rad);
        Self {
            alt: stars.iter().map(|s| s.alt_rad).collect(),
            az_offset: stars.iter().map(|s| s.az_rel_rad - anchor).collect(),
            sin_dec: stars.iter().map(|s| s.observation.dec_rad.sin()).collect(),
        }
    }
}

impl ResidualModel for QuadraticResiduals {
    fn evaluate(&self, params: &Vector2<f64>, residuals: &mut Vec<f64>, jacobian: &mut Vec<[f64; 2]>) {
        residuals.clear();
        jacobian.clear();
        let (az0, u) = (params[0], params[1]);
        for ((alt, offset), sin_dec) in self.alt.iter().zip(&self.az_offset).zip(&self.sin_dec) {
            let (sa, ca) = alt.sin_cos();
            let (sz, cz) = (az0 + offset).sin_cos();

            let a = ca * ca * cz * cz + sa * sa;
            let b = 2.0 * ca * cz * sin_dec;
            let c = sin_dec * sin_dec - sa * sa;
            residuals.push(u * u * a + u * b + c);

            let da = -2.0 * ca * ca * cz * sz;
            let db = -2.0 * ca * sin_dec * sz;
            jacobian.push([u * u * da + u * db, 2.0 * u * a + b]);
        }
    }
}

/// Mean absolute error of `sin φ sin Alt + cos φ cos Alt cos Az − sin Dec`
/// with `Az = Az_rel + origin`.
pub fn mean_unsquared_residual(stars: &[ProjectedStar], latitude: f64, azimuth_origin: f64) -> f64 {
    if stars.is_empty() {
        return 0.0;
    }
    let (sp, cp) = latitude.sin_cos();
    let total: f64 = stars
        .iter()
        .map(|s| {
            let (sa, ca) = s.alt_rad.sin_cos();
            let az = s.az_rel_rad + azimuth_origin;
            (sp * sa + cp * ca * az.cos() - s.observation.dec_rad.sin()).abs()
        })
        .sum();
    total / stars.len() as f64
}

/// Multi-start latitude / azimuth-origin solver.
#[derive(Debug, Clone)]
pub struct LatitudeAzimuthSolver {
    pub config: LatitudeSolveConfig,
    pub hemisphere: Hemisphere,
}

impl LatitudeAzimuthSolver {
    pub fn new(config: LatitudeSolveConfig, hemisphere: Hemisphere) -> Self {
        Self { config, hemisphere }
    }

    /// Solve for latitude and azimuth origin.
    ///
    /// The first star anchors the relative azimuths.
    pub fn solve(&self, stars: &[ProjectedStar]) -> Result<LatitudeSolution, FixError> {
        if stars.len() < MIN_STARS {
            return Err(FixError::InsufficientStars {
                found: stars.len(),
                required: MIN_STARS,
            });
        }
        let model = QuadraticResiduals::new(stars);
        let anchor_az_rel = stars[0].az_rel_rad;
        let n = self.config.grid_size.max(1);

        let mut converged_starts = 0;
        let mut mirrored = 0;
        let mut rejected_hemisphere = 0;
        let mut candidates = Vec::new();

        for i in 1..=n {
            for j in 1..=n {
                let start = Vector2::new(TAU * i as f64 / n as f64, PI * j as f64 / n as f64);
                let result = optimize(&model, start, &self.config.lm);
                if !result.converged {
                    debug!("start ({i}, {j}): no convergence after {} iterations", result.iterations);
                    continue;
                }
                converged_starts += 1;

                let (mut az0, mut u) = (result.params[0], result.params[1]);
                if !(-1.0..=1.0).contains(&u) {
                    debug!("start ({i}, {j}): cos φ = {u:.6} out of range");
                    continue;
                }
                if !self.hemisphere.admits(u) {
                    u = -u;
                    az0 += PI;
                    mirrored += 1;
                }

                let mut latitude = acos_clamped(u);
                if latitude > FRAC_PI_2 {
                    latitude -= PI;
                }
                let azimuth_origin = if u >= 0.0 {
                    wrap_two_pi(az0 + PI - anchor_az_rel)
                } else {
                    wrap_two_pi(az0 - anchor_az_rel)
                };

                let at_hint = mean_unsquared_residual(stars, latitude, azimuth_origin);
                let at_mirror = mean_unsquared_residual(stars, -latitude, azimuth_origin);
                if at_hint - at_mirror > self.config.hemisphere_tolerance {
                    debug!(
                        "start ({i}, {j}): φ = {:.4}° inconsistent with {} hemisphere ({at_hint:.2e} vs {at_mirror:.2e})",
                        latitude.to_degrees(),
                        self.hemisphere
                    );
                    rejected_hemisphere += 1;
                    continue;
                }

                let max_abs_residual = result.max_abs_residual();
                if self
                    .config
                    .max_residual
                    .is_some_and(|limit| max_abs_residual > limit)
                {
                    debug!("start ({i}, {j}): residual {max_abs_residual:.3e} above limit");
                    continue;
                }

                let candidate = CandidateFix {
                    latitude,
                    azimuth_origin,
                    max_abs_residual,
                    start: (i, j),
                };
                debug!(
                    "start ({i}, {j}): φ = {:.6}°, origin = {:.4}°, max residual {:.3e}",
                    latitude.to_degrees(),
                    azimuth_origin.to_degrees(),
                    candidate.max_abs_residual
                );
                candidates.push(candidate);
            }
        }

        // First minimum in scan order wins ties
        let best = candidates
            .iter()
            .copied()
            .reduce(|best, c| {
                if c.max_abs_residual < best.max_abs_residual {
                    c
                } else {
                    best
                }
            })
            .ok_or(FixError::NoConvergedLatitudeCandidate {
                converged: converged_starts,
                rejected_hemisphere,
            })?;

        info!(
            "Latitude {:.6}° (azimuth origin {:.4}°, max residual {:.3e}, {}/{} candidates)",
            best.latitude.to_degrees(),
            best.azimuth_origin.to_degrees(),
            best.max_abs_residual,
            candidates.len(),
            n * n
        );

        Ok(LatitudeSolution {
            best,
            converged_starts,
            mirrored,
            rejected_hemisphere,
            candidates,
        })
    }
}
