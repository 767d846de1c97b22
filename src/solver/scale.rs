//! Angular field-of-view scale from pixel / angular separation pairs.
//!
//! For two stars on the same side of the optical axis, the pixel offsets
//! `a` (nearer star) and `a + b` (farther star) together with their angular
//! separation projected onto the axis, `β`, fix the focal length. Writing
//! `L = a + b + c` for the half-frame extent, the half-field angle `s`
//! satisfies a quadratic whose smaller root is the physical one:
//!
//! ```text
//! D = b² − 4(a+b)·tan²β·a
//! x = (b ± √D) / (2(a+b)·tan β)
//! s = arctan(L·x / a)
//! ```
//!
//! Every usable pair contributes one estimate. Estimates outside a 2σ band
//! around their mean are dropped and the survivors averaged.

use tracing::debug;

use crate::angle::asin_clamped;
use crate::error::Axis;
use crate::{FixError, StarObservation};

/// Relative size below which a pixel offset counts as zero.
const DEGENERATE_PIXEL_FRACTION: f64 = 1e-12;
/// Relative perpendicular spread below which points count as colinear.
const COLINEAR_TOLERANCE: f64 = 1e-9;

/// Solved half-field angle for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleEstimate {
    /// Half-field angle in radians, matching the solver's half extent.
    pub angle_rad: f64,
    /// Number of pairs that produced an estimate.
    pub pair_count: usize,
    /// Number of estimates kept by the sigma trim.
    pub retained: usize,
}

/// Solves the angular half-field extent along each pixel axis.
#[derive(Debug, Clone)]
pub struct AngularScaleSolver {
    /// Pixel half-extents `[x, y]` the angles refer to.
    pub half_extent: [f64; 2],
    /// Width of the retained band in standard deviations.
    pub trim_sigma: f64,
}

impl AngularScaleSolver {
    pub fn new(half_extent: [f64; 2]) -> Self {
        Self {
            half_extent,
            trim_sigma: 2.0,
        }
    }

    /// Solve both axes.
    ///
    /// `upright` holds the rotation-corrected pixel of each star, in the same
    /// order as `stars`. Colinear pixels leave both axes unsolvable; that error
    /// carries `Axis::X` and says so in its reason.
    pub fn solve(
        &self,
        stars: &[StarObservation],
        upright: &[[f64; 2]],
    ) -> Result<[ScaleEstimate; 2], FixError> {
        if is_colinear(upright) {
            return Err(FixError::UnsolvableScale {
                axis: Axis::X,
                reason: "star pixel positions are colinear, both axes unsolvable".to_string(),
            });
        }
        let x = self.solve_axis(stars, upright, Axis::X)?;
        let y = self.solve_axis(stars, upright, Axis::Y)?;
        Ok([x, y])
    }

    /// Solve a single axis.
    pub fn solve_axis(
        &self,
        stars: &[StarObservation],
        upright: &[[f64; 2]],
        axis: Axis,
    ) -> Result<ScaleEstimate, FixError> {
        let k = axis.index();
        let half_extent = self.half_extent[k];
        let mut estimates = Vec::new();

        for i in 0..stars.len() {
            for j in (i + 1)..stars.len() {
                let (ci, cj) = (upright[i][k], upright[j][k]);
                // Pairs straddling the axis are not monotonic in the model
                if ci * cj <= 0.0 {
                    continue;
                }
                let planar = (upright[i][0] - upright[j][0]).hypot(upright[i][1] - upright[j][1]);
                if planar <= 0.0 {
                    continue;
                }
                let along_axis = (ci - cj).abs();
                let separation = stars[i].angular_distance(&stars[j]);
                let beta = asin_clamped(separation.sin() * along_axis / planar);

                let (near, far) = if ci.abs() <= cj.abs() {
                    (ci.abs(), cj.abs())
                } else {
                    (cj.abs(), ci.abs())
                };
                if let Some(angle) = pair_scale_estimate(near, far - near, half_extent, beta) {
                    estimates.push(angle);
                }
            }
        }

        debug!("{} axis: {} pair estimates", axis, estimates.len());
        if estimates.len() < 2 {
            return Err(FixError::UnsolvableScale {
                axis,
                reason: format!("only {} valid star pairs", estimates.len()),
            });
        }

        let pair_count = estimates.len();
        let (angle_rad, retained) =
            trimmed_mean(&mut estimates, self.trim_sigma).ok_or_else(|| {
                FixError::UnsolvableScale {
                    axis,
                    reason: "no estimates left after sigma trim".to_string(),
                }
            })?;

        debug!(
            "{} axis: scale {:.6}° from {}/{} pairs",
            axis,
            angle_rad.to_degrees(),
            retained,
            pair_count
        );
        Ok(ScaleEstimate {
            angle_rad,
            pair_count,
            retained,
        })
    }
}

/// Half-field angle implied by one pair, or `None` when the pair carries no
/// usable information.
///
/// `a` is the nearer star's distance from the axis, `b` the extra distance of
/// the farther one, `beta` their angular separation along the axis.
pub fn pair_scale_estimate(a: f64, b: f64, half_extent: f64, beta: f64) -> Option<f64> {
    if b <= DEGENERATE_PIXEL_FRACTION * half_extent {
        return None;
    }
    let t = beta.tan();
    if !(t > 0.0) {
        return None;
    }
    let discriminant = b * b - 4.0 * (a + b) * t * t * a;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();

    // Both roots written without cancellation; the first is (b - √D) branch.
    let small = (2.0 * half_extent * t / (b + root)).atan();
    let large = if a > 0.0 {
        (half_extent * (b + root) / (2.0 * a * (a + b) * t)).atan()
    } else {
        std::f64::consts::FRAC_PI_2
    };
    Some(small.min(large))
}

/// Mean of the values inside `mean ± n_sigma·σ`, with both bounds computed
/// once from the full sample. Returns the mean and the retained count.
pub fn trimmed_mean(values: &mut [f64], n_sigma: f64) -> Option<(f64, usize)> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let (lo, hi) = (mean - n_sigma * std, mean + n_sigma * std);
    debug!("trim band [{:.6}, {:.6}] rad", lo, hi);

    let kept: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| *v >= lo && *v <= hi)
        .collect();
    if kept.is_empty() {
        return None;
    }
    Some((kept.iter().sum::<f64>() / kept.len() as f64, kept.len()))
}

/// True when all points lie on one line (or coincide).
pub fn is_colinear(points: &[[f64; 2]]) -> bool {
    let Some(first) = points.first() else {
        return true;
    };
    let Some(far) = points.iter().max_by(|a, b| {
        let da = (a[0] - first[0]).hypot(a[1] - first[1]);
        let db = (b[0] - first[0]).hypot(b[1] - first[1]);
        da.total_cmp(&db)
    }) else {
        return true;
    };
    let dx = far[0] - first[0];
    let dy = far[1] - first[1];
    let length = dx.hypot(dy);
    if length == 0.0 {
        return true;
    }
    points.iter().all(|p| {
        let cross = dx * (p[1] - first[1]) - dy * (p[0] - first[0]);
        (cross / length).abs() <= COLINEAR_TOLERANCE * length
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_on_axis_is_exact() {
        // Stars at 50 and 150 px along x with a 3000 px focal length
        let (a, b, half, f) = (50.0, 100.0, 300.0, 3000.0_f64);
        let beta = ((a + b) / f).atan() - (a / f).atan();
        let s = pair_scale_estimate(a, b, half, beta).unwrap();
        let truth = (half / f).atan();
        assert!(
            (s - truth).abs() < 1e-12,
            "estimated {:.9}°, expected {:.9}°",
            s.to_degrees(),
            truth.to_degrees()
        );
    }

    #[test]
    fn test_pair_through_origin() {
        // Nearer star exactly on the axis
        let f = 1000.0_f64;
        let beta = (200.0 / f).atan();
        let s = pair_scale_estimate(0.0, 200.0, 50.0, beta).unwrap();
        assert!((s - (50.0 / f).atan()).abs() < 1e-12);
    }

    #[test]
    fn test_pair_rejections() {
        // Zero offset between stars
        assert!(pair_scale_estimate(10.0, 0.0, 50.0, 0.01).is_none());
        // Zero angular separation
        assert!(pair_scale_estimate(10.0, 5.0, 50.0, 0.0).is_none());
        // Separation too large for the geometry: negative discriminant
        assert!(pair_scale_estimate(100.0, 1.0, 50.0, 0.5).is_none());
    }

    #[test]
    fn test_trimmed_mean_drops_outlier() {
        let mut v = vec![1.0; 20];
        v.push(10.0);
        let (mean, kept) = trimmed_mean(&mut v, 2.0).unwrap();
        assert_eq!(kept, 20);
        assert!((mean - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_trimmed_mean_constant_sample() {
        let mut v = vec![0.25; 3];
        assert_eq!(trimmed_mean(&mut v, 2.0), Some((0.25, 3)));
        assert_eq!(trimmed_mean(&mut [], 2.0), None);
    }

    #[test]
    fn test_colinear_detection() {
        assert!(is_colinear(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]));
        assert!(is_colinear(&[[5.0, 5.0], [5.0, 5.0], [5.0, 5.0]]));
        assert!(is_colinear(&[[-3.0, 1.0], [3.0, -1.0], [0.0, 0.0], [6.0, -2.0]]));
        assert!(!is_colinear(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.1]]));
    }

    #[test]
    fn test_colinear_stars_unsolvable() {
        let stars: Vec<StarObservation> = (0..3)
            .map(|i| {
                let k = f64::from(i + 1);
                StarObservation::new(10.0 * k, 10.0 * k, 0.01 * k, 0.01 * k).unwrap()
            })
            .collect();
        let upright: Vec<[f64; 2]> = stars.iter().map(|s| s.pixel).collect();
        let err = AngularScaleSolver::new([50.0, 50.0])
            .solve(&stars, &upright)
            .unwrap_err();
        assert!(
            matches!(err, FixError::UnsolvableScale { axis: Axis::X, ref reason } if reason.contains("both axes")),
            "got {err:?}"
        );
    }

    #[test]
    fn test_too_few_pairs_unsolvable() {
        // Only the two left-hand stars share a side of the y-axis
        let f = 500.0_f64;
        let stars: Vec<StarObservation> = [[10.0, 10.0], [-20.0, 15.0], [-5.0, -30.0]]
            .iter()
            .map(|&[x, y]| {
                let n = (x * x + y * y + f * f).sqrt();
                StarObservation::new(x, y, x.atan2(f), (y / n).asin()).unwrap()
            })
            .collect();
        let upright: Vec<[f64; 2]> = stars.iter().map(|s| s.pixel).collect();
        let err = AngularScaleSolver::new([50.0, 50.0])
            .solve(&stars, &upright)
            .unwrap_err();
        assert!(
            matches!(err, FixError::UnsolvableScale { axis: Axis::X, ref reason } if reason == "only 1 valid star pairs"),
            "got {err:?}"
        );
    }
}
