//! Observer longitude from hour angles and the observation time.
//!
//! Each star's hour angle (from its altitude, declination and the solved
//! latitude) places the star relative to the local meridian. Combined with the
//! star's right ascension and the Sun's, it gives local apparent solar time;
//! removing the equation of time gives local mean time, and its offset from UT
//! is the longitude.

use std::f64::consts::{PI, TAU};

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use tracing::{info, warn};

use crate::angle::wrap_degrees_180;
use crate::ephemeris::{
    equation_of_time_hours, fractional_day_of_year, radians_to_hours, solar_right_ascension,
    ut_hours, SolarModel,
};
use crate::{FixError, ProjectedStar};

/// Slack allowed on `|cos H| ≤ 1` before a star is declared invalid.
const HOUR_ANGLE_SLACK: f64 = 1e-9;

/// Longitude estimate for a cluster.
#[derive(Debug, Clone)]
pub struct LongitudeSolution {
    /// Mean of the valid per-star estimates, radians in `[-π, π)`.
    pub longitude: f64,
    /// Per-star estimates in input order; `None` for an invalid hour angle.
    pub per_star: Vec<Option<f64>>,
    /// Sun right ascension used, radians.
    pub sun_right_ascension: f64,
    /// Equation of time applied, hours.
    pub equation_of_time_hours: f64,
}

impl LongitudeSolution {
    /// Number of stars that contributed to the mean.
    pub fn valid_count(&self) -> usize {
        self.per_star.iter().flatten().count()
    }
}

/// Converts hour angles into a longitude for one observation time.
#[derive(Debug, Clone)]
pub struct LongitudeSolver {
    observed_at: DateTime<Utc>,
    sun_right_ascension: f64,
    equation_of_time_hours: f64,
    ut_hours: f64,
}

impl LongitudeSolver {
    pub fn new(observed_at: &DateTime<FixedOffset>, solar_model: SolarModel) -> Self {
        let utc = observed_at.with_timezone(&Utc);
        let day = fractional_day_of_year(&utc);
        Self {
            observed_at: utc,
            sun_right_ascension: solar_right_ascension(&utc, solar_model),
            equation_of_time_hours: equation_of_time_hours(day, utc.year()),
            ut_hours: ut_hours(&utc),
        }
    }

    pub fn observed_at(&self) -> &DateTime<Utc> {
        &self.observed_at
    }

    /// Hour angle of an anchored star, in `[0, 2π)`, or `None` when the
    /// star's altitude is inconsistent with the latitude.
    ///
    /// Stars east of the meridian (absolute azimuth in `(0, π)`) are still
    /// rising and get `2π − H`.
    pub fn hour_angle(star: &ProjectedStar, latitude: f64) -> Option<f64> {
        let dec = star.observation.dec_rad;
        let cos_h = (star.alt_rad.sin() - latitude.sin() * dec.sin()) / (latitude.cos() * dec.cos());
        if !cos_h.is_finite() || cos_h.abs() > 1.0 + HOUR_ANGLE_SLACK {
            return None;
        }
        let h = cos_h.clamp(-1.0, 1.0).acos();
        let az = star.az_rad();
        if az > 0.0 && az < PI {
            Some(TAU - h)
        } else {
            Some(h)
        }
    }

    /// Longitude implied by one star, radians in `[-π, π)`.
    pub fn star_longitude(&self, star: &ProjectedStar, latitude: f64) -> Option<f64> {
        let h = Self::hour_angle(star, latitude)?;
        let apparent = (12.0
            + radians_to_hours(h + star.observation.ra_rad - self.sun_right_ascension))
        .rem_euclid(24.0);
        let mean = apparent - self.equation_of_time_hours;
        Some(wrap_degrees_180((mean - self.ut_hours) * 15.0).to_radians())
    }

    /// Average the per-star longitudes.
    pub fn solve(&self, stars: &[ProjectedStar], latitude: f64) -> Result<LongitudeSolution, FixError> {
        let per_star: Vec<Option<f64>> = stars
            .iter()
            .enumerate()
            .map(|(i, star)| {
                let estimate = self.star_longitude(star, latitude);
                if estimate.is_none() {
                    warn!(
                        "star {i} (ra {:.4}°, dec {:.4}°): invalid hour angle at latitude {:.4}°, skipped",
                        star.observation.ra_rad.to_degrees(),
                        star.observation.dec_rad.to_degrees(),
                        latitude.to_degrees()
                    );
                }
                estimate
            })
            .collect();

        let valid: Vec<f64> = per_star.iter().flatten().copied().collect();
        if valid.is_empty() {
            return Err(FixError::NoLongitudeEstimate);
        }
        let longitude = valid.iter().sum::<f64>() / valid.len() as f64;

        info!(
            "Longitude {:.6}° from {}/{} stars",
            longitude.to_degrees(),
            valid.len(),
            stars.len()
        );
        Ok(LongitudeSolution {
            longitude,
            per_star,
            sun_right_ascension: self.sun_right_ascension,
            equation_of_time_hours: self.equation_of_time_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::wrap_two_pi;
    use crate::ephemeris::{greenwich_mean_sidereal_time, julian_day};
    use crate::StarObservation;

    fn observed(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    /// Anchored star at hour angle `h` for an observer at `(phi, lambda)`.
    fn star_at(phi: f64, lambda: f64, t: &DateTime<FixedOffset>, dec: f64, h: f64) -> ProjectedStar {
        let lst = greenwich_mean_sidereal_time(julian_day(&t.with_timezone(&Utc))) + lambda;
        let ra = wrap_two_pi(lst - h);
        let alt = (phi.sin() * dec.sin() + phi.cos() * dec.cos() * h.cos()).asin();
        let az = (-h.sin() * dec.cos()).atan2(dec.sin() * phi.cos() - dec.cos() * h.cos() * phi.sin());
        ProjectedStar {
            observation: StarObservation::new(0.0, 0.0, ra, dec).unwrap(),
            projected_pixel: [0.0, 0.0],
            alt_rad: alt,
            az_rel_rad: 0.0,
            az_abs_rad: Some(wrap_two_pi(az)),
        }
    }

    #[test]
    fn test_hour_angle_sign_from_azimuth() {
        let t = observed("2025-04-25T23:46:00+02:00");
        let phi = 53.0_f64.to_radians();
        let west = star_at(phi, 0.0, &t, 0.3, 0.7);
        let east = star_at(phi, 0.0, &t, 0.3, -0.7);
        assert!(west.az_rad() > PI);
        assert!((LongitudeSolver::hour_angle(&west, phi).unwrap() - 0.7).abs() < 1e-9);
        assert!((LongitudeSolver::hour_angle(&east, phi).unwrap() - (TAU - 0.7)).abs() < 1e-9);
    }

    #[test]
    fn test_recovers_longitude() {
        let t = observed("2025-04-25T23:46:00+02:00");
        let phi = 53.165437_f64.to_radians();
        let lambda = 8.6555426_f64.to_radians();
        let stars: Vec<ProjectedStar> = [(0.2, -1.0), (0.6, 0.4), (-0.1, 1.2), (1.0, 2.5)]
            .iter()
            .map(|&(dec, h)| star_at(phi, lambda, &t, dec, h))
            .collect();
        let sol = LongitudeSolver::new(&t, SolarModel::LowPrecision)
            .solve(&stars, phi)
            .unwrap();
        assert_eq!(sol.valid_count(), 4);
        let err = (sol.longitude - lambda).to_degrees().abs();
        assert!(err < 0.5, "longitude {:.4}° off by {err:.4}°", sol.longitude.to_degrees());
    }

    #[test]
    fn test_invalid_hour_angle_is_skipped() {
        let t = observed("2024-01-15T03:00:00Z");
        let phi = 40.0_f64.to_radians();
        let lambda = (-75.0_f64).to_radians();
        let mut stars = vec![
            star_at(phi, lambda, &t, 0.3, 0.5),
            star_at(phi, lambda, &t, 0.5, -0.4),
        ];
        // Altitude no star at this declination can reach from this latitude
        let mut bad = stars[0];
        bad.alt_rad = 1.5;
        bad.observation = StarObservation::new(0.0, 0.0, 0.0, -1.2).unwrap();
        stars.push(bad);

        let sol = LongitudeSolver::new(&t, SolarModel::LowPrecision)
            .solve(&stars, phi)
            .unwrap();
        assert_eq!(sol.per_star[2], None);
        assert_eq!(sol.valid_count(), 2);
        assert!((sol.longitude - lambda).to_degrees().abs() < 0.5);
    }

    #[test]
    fn test_all_invalid_is_an_error() {
        let t = observed("2024-01-15T03:00:00Z");
        let mut star = star_at(0.7, 0.0, &t, 0.3, 0.5);
        star.alt_rad = 1.5;
        star.observation = StarObservation::new(0.0, 0.0, 0.0, -1.2).unwrap();
        let err = LongitudeSolver::new(&t, SolarModel::LowPrecision)
            .solve(&[star], 0.7)
            .unwrap_err();
        assert!(matches!(err, FixError::NoLongitudeEstimate));
    }
}
