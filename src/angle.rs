//! Angle representations and the small trig helpers shared by every stage.
//!
//! Catalog coordinates arrive either as decimal degrees or as sexagesimal
//! triples (hours for right ascension, degrees for declination).
//! [`CelestialAngle`] captures both and is converted to radians exactly once,
//! when a [`StarObservation`](crate::StarObservation) is built.

use std::f64::consts::TAU;
use std::str::FromStr;

use crate::FixError;

/// Unit of the leading field of a sexagesimal triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SexagesimalUnit {
    /// Right ascension style `h m s`, one hour = 15°.
    Hours,
    /// Declination style `d m s`.
    Degrees,
}

/// An angle as it appears in a catalog or match table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CelestialAngle {
    /// Decimal degrees.
    Decimal(f64),
    /// Leading field (hours or degrees), minutes, seconds.
    ///
    /// The sign of the leading field applies to the whole angle, so
    /// `Sexagesimal(-0.0, 30.0, 0.0)` is -0.5°.
    Sexagesimal(f64, f64, f64),
}

impl CelestialAngle {
    /// Normalize to radians.
    ///
    /// `unit` selects how the leading field of a sexagesimal triple is read;
    /// it is ignored for [`CelestialAngle::Decimal`].
    pub fn to_radians(self, unit: SexagesimalUnit) -> f64 {
        match self {
            CelestialAngle::Decimal(deg) => deg.to_radians(),
            CelestialAngle::Sexagesimal(lead, minutes, seconds) => {
                let sign = if lead.is_sign_negative() { -1.0 } else { 1.0 };
                let magnitude = lead.abs() + minutes.abs() / 60.0 + seconds.abs() / 3600.0;
                let scale = match unit {
                    SexagesimalUnit::Hours => 15.0,
                    SexagesimalUnit::Degrees => 1.0,
                };
                (sign * magnitude * scale).to_radians()
            }
        }
    }
}

/// Parses `"83.633"` as decimal degrees and `"05:34:31.9"` or
/// `"-05 23 28"` as a sexagesimal triple.
impl FromStr for CelestialAngle {
    type Err = FixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let fields: Vec<&str> = trimmed
            .split(|c: char| c == ':' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        let parse = |f: &str| {
            f.parse::<f64>()
                .map_err(|_| FixError::InvalidAngle(s.to_string()))
        };
        match fields.as_slice() {
            [deg] => Ok(CelestialAngle::Decimal(parse(deg)?)),
            [lead, minutes, seconds] => Ok(CelestialAngle::Sexagesimal(
                parse(lead)?,
                parse(minutes)?,
                parse(seconds)?,
            )),
            _ => Err(FixError::InvalidAngle(s.to_string())),
        }
    }
}

/// `asin` with the argument clamped to `[-1, 1]`.
pub fn asin_clamped(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).asin()
}

/// `acos` with the argument clamped to `[-1, 1]`.
pub fn acos_clamped(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).acos()
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_two_pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly 2π
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle in degrees into `[-180, 180)`.
pub fn wrap_degrees_180(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_decimal_ignores_unit() {
        let a = CelestialAngle::Decimal(83.5);
        assert_abs_diff_eq!(a.to_radians(SexagesimalUnit::Hours), 83.5_f64.to_radians());
        assert_abs_diff_eq!(a.to_radians(SexagesimalUnit::Degrees), 83.5_f64.to_radians());
    }

    #[test]
    fn test_sexagesimal_hours() {
        // 5h 30m = 82.5°
        let ra = CelestialAngle::Sexagesimal(5.0, 30.0, 0.0);
        assert_abs_diff_eq!(
            ra.to_radians(SexagesimalUnit::Hours),
            82.5_f64.to_radians(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_negative_sexagesimal_sign_applies_to_all_fields() {
        let dec = CelestialAngle::Sexagesimal(-5.0, 30.0, 36.0);
        assert_abs_diff_eq!(
            dec.to_radians(SexagesimalUnit::Degrees),
            (-5.51_f64).to_radians(),
            epsilon = 1e-12
        );
        let small = CelestialAngle::Sexagesimal(-0.0, 30.0, 0.0);
        assert_abs_diff_eq!(
            small.to_radians(SexagesimalUnit::Degrees),
            (-0.5_f64).to_radians(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            "83.25".parse::<CelestialAngle>().unwrap(),
            CelestialAngle::Decimal(83.25)
        );
        assert_eq!(
            "05:34:31.9".parse::<CelestialAngle>().unwrap(),
            CelestialAngle::Sexagesimal(5.0, 34.0, 31.9)
        );
        assert_eq!(
            " -05 23 28 ".parse::<CelestialAngle>().unwrap(),
            CelestialAngle::Sexagesimal(-5.0, 23.0, 28.0)
        );
        assert!("12:30".parse::<CelestialAngle>().is_err());
        assert!("north".parse::<CelestialAngle>().is_err());
    }

    #[test]
    fn test_clamped_trig_never_nan() {
        assert_abs_diff_eq!(asin_clamped(1.0 + 1e-12), std::f64::consts::FRAC_PI_2);
        assert_abs_diff_eq!(acos_clamped(-1.0 - 1e-12), std::f64::consts::PI);
    }

    #[test]
    fn test_wrapping() {
        assert_abs_diff_eq!(wrap_two_pi(-0.5), TAU - 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_two_pi(TAU + 0.25), 0.25, epsilon = 1e-12);
        assert!(wrap_two_pi(-1e-18) < TAU);
        assert_abs_diff_eq!(wrap_degrees_180(190.0), -170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_degrees_180(-190.0), 170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_degrees_180(8.5), 8.5, epsilon = 1e-12);
    }
}
