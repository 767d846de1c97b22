//! Low-precision solar ephemeris and time helpers for the longitude solve.
//!
//! The primary solar model follows the classic low-precision algorithm
//! (mean longitude, mean anomaly, three-term equation of centre, mean
//! obliquity), good to about 0.01° over several centuries around J2000.
//! The older harmonic approximation is kept as [`SolarModel::Harmonic`].

use std::f64::consts::TAU;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::angle::wrap_two_pi;

/// Julian Day of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Julian Day of J2000.0.
const J2000_JD: f64 = 2_451_545.0;

/// Solar position model used to obtain the Sun's right ascension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolarModel {
    /// Low-precision ephemeris in Julian centuries since J2000.
    #[default]
    LowPrecision,
    /// Day-of-year harmonic approximation with a fixed 23.44° obliquity.
    Harmonic,
}

/// Apparent geocentric position of the Sun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    /// Right ascension in `[0, 2π)`, radians.
    pub right_ascension: f64,
    /// Declination in radians.
    pub declination: f64,
    /// Earth-Sun distance in astronomical units.
    pub distance_au: f64,
}

/// Julian Day of an instant, including the fraction of the day.
pub fn julian_day(time: &DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    seconds / 86_400.0 + UNIX_EPOCH_JD
}

/// Days elapsed since January 1st 00:00 UTC of the instant's year.
pub fn fractional_day_of_year(time: &DateTime<Utc>) -> f64 {
    let start = Utc
        .with_ymd_and_hms(time.year(), 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(*time);
    (*time - start).num_milliseconds() as f64 / 86_400_000.0
}

/// UTC clock time in decimal hours.
pub fn ut_hours(time: &DateTime<Utc>) -> f64 {
    f64::from(time.hour())
        + f64::from(time.minute()) / 60.0
        + f64::from(time.second()) / 3600.0
        + f64::from(time.nanosecond()) / 3.6e12
}

/// Greenwich mean sidereal time in radians, `[0, 2π)`.
pub fn greenwich_mean_sidereal_time(jd: f64) -> f64 {
    let d = jd - J2000_JD;
    let deg = 280.460_618_37 + 360.985_647_366_29 * d;
    wrap_two_pi(deg.rem_euclid(360.0).to_radians())
}

/// Sun position from the low-precision ephemeris.
pub fn solar_position(jd: f64) -> SolarPosition {
    let t = (jd - J2000_JD) / 36_525.0;

    let l0 = (280.466_46 + 36_000.769_83 * t + 0.000_303_2 * t * t).rem_euclid(360.0);
    let m = (357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t * t).rem_euclid(360.0);
    let e = 0.016_708_634 - 0.000_042_037 * t - 0.000_000_126_7 * t * t;

    let m_rad = m.to_radians();
    let c = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * m_rad.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m_rad).sin()
        + 0.000_289 * (3.0 * m_rad).sin();

    let true_longitude = (l0 + c).to_radians();
    let true_anomaly = (m + c).to_radians();
    let distance_au = 1.000_001_018 * (1.0 - e * e) / (1.0 + e * true_anomaly.cos());

    let obliquity = (23.0 + 26.0 / 60.0 + 21.448 / 3600.0
        - (46.815_0 * t + 0.000_59 * t * t - 0.001_813 * t * t * t) / 3600.0)
        .to_radians();

    let (sl, cl) = true_longitude.sin_cos();
    let right_ascension = wrap_two_pi((obliquity.cos() * sl).atan2(cl));
    let declination = (obliquity.sin() * sl).asin();

    SolarPosition {
        right_ascension,
        declination,
        distance_au,
    }
}

/// Sun right ascension from the harmonic day-of-year approximation.
///
/// `day_of_year` is the fractional day count since January 1st.
pub fn harmonic_solar_right_ascension(day_of_year: f64) -> f64 {
    let n = day_of_year;
    let longitude_deg = (360.0 * (n - 81.0) / 365.2422
        + (7.6 * (0.986 * (n - 4.0)).to_radians().sin()
            - 9.8 * (1.973 * (n - 81.0)).to_radians().sin())
            * 4.0
            / 60.0)
        .rem_euclid(360.0);
    let lambda = longitude_deg.to_radians();
    wrap_two_pi(
        (23.44_f64.to_radians().cos() * lambda.sin()).atan2(lambda.cos()),
    )
}

/// Sun right ascension at `time` under the chosen model.
pub fn solar_right_ascension(time: &DateTime<Utc>, model: SolarModel) -> f64 {
    match model {
        SolarModel::LowPrecision => solar_position(julian_day(time)).right_ascension,
        SolarModel::Harmonic => harmonic_solar_right_ascension(fractional_day_of_year(time)),
    }
}

/// Equation of time in hours (apparent minus mean solar time).
pub fn equation_of_time_hours(day_of_year: f64, year: i32) -> f64 {
    let d = 6.24 + 0.0172 * (365.35 * f64::from(year - 2000) + day_of_year);
    (-7.659 * d.sin() + 9.863 * (2.0 * d + 3.5932).sin()) / 60.0
}

/// Convert an hour-angle-like quantity in radians to hours.
pub(crate) fn radians_to_hours(rad: f64) -> f64 {
    rad * 24.0 / TAU
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_julian_day_epochs() {
        assert_abs_diff_eq!(julian_day(&utc("2000-01-01T12:00:00Z")), J2000_JD, epsilon = 1e-9);
        assert_abs_diff_eq!(julian_day(&utc("1970-01-01T00:00:00Z")), UNIX_EPOCH_JD, epsilon = 1e-9);
        // Offsets are honoured: 23:46 at +02:00 is 21:46 UTC
        let a = julian_day(&utc("2025-04-25T23:46:00+02:00"));
        let b = julian_day(&utc("2025-04-25T21:46:00Z"));
        assert_abs_diff_eq!(a, b, epsilon = 1e-9);
    }

    #[test]
    fn test_day_of_year_and_hours() {
        let t = utc("2024-03-01T06:00:00Z");
        // 2024 is a leap year: Jan (31) + Feb (29) days, plus a quarter day
        assert_abs_diff_eq!(fractional_day_of_year(&t), 60.25, epsilon = 1e-9);
        assert_abs_diff_eq!(ut_hours(&utc("2025-04-25T23:46:30+02:00")), 21.775, epsilon = 1e-9);
    }

    #[test]
    fn test_sun_near_equinox_and_solstice() {
        // March equinox 2024-03-20 03:06 UTC: RA ≈ 0
        let ra = solar_right_ascension(&utc("2024-03-20T03:06:00Z"), SolarModel::LowPrecision);
        let ra_dist = ra.min(TAU - ra);
        assert!(ra_dist < 0.01_f64.to_radians() * 5.0, "equinox RA {:.4}°", ra.to_degrees());

        // June solstice 2024-06-20 20:51 UTC: RA ≈ 6h, Dec ≈ +23.44°
        let pos = solar_position(julian_day(&utc("2024-06-20T20:51:00Z")));
        assert!((pos.right_ascension.to_degrees() - 90.0).abs() < 0.1);
        assert!((pos.declination.to_degrees() - 23.44).abs() < 0.01);
        assert!((pos.distance_au - 1.016).abs() < 0.001);
    }

    #[test]
    fn test_harmonic_model_close_to_low_precision() {
        for s in ["2025-04-25T21:46:00Z", "2024-01-15T03:00:00Z", "2024-10-01T12:00:00Z"] {
            let t = utc(s);
            let a = solar_right_ascension(&t, SolarModel::LowPrecision);
            let b = solar_right_ascension(&t, SolarModel::Harmonic);
            let diff = (a - b).abs().min(TAU - (a - b).abs()).to_degrees();
            assert!(diff < 3.0, "{s}: models differ by {diff:.3}°");
        }
    }

    #[test]
    fn test_equation_of_time_extremes() {
        // Early November: sundial about 16 minutes fast
        let nov = equation_of_time_hours(307.0, 2025) * 60.0;
        assert!((nov - 16.4).abs() < 1.0, "November EoT {nov:.2} min");
        // Mid February: sundial about 14 minutes slow
        let feb = equation_of_time_hours(42.0, 2025) * 60.0;
        assert!((feb + 14.2).abs() < 1.0, "February EoT {feb:.2} min");
    }

    #[test]
    fn test_gmst_at_j2000() {
        assert_abs_diff_eq!(
            greenwich_mean_sidereal_time(J2000_JD).to_degrees(),
            280.46061837,
            epsilon = 1e-6
        );
    }
}
