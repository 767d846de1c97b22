//! # starfix
//!
//! Celestial-navigation **position fix from a single star image** written in Rust.
//!
//! Given stars detected in one exposure and identified against a catalog (for
//! example by a plate solver), together with the camera's tilt above the
//! horizon, its roll and the exposure time, `starfix` recovers the observer's
//! latitude and longitude.
//!
//! ## Features
//!
//! - **No lens calibration**: the angular field of view is solved from pairs of
//!   stars, comparing pixel separations with catalog separations
//! - **Robust latitude**: a 5×5 multi-start Levenberg-Marquardt search with a
//!   hemisphere consistency check
//! - **Longitude from time**: hour angles become local apparent solar time,
//!   corrected by the equation of time and compared with UT
//! - **Plate-solver input**: correspondence tables with decimal or
//!   sexagesimal coordinates, confidence filtering, seeded down-sampling
//!
//! ## Example
//!
//! ```no_run
//! use rand::SeedableRng;
//! use starfix::{read_matches_csv, select_observations, FixConfig, SelectionConfig, StarCluster};
//!
//! let matches = read_matches_csv("data/corr.csv").unwrap();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let stars = select_observations(&matches, &SelectionConfig::default(), &mut rng).unwrap();
//!
//! let config = FixConfig::from_rfc3339(81.96, 29.99, "2025-04-25T23:46:00+02:00").unwrap();
//! let cluster = StarCluster::solve(stars, &config).unwrap();
//! println!(
//!     "Latitude {:.4}°, longitude {:.4}°",
//!     cluster.latitude_deg(),
//!     cluster.longitude_deg()
//! );
//! cluster.save_report("fix.txt").unwrap();
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Angular scale**: for every pair of stars on the same side of the
//!    optical axis, a quadratic in the tangent of the half-field angle; the
//!    estimates are 2σ-trimmed and averaged, per axis
//! 2. **Sky projection**: each pixel is derotated by the camera roll, turned
//!    into camera angles and rotated by the camera tilt into altitude and
//!    azimuth relative to the optical axis
//! 3. **Latitude**: the altitude relation, squared into a quadratic in
//!    `cos φ`, is solved jointly with the unknown azimuth offset
//! 4. **Longitude**: each star's hour angle plus its right ascension, minus the
//!    Sun's, gives local apparent time; the per-star longitudes are averaged
//!

pub mod angle;
pub mod camera_model;
pub mod catalogs;
mod cluster;
pub mod detection;
pub mod ephemeris;
mod error;
pub mod solver;
pub mod star;

pub use angle::{CelestialAngle, SexagesimalUnit};
pub use camera_model::{AzimuthResolution, SkyProjector};
pub use catalogs::read_matches_csv;
pub use cluster::StarCluster;
pub use detection::{select_observations, CatalogMatch, PixelOrigin, SelectionConfig};
pub use ephemeris::SolarModel;
pub use error::{Axis, FixError};
pub use solver::{FixConfig, Hemisphere, LatitudeSolveConfig};
pub use star::*;
