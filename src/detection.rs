//! Matched detections from a plate solver and the selection of the stars that
//! enter a fix.
//!
//! A plate solver reports, for every detection it identified, the pixel
//! position, the catalog coordinates and a match confidence. Selection keeps
//! the confident matches, moves the pixel origin onto the optical axis, flips
//! the y-axis so +Y points up, and down-samples to a bounded star count.

use rand::seq::index;
use rand::Rng;
use tracing::debug;

use crate::angle::CelestialAngle;
use crate::{FixError, StarObservation};

/// One plate-solver match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogMatch {
    /// Detection column in solver pixel coordinates.
    pub pixel_x: f64,
    /// Detection row in solver pixel coordinates (+Y down).
    pub pixel_y: f64,
    pub ra: CelestialAngle,
    pub dec: CelestialAngle,
    /// Confidence in `[0, 1]` that the detection is the catalog star.
    pub match_confidence: f64,
}

impl CatalogMatch {
    /// Match with catalog coordinates in decimal degrees.
    pub fn from_degrees(
        pixel_x: f64,
        pixel_y: f64,
        ra_deg: f64,
        dec_deg: f64,
        match_confidence: f64,
    ) -> Self {
        Self {
            pixel_x,
            pixel_y,
            ra: CelestialAngle::Decimal(ra_deg),
            dec: CelestialAngle::Decimal(dec_deg),
            match_confidence,
        }
    }
}

/// Where the pixel origin is placed before projection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PixelOrigin {
    /// The selected star nearest the centroid of all confident detections.
    #[default]
    BaseStar,
    /// The geometric centre of an image of the given size.
    ImageCenter { width: f64, height: f64 },
    /// Coordinates are already relative to the optical axis.
    AsGiven,
}

/// Parameters for turning matches into observations.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Matches must have a confidence strictly above this. Default 0.995.
    pub confidence_threshold: f64,
    /// Upper bound on the number of stars kept. Default 10.
    pub max_star_count: usize,
    /// Fewer confident matches than this is an error. Default 3.
    pub min_star_count: usize,
    /// Keep the base star in a down-sampled set and put it first. Default true.
    pub preserve_base_star: bool,
    pub pixel_origin: PixelOrigin,
    /// Negate y so +Y points up. Default true.
    pub flip_y: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.995,
            max_star_count: 10,
            min_star_count: 3,
            preserve_base_star: true,
            pixel_origin: PixelOrigin::BaseStar,
            flip_y: true,
        }
    }
}

/// Index of the match nearest the centroid of `matches` (first on ties).
pub fn base_star_index(matches: &[&CatalogMatch]) -> Option<usize> {
    if matches.is_empty() {
        return None;
    }
    let n = matches.len() as f64;
    let cx = matches.iter().map(|m| m.pixel_x).sum::<f64>() / n;
    let cy = matches.iter().map(|m| m.pixel_y).sum::<f64>() / n;
    let dist2 = |m: &CatalogMatch| (m.pixel_x - cx).powi(2) + (m.pixel_y - cy).powi(2);

    let mut best = 0;
    for (i, m) in matches.iter().enumerate().skip(1) {
        if dist2(m) < dist2(matches[best]) {
            best = i;
        }
    }
    Some(best)
}

/// Select the observations that enter a fix.
///
/// `rng` decides which stars survive down-sampling; pass a seeded generator
/// for reproducible selections.
pub fn select_observations<R: Rng + ?Sized>(
    matches: &[CatalogMatch],
    config: &SelectionConfig,
    rng: &mut R,
) -> Result<Vec<StarObservation>, FixError> {
    let confident: Vec<&CatalogMatch> = matches
        .iter()
        .filter(|m| m.match_confidence > config.confidence_threshold)
        .collect();
    debug!(
        "{}/{} matches above confidence {}",
        confident.len(),
        matches.len(),
        config.confidence_threshold
    );
    if confident.len() < config.min_star_count {
        return Err(FixError::InsufficientStars {
            found: confident.len(),
            required: config.min_star_count,
        });
    }
    let Some(base) = base_star_index(&confident) else {
        return Err(FixError::InsufficientStars {
            found: 0,
            required: config.min_star_count,
        });
    };

    let mut chosen: Vec<usize> = if confident.len() > config.max_star_count {
        let mut picked = index::sample(rng, confident.len(), config.max_star_count).into_vec();
        if config.preserve_base_star && !picked.contains(&base) {
            picked.pop();
            picked.push(base);
        }
        picked.sort_unstable();
        picked
    } else {
        (0..confident.len()).collect()
    };
    if config.preserve_base_star {
        if let Some(pos) = chosen.iter().position(|&i| i == base) {
            let b = chosen.remove(pos);
            chosen.insert(0, b);
        }
    }
    if chosen.len() < config.min_star_count {
        return Err(FixError::InsufficientStars {
            found: chosen.len(),
            required: config.min_star_count,
        });
    }

    let (ox, oy) = match config.pixel_origin {
        PixelOrigin::BaseStar => (confident[base].pixel_x, confident[base].pixel_y),
        PixelOrigin::ImageCenter { width, height } => (width / 2.0, height / 2.0),
        PixelOrigin::AsGiven => (0.0, 0.0),
    };
    let y_sign = if config.flip_y { -1.0 } else { 1.0 };

    chosen
        .iter()
        .map(|&i| {
            let m = confident[i];
            StarObservation::from_angles(
                m.pixel_x - ox,
                y_sign * (m.pixel_y - oy),
                m.ra,
                m.dec,
            )
        })
        .collect()
}
