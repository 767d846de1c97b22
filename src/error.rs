//! Error kinds raised while building a fix.

use std::fmt;

/// Pixel axis that a scale estimate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Index into a `[x, y]` pair.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// Fatal conditions that abort cluster construction.
///
/// Per-star hour-angle failures are not represented here: they only remove
/// that star from the longitude average.
#[derive(Debug, thiserror::Error)]
pub enum FixError {
    /// Not enough usable stars after filtering.
    #[error("insufficient stars: found {found}, need at least {required}")]
    InsufficientStars { found: usize, required: usize },

    /// The angular scale along one pixel axis could not be determined.
    #[error("unsolvable angular scale along {axis} axis: {reason}")]
    UnsolvableScale { axis: Axis, reason: String },

    /// Every latitude start either diverged or disagreed with the hemisphere hint.
    #[error(
        "no converged latitude candidate ({converged} converged, {rejected_hemisphere} rejected by hemisphere check)"
    )]
    NoConvergedLatitudeCandidate {
        converged: usize,
        rejected_hemisphere: usize,
    },

    /// No star produced a valid hour angle.
    #[error("no star produced a valid hour angle; longitude is undefined")]
    NoLongitudeEstimate,

    /// Star coordinates outside their valid domain.
    #[error("invalid star coordinate: {0}")]
    InvalidCoordinate(String),

    /// Angle text that is neither decimal nor sexagesimal.
    #[error("invalid angle: {0:?}")]
    InvalidAngle(String),

    /// Observation time is not RFC 3339.
    #[error("invalid observation timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    /// Hemisphere hint other than North/South.
    #[error("invalid hemisphere {0:?}, expected \"North\" or \"South\"")]
    InvalidHemisphere(String),
}
