//! Camera model: roll correction and projection of pixels onto the local sky.
//!
//! The camera is described by its solved angular half-field extents, the pixel
//! half-extents they correspond to, its tilt above the horizon (positional
//! angle) and its roll about the optical axis (rotation angle).
//!
//! # Coordinate conventions
//!
//! - **Pixel coordinates**: origin on the optical axis, +X right, +Y up.
//! - **Camera angles** `(α, β)`: α = arctan(x'·tan(scale_x)/half_width) to the
//!   right of the axis, β = arctan(y'·tan(scale_y)/half_height) above it.
//! - **Horizon coordinates**: altitude above the horizon, and azimuth relative
//!   to the azimuth of the optical axis, increasing eastward.
//!
//! # Pipeline
//!
//! ```text
//! pixel → derotate → camera angles (α, β) → (Alt, Az_rel)
//! (Alt, Az_rel) → camera angles (α, β) → rotate → pixel
//! ```

use crate::angle::asin_clamped;
use crate::{ProjectedStar, StarObservation};

/// How the relative azimuth quadrant is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AzimuthResolution {
    /// `arcsin` principal value. Folds stars behind the zenith into the front
    /// half-plane.
    #[default]
    Principal,
    /// Two-argument `atan2` resolution, valid for every direction.
    Quadrant,
}

/// Rotate a measured pixel by `-rotation` into the upright camera frame.
pub fn derotate(pixel: [f64; 2], rotation_rad: f64) -> [f64; 2] {
    let (s, c) = rotation_rad.sin_cos();
    [c * pixel[0] + s * pixel[1], -s * pixel[0] + c * pixel[1]]
}

/// Rotate an upright pixel back into the measured (rolled) frame.
pub fn rerotate(pixel: [f64; 2], rotation_rad: f64) -> [f64; 2] {
    let (s, c) = rotation_rad.sin_cos();
    [c * pixel[0] - s * pixel[1], s * pixel[0] + c * pixel[1]]
}

/// Maps pixels to local altitude / relative azimuth and back.
#[derive(Debug, Clone)]
pub struct SkyProjector {
    /// Angular half-field extents `[x, y]` in radians.
    pub angular_scale: [f64; 2],
    /// Pixel half-extents `[x, y]` matching `angular_scale`.
    pub half_extent: [f64; 2],
    /// Tilt of the optical axis above the horizon, radians.
    pub positional_angle_rad: f64,
    /// Camera roll, counter-clockwise, radians.
    pub rotation_angle_rad: f64,
    pub azimuth_resolution: AzimuthResolution,
}

impl SkyProjector {
    /// Effective focal length in pixels along each axis.
    pub fn focal_length_px(&self) -> [f64; 2] {
        [
            self.half_extent[0] / self.angular_scale[0].tan(),
            self.half_extent[1] / self.angular_scale[1].tan(),
        ]
    }

    /// Camera angles `(α, β)` of an already derotated pixel.
    pub fn camera_angles(&self, upright: [f64; 2]) -> (f64, f64) {
        let alpha = (upright[0] * self.angular_scale[0].tan() / self.half_extent[0]).atan();
        let beta = (upright[1] * self.angular_scale[1].tan() / self.half_extent[1]).atan();
        (alpha, beta)
    }

    /// Altitude and relative azimuth of the direction `(α, β)`.
    pub fn camera_angles_to_altaz(&self, alpha: f64, beta: f64) -> (f64, f64) {
        let (sp, cp) = self.positional_angle_rad.sin_cos();
        // c is the polar distance from the camera's vertical
        let c = std::f64::consts::FRAC_PI_2 - beta;
        let (sc, cc) = c.sin_cos();
        let (sa, ca) = alpha.sin_cos();

        let alt = asin_clamped(cc * cp + sc * sp * ca);
        let az_rel = match self.azimuth_resolution {
            AzimuthResolution::Principal => {
                let cos_alt = alt.cos();
                if cos_alt <= f64::EPSILON {
                    0.0
                } else {
                    asin_clamped(sc * sa / cos_alt)
                }
            }
            AzimuthResolution::Quadrant => (sc * sa).atan2(sc * ca * cp - cc * sp),
        };
        (alt, az_rel)
    }

    /// Project one star into horizon coordinates.
    pub fn project(&self, star: &StarObservation) -> ProjectedStar {
        let upright = derotate(star.pixel, self.rotation_angle_rad);
        let (alpha, beta) = self.camera_angles(upright);
        let (alt_rad, az_rel_rad) = self.camera_angles_to_altaz(alpha, beta);
        ProjectedStar {
            observation: *star,
            projected_pixel: upright,
            alt_rad,
            az_rel_rad,
            az_abs_rad: None,
        }
    }

    pub fn project_all(&self, stars: &[StarObservation]) -> Vec<ProjectedStar> {
        stars.iter().map(|s| self.project(s)).collect()
    }

    /// Camera angles of a horizon direction, or `None` when it lies behind
    /// the image plane.
    pub fn altaz_to_camera_angles(&self, alt: f64, az_rel: f64) -> Option<(f64, f64)> {
        let (sp, cp) = self.positional_angle_rad.sin_cos();
        let (sa, ca) = alt.sin_cos();
        let (sz, cz) = az_rel.sin_cos();
        // East / north / up components with the optical axis azimuth at north
        let (e, n, u) = (ca * sz, ca * cz, sa);

        let x = e;
        let y = -sp * n + cp * u;
        let z = cp * n + sp * u;
        if z <= 0.0 {
            return None;
        }
        Some((x.atan2(z), asin_clamped(y)))
    }

    /// Measured pixel position of a horizon direction.
    pub fn altaz_to_pixel(&self, alt: f64, az_rel: f64) -> Option<[f64; 2]> {
        let (alpha, beta) = self.altaz_to_camera_angles(alt, az_rel)?;
        let upright = [
            alpha.tan() * self.half_extent[0] / self.angular_scale[0].tan(),
            beta.tan() * self.half_extent[1] / self.angular_scale[1].tan(),
        ];
        Some(rerotate(upright, self.rotation_angle_rad))
    }
}
