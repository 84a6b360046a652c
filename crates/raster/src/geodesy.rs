//! Great-circle distance between two points given in decimal degrees.
//!
//! Distances are computed with the spherical law of cosines on a sphere whose radius is the
//! local Earth radius of the region of interest rather than the global mean radius.
//! The default radius is the one at 51°N, the center of the German station network.

use linfa::Float;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Earth radius in km at 51°N
pub const MID_LATITUDE_EARTH_RADIUS: f64 = 6365.265;

/// Two coordinates closer than this value (decimal degrees) on both axes
/// are considered as the same location
pub const COORDINATE_EPS: f64 = 1e-3;

/// Great-circle distance metric on a sphere of given radius (km)
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GreatCircle<F: Float> {
    radius: F,
    site_eps: F,
}

impl<F: Float> Default for GreatCircle<F> {
    fn default() -> Self {
        GreatCircle::new(F::cast(MID_LATITUDE_EARTH_RADIUS))
    }
}

impl<F: Float> GreatCircle<F> {
    /// Constructor given the sphere radius in km
    pub fn new(radius: F) -> Self {
        GreatCircle {
            radius,
            site_eps: F::cast(COORDINATE_EPS),
        }
    }

    /// Set the coordinate tolerance (decimal degrees) under which two locations are the same site
    pub fn site_eps(mut self, site_eps: F) -> Self {
        self.site_eps = site_eps;
        self
    }

    /// Sphere radius in km
    pub fn radius(&self) -> F {
        self.radius
    }

    /// Whether two coordinates designate the same site, that is are closer than
    /// the coordinate tolerance on both axes
    pub fn same_site(&self, lat_a: F, lon_a: F, lat_b: F, lon_b: F) -> bool {
        (lat_a - lat_b).abs() < self.site_eps && (lon_a - lon_b).abs() < self.site_eps
    }

    /// Distance in km between point A `(lat_a, lon_a)` and point B `(lat_b, lon_b)`.
    ///
    /// Returns NaN when any coordinate is NaN or infinite: callers are expected to check
    /// the result.
    pub fn distance(&self, lat_a: F, lon_a: F, lat_b: F, lon_b: F) -> F {
        if !(lat_a.is_finite() && lon_a.is_finite() && lat_b.is_finite() && lon_b.is_finite()) {
            return F::nan();
        }
        let phi_a = lat_a.to_radians();
        let phi_b = lat_b.to_radians();
        let delta_lambda = (lon_b - lon_a).to_radians();

        let cos_angle = phi_a.sin() * phi_b.sin() + phi_a.cos() * phi_b.cos() * delta_lambda.cos();
        // rounding may push the cosine of nearly identical points slightly above 1
        let cos_angle = cos_angle.max(-F::one()).min(F::one());
        self.radius * cos_angle.acos()
    }

    /// Same as [`GreatCircle::distance`] except that two coordinates of the same site
    /// (see [`GreatCircle::same_site`]) are at distance zero.
    pub fn site_distance(&self, lat_a: F, lon_a: F, lat_b: F, lon_b: F) -> F {
        if self.same_site(lat_a, lon_a, lat_b, lon_b) {
            F::zero()
        } else {
            self.distance(lat_a, lon_a, lat_b, lon_b)
        }
    }
}
