use crate::errors::{KrigingError, Result};
use linfa::{Float, ParamGuard};
use okriging_raster::{GreatCircle, COORDINATE_EPS, MID_LATITUDE_EARTH_RADIUS};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default width of the variogram distance classes (km)
pub const DEFAULT_DISTANCE_INTERVAL: f64 = 50.;
/// Default maximum pair distance taken into account by the variogram (km)
pub const DEFAULT_MAX_DISTANCE: f64 = 900.;
/// Default order of the polynomial fitted on the empirical variogram
pub const DEFAULT_REGRESSION_ORDER: usize = 4;
/// Smallest nugget value
pub const DEFAULT_NUGGET_FLOOR: f64 = 0.001;

/// A set of validated ordinary kriging parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct KrigingValidParams<F: Float> {
    /// Width of the variogram distance classes (km)
    pub(crate) distance_interval: F,
    /// Pairs further apart are ignored by the variogram (km)
    pub(crate) max_distance: F,
    /// Order of the polynomial used to estimate the nugget
    pub(crate) regression_order: usize,
    /// Nugget lower bound
    pub(crate) nugget_floor: F,
    /// Sill values are searched in [0, sill_max)
    pub(crate) sill_max: F,
    /// Sill search step
    pub(crate) sill_step: F,
    /// Range search step (km)
    pub(crate) range_step: F,
    /// Correct negative kriging weights
    pub(crate) weights_correction: bool,
    /// Raise diagnostics to info level
    pub(crate) verbose: bool,
    /// Earth radius used by the great-circle distance (km)
    pub(crate) earth_radius: F,
    /// Below this tolerance (degrees) two coordinates are the same site
    /// and below this distance (km) covariances reduce to the nugget
    pub(crate) coordinate_eps: F,
}

impl<F: Float> Default for KrigingValidParams<F> {
    fn default() -> KrigingValidParams<F> {
        KrigingValidParams {
            distance_interval: F::cast(DEFAULT_DISTANCE_INTERVAL),
            max_distance: F::cast(DEFAULT_MAX_DISTANCE),
            regression_order: DEFAULT_REGRESSION_ORDER,
            nugget_floor: F::cast(DEFAULT_NUGGET_FLOOR),
            sill_max: F::cast(100.),
            sill_step: F::one(),
            range_step: F::cast(0.1),
            weights_correction: false,
            verbose: false,
            earth_radius: F::cast(MID_LATITUDE_EARTH_RADIUS),
            coordinate_eps: F::cast(COORDINATE_EPS),
        }
    }
}

impl<F: Float> KrigingValidParams<F> {
    /// Get variogram distance class width
    pub fn distance_interval(&self) -> F {
        self.distance_interval
    }

    /// Get variogram maximum distance
    pub fn max_distance(&self) -> F {
        self.max_distance
    }

    /// Get regression order
    pub fn regression_order(&self) -> usize {
        self.regression_order
    }

    /// Get nugget floor
    pub fn nugget_floor(&self) -> F {
        self.nugget_floor
    }

    /// Get sill search upper bound (excluded)
    pub fn sill_max(&self) -> F {
        self.sill_max
    }

    /// Get sill search step
    pub fn sill_step(&self) -> F {
        self.sill_step
    }

    /// Get range search step
    pub fn range_step(&self) -> F {
        self.range_step
    }

    /// Whether negative weights are corrected
    pub fn weights_correction(&self) -> bool {
        self.weights_correction
    }

    /// Whether diagnostics are logged at info level
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Get Earth radius
    pub fn earth_radius(&self) -> F {
        self.earth_radius
    }

    /// Get coordinate tolerance
    pub fn coordinate_eps(&self) -> F {
        self.coordinate_eps
    }

    /// Great-circle metric configured with the Earth radius and coordinate tolerance
    pub fn metric(&self) -> GreatCircle<F> {
        GreatCircle::new(self.earth_radius).site_eps(self.coordinate_eps)
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [ordinary kriging algorithm](crate::OrdinaryKriging).
pub struct KrigingParams<F: Float>(KrigingValidParams<F>);

impl<F: Float> Default for KrigingParams<F> {
    fn default() -> Self {
        Self(KrigingValidParams::default())
    }
}

impl<F: Float> KrigingParams<F> {
    /// A constructor for kriging parameters with default values
    pub fn new() -> KrigingParams<F> {
        Self::default()
    }

    /// A constructor for kriging parameters from validated parameters
    pub fn new_from_valid(params: &KrigingValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Set the width of the variogram distance classes (km)
    pub fn distance_interval(mut self, distance_interval: F) -> Self {
        self.0.distance_interval = distance_interval;
        self
    }

    /// Set the maximum pair distance used by the variogram (km)
    pub fn max_distance(mut self, max_distance: F) -> Self {
        self.0.max_distance = max_distance;
        self
    }

    /// Set the order of the polynomial regression estimating the nugget
    pub fn regression_order(mut self, regression_order: usize) -> Self {
        self.0.regression_order = regression_order;
        self
    }

    /// Set the nugget lower bound
    pub fn nugget_floor(mut self, nugget_floor: F) -> Self {
        self.0.nugget_floor = nugget_floor;
        self
    }

    /// Set the sill search space as `[0, sill_max)` with the given step
    pub fn sill_search(mut self, sill_max: F, sill_step: F) -> Self {
        self.0.sill_max = sill_max;
        self.0.sill_step = sill_step;
        self
    }

    /// Set the range search step (km)
    pub fn range_step(mut self, range_step: F) -> Self {
        self.0.range_step = range_step;
        self
    }

    /// Enable or disable the correction of negative kriging weights
    pub fn weights_correction(mut self, weights_correction: bool) -> Self {
        self.0.weights_correction = weights_correction;
        self
    }

    /// Raise diagnostics (matrix summaries, station and variogram tables) to info level
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.0.verbose = verbose;
        self
    }

    /// Set the Earth radius (km)
    pub fn earth_radius(mut self, earth_radius: F) -> Self {
        self.0.earth_radius = earth_radius;
        self
    }

    /// Set the tolerance under which two coordinates are the same site
    pub fn coordinate_eps(mut self, coordinate_eps: F) -> Self {
        self.0.coordinate_eps = coordinate_eps;
        self
    }
}

fn ensure_positive<F: Float>(name: &str, value: F) -> Result<()> {
    if value.is_finite() && value > F::zero() {
        Ok(())
    } else {
        Err(KrigingError::ConfigurationError(format!(
            "`{name}` should be a positive number, got {value}"
        )))
    }
}

impl<F: Float> ParamGuard for KrigingParams<F> {
    type Checked = KrigingValidParams<F>;
    type Error = KrigingError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let p = &self.0;
        ensure_positive("distance_interval", p.distance_interval)?;
        ensure_positive("max_distance", p.max_distance)?;
        ensure_positive("sill_max", p.sill_max)?;
        ensure_positive("sill_step", p.sill_step)?;
        ensure_positive("range_step", p.range_step)?;
        ensure_positive("earth_radius", p.earth_radius)?;
        ensure_positive("coordinate_eps", p.coordinate_eps)?;
        if p.max_distance < p.distance_interval {
            return Err(KrigingError::ConfigurationError(format!(
                "`max_distance` ({}) should not be smaller than `distance_interval` ({})",
                p.max_distance, p.distance_interval
            )));
        }
        if !p.nugget_floor.is_finite() || p.nugget_floor < F::zero() {
            return Err(KrigingError::ConfigurationError(format!(
                "`nugget_floor` should be a non negative number, got {}",
                p.nugget_floor
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
