//! This library implements [ordinary kriging](https://en.wikipedia.org/wiki/Kriging#Ordinary_kriging)
//! of point measurements (typically daily precipitation sums) given in latitude/longitude.
//!
//! The interpolation runs as a pipeline, each stage producing the input of the next one:
//!
//! 1. great-circle [DistanceMatrix] between stations,
//! 2. classical [EmpiricalVariogram] over fixed width distance classes,
//! 3. exponential [VariogramModel] fit: the nugget is the intercept of a polynomial
//!    regression of the variogram, sill and range come from a brute force search
//!    minimizing the RMSE on the ascending part of the variogram,
//! 4. augmented [CovarianceMatrix] holding the Lagrange multiplier row and column,
//! 5. [InverseCovarianceMatrix] by Gauss-Jordan elimination,
//! 6. [KrigingPredictor] filling a [Raster](okriging_raster::Raster) cell by cell,
//!    with an optional correction of negative weights.
//!
//! Every matrix is checked for NaN and infinite values and any failing stage aborts the run.
//!
//! Kriging is implemented by [OrdinaryKriging] parameterized by [KrigingParams].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod covariance;
mod distance_matrix;
mod errors;
mod fitting;
pub mod health;
mod inversion;
mod parameters;
mod predictor;
mod regression;
mod stations;
mod utils;
mod variogram;

pub use algorithm::*;
pub use covariance::*;
pub use distance_matrix::*;
pub use errors::*;
pub use fitting::{fit_model, VariogramModel};
pub use inversion::*;
pub use parameters::*;
pub use predictor::*;
pub use regression::*;
pub use stations::{StationPoint, StationSet};
pub use variogram::*;
