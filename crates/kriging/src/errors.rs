use std::fmt;
use thiserror::Error;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A result type for kriging
pub type Result<T> = std::result::Result<T, KrigingError>;

/// Stages of the kriging pipeline, reported by fatal errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Stage {
    /// Pairwise station distances
    Distances,
    /// Empirical variogram
    Variogram,
    /// Nugget, sill and range estimation
    ModelFit,
    /// Augmented covariance matrix
    Covariance,
    /// Covariance matrix inversion
    Inversion,
    /// Per-cell prediction
    Interpolation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Distances => "distance matrix",
            Stage::Variogram => "empirical variogram",
            Stage::ModelFit => "variogram model fit",
            Stage::Covariance => "covariance matrix",
            Stage::Inversion => "matrix inversion",
            Stage::Interpolation => "interpolation",
        };
        write!(f, "{name}")
    }
}

/// An error when running [`OrdinaryKriging`](crate::OrdinaryKriging)
#[derive(Error, Debug)]
pub enum KrigingError {
    /// When parameters or grid definition are invalid
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// When the station set cannot support kriging
    #[error("Data error: {0}")]
    DataError(String),
    /// When NaN or infinite values show up
    #[error("Numeric error during {stage}: {message}")]
    NumericError {
        /// failing stage
        stage: Stage,
        /// what went wrong
        message: String,
    },
    /// When Gauss-Jordan elimination meets a zero or non finite pivot
    #[error("Singular matrix during {stage}: bad pivot at row {pivot}")]
    SingularMatrixError {
        /// failing stage
        stage: Stage,
        /// first bad pivot row
        pivot: usize,
    },
    /// When a matrix buffer cannot be allocated
    #[error("Allocation error during {stage}: {message}")]
    AllocationError {
        /// failing stage
        stage: Stage,
        /// what went wrong
        message: String,
    },
    /// When raster handling fails
    #[error(transparent)]
    RasterError(#[from] okriging_raster::RasterError),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
}

impl KrigingError {
    /// Stage of a fatal pipeline error if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            KrigingError::NumericError { stage, .. }
            | KrigingError::SingularMatrixError { stage, .. }
            | KrigingError::AllocationError { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
