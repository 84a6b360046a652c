use crate::errors::{KrigingError, Result, Stage};
use linfa::Float;
use ndarray::Array2;

/// Allocate a zeroed (nrows, ncols) matrix, reporting allocation failure
/// instead of aborting
pub(crate) fn try_zeros<F: Float>(stage: Stage, nrows: usize, ncols: usize) -> Result<Array2<F>> {
    let size = nrows
        .checked_mul(ncols)
        .ok_or_else(|| KrigingError::AllocationError {
            stage,
            message: format!("{nrows}x{ncols} matrix size overflows"),
        })?;
    let mut buffer: Vec<F> = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|e| KrigingError::AllocationError {
            stage,
            message: format!("{nrows}x{ncols} matrix: {e}"),
        })?;
    buffer.resize(size, F::zero());
    Array2::from_shape_vec((nrows, ncols), buffer).map_err(|e| KrigingError::AllocationError {
        stage,
        message: e.to_string(),
    })
}
