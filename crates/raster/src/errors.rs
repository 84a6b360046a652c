use thiserror::Error;

/// A result type for raster operations
pub type Result<T> = std::result::Result<T, RasterError>;

/// An error when defining or filling a [`Raster`](crate::Raster)
#[derive(Error, Debug)]
pub enum RasterError {
    /// When grid bounds or size are invalid
    #[error("Invalid grid: {0}")]
    InvalidGridError(String),
    /// When a cell index lies outside the raster
    #[error("Cell ({row}, {col}) is outside a {rows}x{cols} raster")]
    OutOfBoundsError {
        /// row index
        row: usize,
        /// column index
        col: usize,
        /// raster rows
        rows: usize,
        /// raster columns
        cols: usize,
    },
    /// When an interpolated value is written to a cell that already holds one
    #[error("Cell ({row}, {col}) already holds a value")]
    CellAlreadyFilledError {
        /// row index
        row: usize,
        /// column index
        col: usize,
    },
    /// When the raster cells cannot be allocated
    #[error("Allocation error: {0}")]
    AllocationError(String),
    /// When a non finite value is written to a cell
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}
