use thiserror::Error;

/// A result type for station input and raster export
pub type Result<T> = std::result::Result<T, OkrigingError>;

/// An error when reading stations or writing rasters
#[derive(Error, Debug)]
pub enum OkrigingError {
    /// When a station line cannot be parsed
    #[error("Station file line {line}: {message}")]
    ParseError {
        /// 1-based line number in the station file
        line: usize,
        /// what is wrong with the line
        message: String,
    },
    /// When reading or writing a file fails
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// When a delimited file is malformed or cannot be written
    #[error(transparent)]
    CsvError(#[from] csv::Error),
    /// When the kriging pipeline fails
    #[error(transparent)]
    KrigingError(#[from] okriging_kriging::KrigingError),
    /// When the raster is inconsistent
    #[error(transparent)]
    RasterError(#[from] okriging_raster::RasterError),
}
