use crate::errors::{RasterError, Result};
use crate::geodesy::GreatCircle;
use crate::raster::GridCell;
use linfa::{Float, ParamGuard};
use ndarray::Array2;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of raster rows
pub const DEFAULT_ROWS: usize = 900;

/// A validated regular latitude/longitude grid specification.
///
/// Row 0 is the northern edge (`max_lat`) and column 0 the western edge (`min_lon`).
/// The number of columns is derived from the aspect ratio of the bounds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GridSpec<F: Float> {
    pub(crate) min_lat: F,
    pub(crate) max_lat: F,
    pub(crate) min_lon: F,
    pub(crate) max_lon: F,
    pub(crate) rows: usize,
}

impl<F: Float> Default for GridSpec<F> {
    fn default() -> Self {
        GridSpec {
            min_lat: F::cast(47.),
            max_lat: F::cast(55.),
            min_lon: F::cast(5.),
            max_lon: F::cast(16.),
            rows: DEFAULT_ROWS,
        }
    }
}

impl<F: Float> GridSpec<F> {
    /// Southern bound
    pub fn min_lat(&self) -> F {
        self.min_lat
    }

    /// Northern bound
    pub fn max_lat(&self) -> F {
        self.max_lat
    }

    /// Western bound
    pub fn min_lon(&self) -> F {
        self.min_lon
    }

    /// Eastern bound
    pub fn max_lon(&self) -> F {
        self.max_lon
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn derived_cols(&self) -> Option<usize> {
        let ratio = (self.max_lon - self.min_lon) / (self.max_lat - self.min_lat);
        (F::cast(self.rows) * ratio).ceil().to_usize()
    }

    /// Number of columns: `ceil(rows * lon_extent / lat_extent)`
    pub fn cols(&self) -> usize {
        self.derived_cols().unwrap_or(0)
    }

    /// Shape `(rows, cols)` of the raster
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols())
    }

    /// Latitude step between two consecutive rows in decimal degrees
    pub fn lat_res(&self) -> F {
        (self.max_lat - self.min_lat) / F::cast(self.rows - 1)
    }

    /// Longitude step between two consecutive columns in decimal degrees
    pub fn lon_res(&self) -> F {
        (self.max_lon - self.min_lon) / F::cast(self.cols() - 1)
    }

    /// Metric resolution `(lat_res_km, lon_res_km)` measured from the grid origin
    /// (north-western corner)
    pub fn resolution_km(&self, metric: &GreatCircle<F>) -> (F, F) {
        let lat_km = metric.distance(
            self.max_lat,
            self.min_lon,
            self.max_lat - self.lat_res(),
            self.min_lon,
        );
        let lon_km = metric.distance(
            self.max_lat,
            self.min_lon,
            self.max_lat,
            self.min_lon + self.lon_res(),
        );
        (lat_km, lon_km)
    }

    /// Coordinates `(lat, lon)` of the node `(row, col)`
    pub fn node(&self, row: usize, col: usize) -> Result<(F, F)> {
        let (rows, cols) = self.shape();
        if row >= rows || col >= cols {
            return Err(RasterError::OutOfBoundsError {
                row,
                col,
                rows,
                cols,
            });
        }
        Ok(self.node_unchecked(row, col))
    }

    pub(crate) fn node_unchecked(&self, row: usize, col: usize) -> (F, F) {
        (
            self.max_lat - F::cast(row) * self.lat_res(),
            self.min_lon + F::cast(col) * self.lon_res(),
        )
    }

    /// Fractional `(row, col)` position of a location
    fn position(&self, lat: F, lon: F) -> (F, F) {
        (
            (self.max_lat - lat) / self.lat_res(),
            (lon - self.min_lon) / self.lon_res(),
        )
    }

    /// Whether the location lies inside the grid bounds with a tolerance of half a cell
    pub fn contains(&self, lat: F, lon: F) -> bool {
        if !(lat.is_finite() && lon.is_finite()) {
            return false;
        }
        let half = F::cast(0.5);
        let (r, c) = self.position(lat, lon);
        r >= -half
            && r <= F::cast(self.rows - 1) + half
            && c >= -half
            && c <= F::cast(self.cols() - 1) + half
    }

    /// Index `(row, col)` of the node nearest to the given location with respect to
    /// the great-circle distance or None if the location is outside the grid.
    ///
    /// The rounded fractional position and its eight neighbours are examined,
    /// on ties the first node in row-major order wins.
    pub fn nearest_index(&self, lat: F, lon: F, metric: &GreatCircle<F>) -> Option<(usize, usize)> {
        if !self.contains(lat, lon) {
            return None;
        }
        let (rows, cols) = self.shape();
        let (r, c) = self.position(lat, lon);
        let r0 = r.round().max(F::zero()).to_usize()?.min(rows - 1);
        let c0 = c.round().max(F::zero()).to_usize()?.min(cols - 1);

        let mut best: Option<((usize, usize), F)> = None;
        for i in r0.saturating_sub(1)..=(r0 + 1).min(rows - 1) {
            for j in c0.saturating_sub(1)..=(c0 + 1).min(cols - 1) {
                let (node_lat, node_lon) = self.node_unchecked(i, j);
                let d = metric.distance(lat, lon, node_lat, node_lon);
                match best {
                    Some((_, dmin)) if d >= dmin => (),
                    _ => best = Some(((i, j), d)),
                }
            }
        }
        best.map(|(index, _)| index)
    }

    /// Coordinates of all the nodes as a `(rows * cols, 2)` matrix of `[lat, lon]`
    /// rows in row-major order
    pub fn lattice(&self) -> Array2<F> {
        let cols = self.cols();
        Array2::from_shape_fn((self.rows * cols, 2), |(k, m)| {
            let (lat, lon) = self.node_unchecked(k / cols, k % cols);
            if m == 0 {
                lat
            } else {
                lon
            }
        })
    }
}

/// The set of parameters defining a [`GridSpec`], checked with [`ParamGuard::check`]
#[derive(Clone, Debug)]
pub struct GridParams<F: Float>(GridSpec<F>);

impl<F: Float> Default for GridParams<F> {
    fn default() -> Self {
        GridParams(GridSpec::default())
    }
}

impl<F: Float> GridParams<F> {
    /// Constructor given the grid bounds in decimal degrees
    pub fn new(min_lat: F, max_lat: F, min_lon: F, max_lon: F) -> Self {
        Self(GridSpec {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            ..Default::default()
        })
    }

    /// Set the number of rows, the number of columns follows from the bounds
    pub fn rows(mut self, rows: usize) -> Self {
        self.0.rows = rows;
        self
    }
}

impl<F: Float> ParamGuard for GridParams<F> {
    type Checked = GridSpec<F>;
    type Error = RasterError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let spec = &self.0;
        let bounds = [spec.min_lat, spec.max_lat, spec.min_lon, spec.max_lon];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(RasterError::InvalidGridError(
                "grid bounds should be finite".to_string(),
            ));
        }
        if spec.min_lat >= spec.max_lat || spec.min_lon >= spec.max_lon {
            return Err(RasterError::InvalidGridError(format!(
                "expected min < max, got lat [{}, {}] lon [{}, {}]",
                spec.min_lat, spec.max_lat, spec.min_lon, spec.max_lon
            )));
        }
        let lat_lim = F::cast(90.);
        let lon_lim = F::cast(180.);
        if spec.min_lat < -lat_lim || spec.max_lat > lat_lim {
            return Err(RasterError::InvalidGridError(format!(
                "latitudes should be within [-90, 90], got [{}, {}]",
                spec.min_lat, spec.max_lat
            )));
        }
        if spec.min_lon < -lon_lim || spec.max_lon > lon_lim {
            return Err(RasterError::InvalidGridError(format!(
                "longitudes should be within [-180, 180], got [{}, {}]",
                spec.min_lon, spec.max_lon
            )));
        }
        if spec.rows < 2 {
            return Err(RasterError::InvalidGridError(format!(
                "at least 2 rows are required, got {}",
                spec.rows
            )));
        }
        let cols = match spec.derived_cols() {
            Some(cols) if cols >= 2 => cols,
            _ => {
                return Err(RasterError::InvalidGridError(format!(
                    "bounds and {} rows give less than 2 columns",
                    spec.rows
                )))
            }
        };
        // the raster of cells has to be addressable
        let bytes = spec
            .rows
            .checked_mul(cols)
            .and_then(|cells| cells.checked_mul(std::mem::size_of::<GridCell<F>>()));
        match bytes {
            Some(bytes) if bytes <= isize::MAX as usize => Ok(spec),
            _ => Err(RasterError::InvalidGridError(format!(
                "a {}x{cols} raster is too large",
                spec.rows
            ))),
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
