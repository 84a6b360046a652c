use crate::errors::{RasterError, Result};
use crate::geodesy::GreatCircle;
use crate::grid::GridSpec;
use linfa::Float;
use log::{debug, warn};
use ndarray::{Array1, Array2};
use ndarray_stats::QuantileExt;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Value exported for cells which do not hold a value
pub const NO_VALUE: f64 = -1.;

/// State of a raster cell, a cell leaves the `Unknown` state exactly once
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum CellState<F: Float> {
    /// Not yet filled
    #[default]
    Unknown,
    /// Copied from a measurement station
    Measured(F),
    /// Estimated by interpolation
    Interpolated(F),
    /// Interpolation could not produce a value
    Unresolved,
}

impl<F: Float> CellState<F> {
    /// The cell value if any
    pub fn value(&self) -> Option<F> {
        match self {
            CellState::Measured(v) | CellState::Interpolated(v) => Some(*v),
            CellState::Unknown | CellState::Unresolved => None,
        }
    }

    /// Whether the cell still waits for a value
    pub fn is_unknown(&self) -> bool {
        matches!(self, CellState::Unknown)
    }
}

/// A node of the raster
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GridCell<F: Float> {
    /// row index
    pub row: usize,
    /// column index
    pub col: usize,
    /// latitude in decimal degrees
    pub lat: F,
    /// longitude in decimal degrees
    pub lon: F,
    /// current state
    pub state: CellState<F>,
    /// name of the station copied into the cell if any
    pub station: Option<String>,
}

impl<F: Float> GridCell<F> {
    /// Cell value or the [`NO_VALUE`] sentinel
    pub fn value_or_sentinel(&self) -> F {
        self.state.value().unwrap_or_else(|| F::cast(NO_VALUE))
    }
}

/// Statistics over the cells holding a value
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct RasterSummary<F: Float> {
    /// smallest value
    pub min: F,
    /// largest value
    pub max: F,
    /// mean value
    pub mean: F,
    /// number of cells holding a value
    pub resolved: usize,
    /// number of cells flagged unresolved
    pub unresolved: usize,
}

/// A regular latitude/longitude raster of [`GridCell`]s
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Raster<F: Float> {
    spec: GridSpec<F>,
    cells: Array2<GridCell<F>>,
}

impl<F: Float> Raster<F> {
    /// Allocate a raster of unknown cells following the given specification,
    /// reporting allocation failure instead of aborting
    pub fn new(spec: &GridSpec<F>) -> Result<Self> {
        let (rows, cols) = spec.shape();
        let size = rows
            .checked_mul(cols)
            .ok_or_else(|| RasterError::AllocationError(format!("{rows}x{cols} cells overflow")))?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(size)
            .map_err(|e| RasterError::AllocationError(format!("{rows}x{cols} raster: {e}")))?;
        for row in 0..rows {
            for col in 0..cols {
                let (lat, lon) = spec.node_unchecked(row, col);
                cells.push(GridCell {
                    row,
                    col,
                    lat,
                    lon,
                    state: CellState::Unknown,
                    station: None,
                });
            }
        }
        let cells = Array2::from_shape_vec((rows, cols), cells)
            .map_err(|e| RasterError::AllocationError(e.to_string()))?;
        Ok(Raster {
            spec: spec.clone(),
            cells,
        })
    }

    /// Grid specification
    pub fn spec(&self) -> &GridSpec<F> {
        &self.spec
    }

    /// Shape `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    /// All cells
    pub fn cells(&self) -> &Array2<GridCell<F>> {
        &self.cells
    }

    /// Cell at `(row, col)`
    pub fn cell(&self, row: usize, col: usize) -> Result<&GridCell<F>> {
        let (rows, cols) = self.shape();
        self.cells
            .get((row, col))
            .ok_or(RasterError::OutOfBoundsError {
                row,
                col,
                rows,
                cols,
            })
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut GridCell<F>> {
        let (rows, cols) = self.shape();
        self.cells
            .get_mut((row, col))
            .ok_or(RasterError::OutOfBoundsError {
                row,
                col,
                rows,
                cols,
            })
    }

    /// Copy a station measurement into its nearest cell.
    ///
    /// Returns the cell index or None when the station lies outside the raster.
    /// When two stations fall into the same cell the last one wins.
    pub fn snap_station(
        &mut self,
        name: &str,
        lat: F,
        lon: F,
        value: F,
        metric: &GreatCircle<F>,
    ) -> Result<Option<(usize, usize)>> {
        if !value.is_finite() {
            return Err(RasterError::InvalidValueError(format!(
                "station {name} has a non finite value {value}"
            )));
        }
        let Some((row, col)) = self.spec.nearest_index(lat, lon, metric) else {
            debug!("Station {name} ({lat}, {lon}) is outside the raster");
            return Ok(None);
        };
        let cell = self.cell_mut(row, col)?;
        match cell.state {
            CellState::Unknown => (),
            CellState::Measured(previous) => warn!(
                "Station {name} replaces {} (value {previous}) in cell ({row}, {col})",
                cell.station.as_deref().unwrap_or("?")
            ),
            CellState::Interpolated(_) | CellState::Unresolved => {
                return Err(RasterError::CellAlreadyFilledError { row, col })
            }
        }
        cell.state = CellState::Measured(value);
        cell.station = Some(name.to_string());
        Ok(Some((row, col)))
    }

    /// Set the interpolated value of an unknown cell
    pub fn set_interpolated(&mut self, row: usize, col: usize, value: F) -> Result<()> {
        if !value.is_finite() {
            return Err(RasterError::InvalidValueError(format!(
                "non finite value {value} for cell ({row}, {col})"
            )));
        }
        self.fill(row, col, CellState::Interpolated(value))
    }

    /// Flag an unknown cell as unresolved
    pub fn set_unresolved(&mut self, row: usize, col: usize) -> Result<()> {
        self.fill(row, col, CellState::Unresolved)
    }

    fn fill(&mut self, row: usize, col: usize, state: CellState<F>) -> Result<()> {
        let cell = self.cell_mut(row, col)?;
        if !cell.state.is_unknown() {
            return Err(RasterError::CellAlreadyFilledError { row, col });
        }
        cell.state = state;
        Ok(())
    }

    /// Cells still waiting for a value as `(row, col, lat, lon)` in row-major order
    pub fn pending(&self) -> Vec<(usize, usize, F, F)> {
        self.cells
            .iter()
            .filter(|c| c.state.is_unknown())
            .map(|c| (c.row, c.col, c.lat, c.lon))
            .collect()
    }

    /// Number of cells flagged unresolved
    pub fn unresolved_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c.state, CellState::Unresolved))
            .count()
    }

    /// Cell values, cells without value hold [`NO_VALUE`]
    pub fn values(&self) -> Array2<F> {
        self.cells.map(|c| c.value_or_sentinel())
    }

    /// Cell latitudes
    pub fn lats(&self) -> Array2<F> {
        self.cells.map(|c| c.lat)
    }

    /// Cell longitudes
    pub fn lons(&self) -> Array2<F> {
        self.cells.map(|c| c.lon)
    }

    /// Statistics of the resolved cells, None if no cell holds a value
    pub fn summary(&self) -> Option<RasterSummary<F>> {
        let resolved: Array1<F> = self.cells.iter().filter_map(|c| c.state.value()).collect();
        let min = *resolved.min().ok()?;
        let max = *resolved.max().ok()?;
        let mean = resolved.mean()?;
        Some(RasterSummary {
            min,
            max,
            mean,
            resolved: resolved.len(),
            unresolved: self.unresolved_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridParams;
    use approx::assert_abs_diff_eq;
    use linfa::ParamGuard;
    use ndarray::array;

    fn small_raster() -> Raster<f64> {
        let spec = GridParams::new(0., 0.2, 0., 0.2).rows(2).check().unwrap();
        Raster::new(&spec).unwrap()
    }

    #[test]
    fn test_allocation_failure() {
        // built without validation, its cells do not fit in memory
        let spec = GridSpec {
            min_lat: 47.,
            max_lat: 55.,
            min_lon: 5.,
            max_lon: 16.,
            rows: 1 << 31,
        };
        assert!(matches!(
            Raster::new(&spec),
            Err(RasterError::AllocationError(_))
        ));
    }

    #[test]
    fn test_new_raster() {
        let raster = small_raster();
        assert_eq!(raster.shape(), (2, 2));
        assert_eq!(raster.pending().len(), 4);
        assert_abs_diff_eq!(raster.values(), Array2::from_elem((2, 2), -1.));
        assert_abs_diff_eq!(raster.lats(), array![[0.2, 0.2], [0., 0.]], epsilon = 1e-12);
        assert_abs_diff_eq!(raster.lons(), array![[0., 0.2], [0., 0.2]], epsilon = 1e-12);
        assert!(raster.summary().is_none());
    }

    #[test]
    fn test_snap_station() {
        let metric = GreatCircle::default();
        let mut raster = small_raster();
        let index = raster.snap_station("A", 0.01, 0.02, 10., &metric).unwrap();
        assert_eq!(index, Some((1, 0)));
        let cell = raster.cell(1, 0).unwrap();
        assert_eq!(cell.state, CellState::Measured(10.));
        assert_eq!(cell.station.as_deref(), Some("A"));

        // outside
        let index = raster.snap_station("B", 1., 0., 30., &metric).unwrap();
        assert_eq!(index, None);

        // later station wins
        let index = raster.snap_station("C", 0., 0., 12., &metric).unwrap();
        assert_eq!(index, Some((1, 0)));
        assert_eq!(raster.cell(1, 0).unwrap().state, CellState::Measured(12.));
        assert_eq!(raster.pending().len(), 3);

        assert!(raster.snap_station("D", 0., 0., f64::NAN, &metric).is_err());
    }

    #[test]
    fn test_fill_once() {
        let mut raster = small_raster();
        raster.set_interpolated(0, 0, 3.5).unwrap();
        raster.set_unresolved(0, 1).unwrap();
        assert!(matches!(
            raster.set_interpolated(0, 0, 1.),
            Err(RasterError::CellAlreadyFilledError { row: 0, col: 0 })
        ));
        assert!(raster.set_unresolved(0, 1).is_err());
        assert!(raster.set_interpolated(1, 1, f64::INFINITY).is_err());
        assert!(matches!(
            raster.set_interpolated(5, 0, 1.),
            Err(RasterError::OutOfBoundsError { .. })
        ));
        assert_eq!(raster.unresolved_count(), 1);
        assert_abs_diff_eq!(raster.values(), array![[3.5, -1.], [-1., -1.]]);
    }

    #[test]
    fn test_summary() {
        let metric = GreatCircle::default();
        let mut raster = small_raster();
        raster.snap_station("A", 0., 0., 10., &metric).unwrap();
        raster.set_interpolated(0, 0, 2.).unwrap();
        raster.set_interpolated(0, 1, 6.).unwrap();
        raster.set_unresolved(1, 1).unwrap();
        let summary = raster.summary().unwrap();
        assert_abs_diff_eq!(summary.min, 2.);
        assert_abs_diff_eq!(summary.max, 10.);
        assert_abs_diff_eq!(summary.mean, 6.);
        assert_eq!(summary.resolved, 3);
        assert_eq!(summary.unresolved, 1);
    }
}
