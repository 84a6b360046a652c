use crate::covariance::CovarianceMatrix;
use crate::distance_matrix::DistanceMatrix;
use crate::errors::{Result, Stage};
use crate::fitting::{fit_model, VariogramModel};
use crate::health::{ensure_finite, log_preview};
use crate::inversion::InverseCovarianceMatrix;
use crate::parameters::{KrigingParams, KrigingValidParams};
use crate::predictor::{KrigingPredictor, Prediction};
use crate::stations::{describe, StationPoint, StationSet};
use crate::variogram::EmpiricalVariogram;
use linfa::Float;
use log::{debug, info};
use ndarray::Array1;
use okriging_raster::{GridSpec, Raster, RasterSummary};
use std::fmt;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// States of the kriging pipeline, each stage moves to the next state
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum PipelineState {
    /// Nothing computed
    Init,
    /// Station distance matrix computed
    DistancesReady,
    /// Empirical variogram computed
    VariogramReady,
    /// Nugget, sill and range fitted
    ModelFitted,
    /// Augmented covariance matrix built
    CovarianceReady,
    /// Covariance matrix inverted
    Inverted,
    /// Raster cells predicted
    Interpolated,
    /// Run completed
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "INIT",
            PipelineState::DistancesReady => "DISTANCES_READY",
            PipelineState::VariogramReady => "VARIOGRAM_READY",
            PipelineState::ModelFitted => "MODEL_FITTED",
            PipelineState::CovarianceReady => "COVARIANCE_READY",
            PipelineState::Inverted => "INVERTED",
            PipelineState::Interpolated => "INTERPOLATED",
            PipelineState::Done => "DONE",
        };
        write!(f, "{name}")
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!("Pipeline {state} -> {next}");
    *state = next;
}

/// Ordinary kriging model fitted on a station set.
///
/// It holds the station set, the empirical variogram, the fitted variogram model and the
/// inverted augmented covariance matrix, everything being read-only once built.
///
/// ```
/// use okriging_kriging::{OrdinaryKriging, StationPoint};
/// use okriging_raster::GridParams;
/// use linfa::ParamGuard;
///
/// let stations = vec![
///     StationPoint::new("A", 0., 0., 10.),
///     StationPoint::new("B", 0., 1., 20.),
///     StationPoint::new("C", 1., 0., 30.),
/// ];
/// let kriging = OrdinaryKriging::params()
///     .distance_interval(1.)
///     .check()
///     .expect("valid parameters")
///     .fit(&stations)
///     .expect("kriging model");
/// let grid = GridParams::new(0., 0.2, 0., 0.2).rows(2).check().expect("valid grid");
/// let output = kriging.interpolate(&grid).expect("interpolated raster");
/// println!("{:?}", output.raster.values());
/// ```
#[derive(Clone, Debug)]
pub struct OrdinaryKriging<F: Float> {
    params: KrigingValidParams<F>,
    stations: StationSet<F>,
    variogram: EmpiricalVariogram<F>,
    model: VariogramModel<F>,
    covariance: CovarianceMatrix<F>,
    inverse: InverseCovarianceMatrix<F>,
    state: PipelineState,
}

impl<F: Float> OrdinaryKriging<F> {
    /// Ordinary kriging parameters with default values
    pub fn params() -> KrigingParams<F> {
        KrigingParams::new()
    }

    /// Parameters used to build the model
    pub fn parameters(&self) -> &KrigingValidParams<F> {
        &self.params
    }

    /// Station set
    pub fn stations(&self) -> &StationSet<F> {
        &self.stations
    }

    /// Empirical variogram with regression predictions
    pub fn variogram(&self) -> &EmpiricalVariogram<F> {
        &self.variogram
    }

    /// Fitted variogram model
    pub fn model(&self) -> &VariogramModel<F> {
        &self.model
    }

    /// Augmented covariance matrix
    pub fn covariance(&self) -> &CovarianceMatrix<F> {
        &self.covariance
    }

    /// Inverse of the augmented covariance matrix
    pub fn inverse(&self) -> &InverseCovarianceMatrix<F> {
        &self.inverse
    }

    /// Current pipeline state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Predictor sharing the inverse matrix
    pub fn predictor(&self) -> KrigingPredictor<'_, F> {
        KrigingPredictor::new(
            &self.stations,
            &self.model,
            &self.inverse,
            self.params.metric(),
            self.params.weights_correction(),
        )
    }

    /// Prediction at a single location
    pub fn predict_at(&self, lat: F, lon: F) -> Result<Prediction<F>> {
        self.predictor().predict_at(lat, lon)
    }

    /// Kriging weights at a single location (see [`KrigingPredictor::weights_at`])
    pub fn weights_at(&self, lat: F, lon: F) -> Result<Option<Array1<F>>> {
        self.predictor().weights_at(lat, lon)
    }

    /// Copy stations into a raster following the grid specification then predict
    /// every remaining cell
    pub fn interpolate(&self, grid: &GridSpec<F>) -> Result<KrigingOutput<F>> {
        let mut state = self.state;
        let metric = self.params.metric();
        let (rows, cols) = grid.shape();
        info!("Interpolate on a {rows}x{cols} raster");

        let mut raster = Raster::new(grid)?;
        let mut snapped = 0;
        for (name, lat, lon, value) in self.stations.iter() {
            if raster.snap_station(name, lat, lon, value, &metric)?.is_some() {
                snapped += 1;
            }
        }
        debug!("{snapped} stations copied into the raster");

        let unresolved_cells = self.predictor().predict_raster(&mut raster)?;
        if unresolved_cells > 0 {
            info!("{unresolved_cells} cells left unresolved by the weights correction");
        }
        advance(&mut state, PipelineState::Interpolated);

        let summary = raster.summary();
        if let Some(s) = &summary {
            info!(
                "Raster values in [{}, {}], mean {} ({} cells)",
                s.min, s.max, s.mean, s.resolved
            );
        }
        advance(&mut state, PipelineState::Done);

        Ok(KrigingOutput {
            raster,
            model: self.model.clone(),
            variogram: self.variogram.clone(),
            summary,
            unresolved_cells,
            state,
        })
    }
}

/// Result of a kriging run
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct KrigingOutput<F: Float> {
    /// interpolated raster
    pub raster: Raster<F>,
    /// fitted variogram model
    pub model: VariogramModel<F>,
    /// empirical variogram
    pub variogram: EmpiricalVariogram<F>,
    /// statistics of the raster values
    pub summary: Option<RasterSummary<F>>,
    /// number of cells flagged unresolved
    pub unresolved_cells: usize,
    /// final pipeline state
    pub state: PipelineState,
}

impl<F: Float> KrigingValidParams<F> {
    /// Build the ordinary kriging model of the given stations: distance matrix, empirical
    /// variogram, model fit, augmented covariance matrix and its inverse.
    /// Any failing stage aborts the whole run.
    pub fn fit(&self, stations: &[StationPoint<F>]) -> Result<OrdinaryKriging<F>> {
        let mut state = PipelineState::Init;
        let metric = self.metric();
        let stations = StationSet::new(stations, &metric)?;
        describe(&stations);
        stations.log_table(self.verbose());

        let distances = DistanceMatrix::new(&stations, &metric)?;
        log_preview(distances.as_array(), "Distance matrix", self.verbose());
        ensure_finite(
            distances.as_array(),
            "Distance matrix",
            Stage::Distances,
            self.verbose(),
        )?;
        advance(&mut state, PipelineState::DistancesReady);

        let mut variogram = EmpiricalVariogram::new(
            &distances,
            stations.values(),
            self.distance_interval(),
            self.max_distance(),
        )?;
        info!(
            "Empirical variogram: {}/{} populated lags",
            variogram.n_populated(),
            variogram.lags().len()
        );
        advance(&mut state, PipelineState::VariogramReady);

        let model = fit_model(&mut variogram, self)?;
        variogram.log_table(self.verbose());
        advance(&mut state, PipelineState::ModelFitted);

        let covariance = CovarianceMatrix::new(&distances, &model, self.verbose())?;
        drop(distances);
        advance(&mut state, PipelineState::CovarianceReady);

        let inverse = InverseCovarianceMatrix::new(&covariance, self.verbose())?;
        advance(&mut state, PipelineState::Inverted);

        Ok(OrdinaryKriging {
            params: self.clone(),
            stations,
            variogram,
            model,
            covariance,
            inverse,
            state,
        })
    }

    /// Run the whole pipeline from stations to interpolated raster
    pub fn interpolate(
        &self,
        stations: &[StationPoint<F>],
        grid: &GridSpec<F>,
    ) -> Result<KrigingOutput<F>> {
        self.fit(stations)?.interpolate(grid)
    }
}
