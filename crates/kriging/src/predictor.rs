use crate::errors::{KrigingError, Result, Stage};
use crate::fitting::VariogramModel;
use crate::inversion::InverseCovarianceMatrix;
use crate::stations::StationSet;
use linfa::Float;
use log::debug;
use ndarray::Array1;
use okriging_raster::{GreatCircle, Raster};
use rayon::prelude::*;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Outcome of the prediction at one location
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Prediction<F: Float> {
    /// Weighted sum of the station values
    Value(F),
    /// Every weight was zeroed by the negative weights correction
    Unresolved,
}

/// Ordinary kriging predictor sharing the read-only inverse matrix between locations
pub struct KrigingPredictor<'a, F: Float> {
    stations: &'a StationSet<F>,
    model: &'a VariogramModel<F>,
    inverse: &'a InverseCovarianceMatrix<F>,
    metric: GreatCircle<F>,
    weights_correction: bool,
}

impl<'a, F: Float> KrigingPredictor<'a, F> {
    /// Constructor
    pub fn new(
        stations: &'a StationSet<F>,
        model: &'a VariogramModel<F>,
        inverse: &'a InverseCovarianceMatrix<F>,
        metric: GreatCircle<F>,
        weights_correction: bool,
    ) -> Self {
        KrigingPredictor {
            stations,
            model,
            inverse,
            metric,
            weights_correction,
        }
    }

    /// Covariance vector (length n+1) of a location: model values of the distances
    /// to every station followed by 1
    pub fn covariance_vector(&self, lat: F, lon: F) -> Result<Array1<F>> {
        let n = self.stations.len();
        let coords = self.stations.coords();
        let mut cov = Array1::ones(n + 1);
        for i in 0..n {
            let d = self
                .metric
                .site_distance(lat, lon, coords[[i, 0]], coords[[i, 1]]);
            if !d.is_finite() {
                return Err(KrigingError::NumericError {
                    stage: Stage::Interpolation,
                    message: format!("distance from ({lat}, {lon}) to station {i} is {d}"),
                });
            }
            cov[i] = self.model.value(d);
        }
        Ok(cov)
    }

    /// Kriging weights (length n+1, the last one being the Lagrange multiplier) at a
    /// location, corrected when enabled. None when the correction zeroes every weight.
    pub fn weights_at(&self, lat: F, lon: F) -> Result<Option<Array1<F>>> {
        let cov = self.covariance_vector(lat, lon)?;
        let mut weights = self.inverse.weights(&cov);
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(KrigingError::NumericError {
                stage: Stage::Interpolation,
                message: format!("non finite kriging weights at ({lat}, {lon})"),
            });
        }
        if self.weights_correction && !correct_weights(&mut weights, &cov, self.stations.len())? {
            return Ok(None);
        }
        Ok(Some(weights))
    }

    /// Predicted value at a location
    pub fn predict_at(&self, lat: F, lon: F) -> Result<Prediction<F>> {
        let Some(weights) = self.weights_at(lat, lon)? else {
            return Ok(Prediction::Unresolved);
        };
        let n = self.stations.len();
        let value = weights
            .slice(ndarray::s![..n])
            .dot(self.stations.values());
        if !value.is_finite() {
            return Err(KrigingError::NumericError {
                stage: Stage::Interpolation,
                message: format!("non finite prediction at ({lat}, {lon})"),
            });
        }
        Ok(Prediction::Value(value))
    }

    /// Fill every unknown raster cell, cells holding a measurement are left untouched.
    /// Cells are predicted in parallel then written in row-major order.
    /// Returns the number of unresolved cells.
    pub fn predict_raster(&self, raster: &mut Raster<F>) -> Result<usize> {
        let pending = raster.pending();
        debug!("Predict {} cells", pending.len());
        let predictions = pending
            .par_iter()
            .map(|&(row, col, lat, lon)| Ok((row, col, self.predict_at(lat, lon)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut unresolved = 0;
        for (row, col, prediction) in predictions {
            match prediction {
                Prediction::Value(v) => raster.set_interpolated(row, col, v)?,
                Prediction::Unresolved => {
                    raster.set_unresolved(row, col)?;
                    unresolved += 1;
                }
            }
        }
        Ok(unresolved)
    }
}

/// Correct the first `n` kriging weights in place.
///
/// When some weights are negative, they are set to zero, as well as the positive weights
/// both below the mean magnitude of the negative weights and with a covariance below the
/// mean covariance of the negative ones. Remaining weights are rescaled to sum to one.
/// Returns false when no weight remains.
pub fn correct_weights<F: Float>(weights: &mut Array1<F>, cov: &Array1<F>, n: usize) -> Result<bool> {
    let mut count = 0usize;
    let mut sum_neg = F::zero();
    let mut sum_cov = F::zero();
    for i in 0..n {
        if weights[i] < F::zero() {
            sum_neg += weights[i].abs();
            sum_cov += cov[i];
            count += 1;
        }
    }
    if count == 0 {
        return Ok(true);
    }
    let avg_neg = sum_neg / F::cast(count);
    let avg_cov = sum_cov / F::cast(count);
    if !(avg_neg.is_finite() && avg_cov.is_finite()) {
        return Err(KrigingError::NumericError {
            stage: Stage::Interpolation,
            message: "non finite averages in negative weights correction".to_string(),
        });
    }

    let mut sum = F::zero();
    for i in 0..n {
        let w = weights[i];
        if w < F::zero() || (w > F::zero() && cov[i] < avg_cov && w < avg_neg) {
            weights[i] = F::zero();
        } else {
            sum += w;
        }
    }
    if sum == F::zero() {
        return Ok(false);
    }
    for i in 0..n {
        weights[i] /= sum;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covariance::CovarianceMatrix;
    use crate::distance_matrix::DistanceMatrix;
    use crate::stations::StationPoint;
    use approx::assert_abs_diff_eq;
    use linfa::ParamGuard;
    use ndarray::{array, Array2};
    use okriging_raster::{CellState, GridParams};

    fn square_stations() -> Vec<StationPoint<f64>> {
        vec![
            StationPoint::new("SW", 50., 10., 2.),
            StationPoint::new("SE", 50., 10.5, 4.),
            StationPoint::new("NW", 50.5, 10., 6.),
            StationPoint::new("NE", 50.5, 10.5, 8.),
            StationPoint::new("C", 50.25, 10.25, 5.),
        ]
    }

    #[test]
    fn test_negative_weights_on_station_layout() {
        let metric = GreatCircle::default();
        let set = StationSet::new(&square_stations(), &metric).unwrap();
        let dm = DistanceMatrix::new(&set, &metric).unwrap();
        let model = VariogramModel::with_parameters(0.001, 50., 300.);
        let cov = CovarianceMatrix::new(&dm, &model, false).unwrap();
        let inverse = InverseCovarianceMatrix::new(&cov, false).unwrap();

        // north of SW, the NE station is screened by C
        let (lat, lon) = (50.12, 10.);
        let raw = KrigingPredictor::new(&set, &model, &inverse, metric, false)
            .weights_at(lat, lon)
            .unwrap()
            .unwrap();
        assert_abs_diff_eq!(
            raw,
            array![0.615980, 0.005627, 0.117528, -0.033489, 0.294354, 0.324012],
            epsilon = 1e-5
        );
        assert!(raw[3] < 0.);
        assert_abs_diff_eq!(raw.slice(ndarray::s![..5]).sum(), 1., epsilon = 1e-9);

        let predictor = KrigingPredictor::new(&set, &model, &inverse, metric, true);
        let corrected = predictor.weights_at(lat, lon).unwrap().unwrap();
        // NE is negative, SE is small and nearer than NE: both dropped
        assert_abs_diff_eq!(
            corrected,
            array![0.599283, 0., 0.114342, 0., 0.286375, 0.324012],
            epsilon = 1e-5
        );
        match predictor.predict_at(lat, lon).unwrap() {
            Prediction::Value(v) => assert_abs_diff_eq!(v, 3.316493, epsilon = 1e-5),
            Prediction::Unresolved => panic!("weights left after correction"),
        }
    }

    #[test]
    fn test_unresolved_cells() {
        let metric = GreatCircle::default();
        let points = vec![
            StationPoint::new("S0", 49.4, 9., 7.),
            StationPoint::new("S1", 51.6, 8., 3.),
            StationPoint::new("S2", 51.6, 8.1, 6.),
        ];
        let set = StationSet::new(&points, &metric).unwrap();
        let model = VariogramModel::with_parameters(0.5, 10., 300.);
        // every location gets the weights [-0.5, 0.1, 0.05] and a zero multiplier
        let mut m = Array2::zeros((4, 4));
        m.column_mut(3).assign(&array![-0.5, 0.1, 0.05, 0.]);
        let inverse = InverseCovarianceMatrix::from_array(m);
        let spec = GridParams::new(50., 51., 8., 9.).rows(2).check().unwrap();

        // on the northern row S1 and S2 are nearer than S0, nothing is left
        let mut raster = Raster::new(&spec).unwrap();
        let predictor = KrigingPredictor::new(&set, &model, &inverse, metric, true);
        assert_eq!(predictor.predict_at(51., 9.).unwrap(), Prediction::Unresolved);
        assert_eq!(predictor.predict_raster(&mut raster).unwrap(), 2);
        assert_eq!(raster.unresolved_count(), 2);
        for col in 0..2 {
            let cell = raster.cell(0, col).unwrap();
            assert_eq!(cell.state, CellState::Unresolved);
            assert_abs_diff_eq!(cell.value_or_sentinel(), -1.);
        }
        assert_abs_diff_eq!(raster.values(), array![[-1., -1.], [4., 4.]], epsilon = 1e-12);

        let mut raster = Raster::new(&spec).unwrap();
        let predictor = KrigingPredictor::new(&set, &model, &inverse, metric, false);
        assert_eq!(predictor.predict_raster(&mut raster).unwrap(), 0);
        assert_abs_diff_eq!(raster.values(), Array2::from_elem((2, 2), -2.9), epsilon = 1e-12);
    }

    #[test]
    fn test_no_negative_weight() {
        let mut w = array![0.2, 0.3, 0.5, -4.];
        let c = array![1., 2., 3., 1.];
        assert!(correct_weights(&mut w, &c, 3).unwrap());
        // the Lagrange term is not a weight
        assert_abs_diff_eq!(w, array![0.2, 0.3, 0.5, -4.]);
    }

    #[test]
    fn test_correction() {
        // negatives: -0.2 (cov 2) and -0.1 (cov 4) -> mean magnitude 0.15, mean cov 3
        // 0.1 has cov 1 < 3 and 0.1 < 0.15: zeroed
        // 0.5 has cov 1 < 3 but 0.5 >= 0.15: kept
        // 0.7 has cov 5 >= 3: kept
        let mut w = array![-0.2, -0.1, 0.1, 0.5, 0.7, 0.3];
        let c = array![2., 4., 1., 1., 5., 1.];
        assert!(correct_weights(&mut w, &c, 5).unwrap());
        assert_abs_diff_eq!(
            w.slice(ndarray::s![..5]),
            array![0., 0., 0., 0.5 / 1.2, 0.7 / 1.2],
            epsilon = 1e-12
        );
        assert!(w.iter().take(5).all(|v| *v >= 0.));
        assert_abs_diff_eq!(w.slice(ndarray::s![..5]).sum(), 1., epsilon = 1e-12);
    }

    #[test]
    fn test_all_weights_zeroed() {
        let mut w = array![-0.5, 0.1, 0.];
        let c = array![3., 1., 1.];
        assert!(!correct_weights(&mut w, &c, 3).unwrap());
    }

    #[test]
    fn test_non_finite_correction() {
        let mut w = array![-0.5, 1.5];
        let c = array![f64::NAN, 1.];
        assert!(correct_weights(&mut w, &c, 2).is_err());
    }
}
