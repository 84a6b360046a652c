use crate::distance_matrix::DistanceMatrix;
use crate::errors::{Result, Stage};
use crate::fitting::VariogramModel;
use crate::health::{ensure_finite, log_preview, MatrixHealth};
use crate::utils::try_zeros;
use linfa::Float;
use ndarray::Array2;

/// Augmented (n+1, n+1) ordinary kriging matrix.
///
/// The (n, n) upper-left block holds the model values between stations, the last row
/// and column hold ones except for the zero corner. They stand for the Lagrange multiplier
/// enforcing that kriging weights sum to one.
#[derive(Clone, Debug)]
pub struct CovarianceMatrix<F: Float> {
    pub(crate) data: Array2<F>,
}

impl<F: Float> CovarianceMatrix<F> {
    /// Build the augmented matrix from station distances and the fitted model
    pub fn new(
        distances: &DistanceMatrix<F>,
        model: &VariogramModel<F>,
        verbose: bool,
    ) -> Result<Self> {
        let n = distances.len();
        let d = distances.as_array();
        let mut data = try_zeros(Stage::Covariance, n + 1, n + 1)?;
        for i in 0..n {
            for j in i..n {
                let c = model.value(d[[i, j]]);
                data[[i, j]] = c;
                data[[j, i]] = c;
            }
            data[[i, n]] = F::one();
            data[[n, i]] = F::one();
        }
        log_preview(&data, "Covariance matrix", verbose);
        ensure_finite(&data, "Covariance matrix", Stage::Covariance, verbose)?;
        Ok(CovarianceMatrix { data })
    }

    /// Number of stations n, the matrix being (n+1, n+1)
    pub fn n_stations(&self) -> usize {
        self.data.nrows() - 1
    }

    /// Underlying matrix
    pub fn as_array(&self) -> &Array2<F> {
        &self.data
    }

    /// Summary of the matrix content
    pub fn health(&self) -> MatrixHealth<F> {
        MatrixHealth::new(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::fit_model;
    use crate::parameters::KrigingParams;
    use crate::stations::{StationPoint, StationSet};
    use crate::variogram::EmpiricalVariogram;
    use approx::assert_abs_diff_eq;
    use linfa::ParamGuard;
    use okriging_raster::GreatCircle;

    #[test]
    fn test_augmented_structure() {
        let metric = GreatCircle::default();
        let points = vec![
            StationPoint::new("A", 50., 8., 3.),
            StationPoint::new("B", 50.5, 8.4, 7.),
            StationPoint::new("C", 51., 9., 1.),
            StationPoint::new("D", 50.2, 9.5, 12.),
            StationPoint::new("E", 51.4, 8.2, 5.),
        ];
        let set = StationSet::new(&points, &metric).unwrap();
        let dm = DistanceMatrix::new(&set, &metric).unwrap();
        let params = KrigingParams::new()
            .distance_interval(20.)
            .max_distance(300.)
            .check()
            .unwrap();
        let mut vario = EmpiricalVariogram::new(&dm, set.values(), 20., 300.).unwrap();
        let model = fit_model(&mut vario, &params).unwrap();
        let cov = CovarianceMatrix::new(&dm, &model, false).unwrap();

        let n = cov.n_stations();
        assert_eq!(n, 5);
        let m = cov.as_array();
        assert_eq!(m.dim(), (6, 6));
        for i in 0..n {
            assert_abs_diff_eq!(m[[i, i]], model.nugget);
            for j in 0..n {
                assert_eq!(m[[i, j]], m[[j, i]]);
            }
            assert_eq!(m[[i, n]], 1.);
            assert_eq!(m[[n, i]], 1.);
        }
        assert_eq!(m[[n, n]], 0.);
        assert!(cov.health().is_healthy());
    }
}
