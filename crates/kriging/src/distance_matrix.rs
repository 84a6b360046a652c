use crate::errors::{KrigingError, Result, Stage};
use crate::stations::StationSet;
use crate::utils::try_zeros;
use linfa::Float;
use ndarray::Array2;
use ndarray_stats::QuantileExt;
use okriging_raster::GreatCircle;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Symmetric (n, n) matrix of great-circle distances (km) between stations.
///
/// Stations on the same site (see [`GreatCircle::same_site`]) are at distance zero.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct DistanceMatrix<F: Float> {
    data: Array2<F>,
}

impl<F: Float> DistanceMatrix<F> {
    /// Compute pairwise distances between stations
    pub fn new(stations: &StationSet<F>, metric: &GreatCircle<F>) -> Result<Self> {
        let n = stations.len();
        let coords = stations.coords();
        let mut data = try_zeros(Stage::Distances, n, n)?;
        for i in 0..n {
            for j in (i + 1)..n {
                let d = metric.site_distance(
                    coords[[i, 0]],
                    coords[[i, 1]],
                    coords[[j, 0]],
                    coords[[j, 1]],
                );
                if !d.is_finite() {
                    return Err(KrigingError::NumericError {
                        stage: Stage::Distances,
                        message: format!(
                            "distance between {} and {} is {d}",
                            stations.names()[i],
                            stations.names()[j]
                        ),
                    });
                }
                data[[i, j]] = d;
                data[[j, i]] = d;
            }
        }
        Ok(DistanceMatrix { data })
    }

    /// Number of stations
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Whether the matrix is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Distance between stations i and j
    pub fn get(&self, i: usize, j: usize) -> Option<F> {
        self.data.get((i, j)).copied()
    }

    /// Largest distance
    pub fn max(&self) -> F {
        self.data.max().map(|v| *v).unwrap_or_else(|_| F::zero())
    }

    /// Underlying matrix
    pub fn as_array(&self) -> &Array2<F> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::StationPoint;
    use approx::assert_abs_diff_eq;

    fn stations(points: &[(f64, f64, f64)]) -> StationSet<f64> {
        let points: Vec<_> = points
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon, v))| StationPoint::new(format!("S{i}"), lat, lon, v))
            .collect();
        StationSet::new(&points, &GreatCircle::default()).unwrap()
    }

    #[test]
    fn test_three_stations() {
        let metric = GreatCircle::default();
        let set = stations(&[(0., 0., 10.), (0., 1., 20.), (1., 0., 30.)]);
        let dm = DistanceMatrix::new(&set, &metric).unwrap();
        assert_eq!(dm.len(), 3);
        let one_degree = 6365.265 * std::f64::consts::PI / 180.;
        assert_abs_diff_eq!(dm.get(0, 1).unwrap(), one_degree, epsilon = 1e-6);
        assert_abs_diff_eq!(dm.get(0, 2).unwrap(), one_degree, epsilon = 1e-6);
        assert_abs_diff_eq!(
            dm.get(1, 2).unwrap(),
            metric.distance(0., 1., 1., 0.),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(dm.get(1, 2).unwrap(), 157.11, epsilon = 0.01);
        assert_abs_diff_eq!(dm.max(), dm.get(1, 2).unwrap());
        assert!(dm.get(3, 0).is_none());
    }

    #[test]
    fn test_symmetric_zero_diagonal() {
        let set = stations(&[
            (50., 8., 1.),
            (51.2, 9.1, 2.),
            (52.5, 13.4, 3.),
            (48.1, 11.6, 4.),
        ]);
        let dm = DistanceMatrix::new(&set, &GreatCircle::default()).unwrap();
        let m = dm.as_array();
        assert_abs_diff_eq!(m, &m.t().to_owned());
        for i in 0..dm.len() {
            assert_eq!(m[[i, i]], 0.);
        }
    }

    #[test]
    fn test_same_site_is_zero() {
        let set = stations(&[(50., 8., 1.), (50.0004, 8.0002, 2.), (51., 8., 3.)]);
        let dm = DistanceMatrix::new(&set, &GreatCircle::default()).unwrap();
        assert_eq!(dm.get(0, 1), Some(0.));
        assert!(dm.get(0, 2).unwrap() > 100.);
    }
}
