use crate::distance_matrix::DistanceMatrix;
use crate::errors::{KrigingError, Result, Stage};
use linfa::Float;
use log::Level;
use ndarray::{Array1, ArrayBase, Data, Ix1};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A distance class of the empirical variogram covering `(lower, upper]`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Lag<F: Float> {
    /// lower limit (km, excluded)
    pub lower: F,
    /// upper limit (km, included)
    pub upper: F,
    /// number of station pairs in the class
    pub count: usize,
    /// mean distance of the pairs
    pub distance_avg: F,
    /// semivariance of the pairs
    pub variance_avg: F,
    /// semivariance predicted by the polynomial regression
    pub variance_avg_reg: F,
}

impl<F: Float> Lag<F> {
    fn new(lower: F, upper: F) -> Self {
        Lag {
            lower,
            upper,
            count: 0,
            distance_avg: F::zero(),
            variance_avg: F::zero(),
            variance_avg_reg: F::zero(),
        }
    }

    /// Whether at least one pair falls into the class
    pub fn is_populated(&self) -> bool {
        self.count > 0
    }
}

/// Classical (Matheron) empirical semivariogram.
///
/// Distance classes partition `[0, n * interval)` where `n = floor(max_distance / interval)`.
/// For every ordered pair of distinct stations `(i, j)` whose distance `d` lies in a class,
/// the squared value difference and the distance are accumulated. The class semivariance is
/// `sum((v_i - v_j)^2) / (2 * count)`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct EmpiricalVariogram<F: Float> {
    interval: F,
    lags: Vec<Lag<F>>,
}

impl<F: Float> EmpiricalVariogram<F> {
    /// Compute the empirical variogram of `values` measured at stations whose
    /// pairwise distances are given
    pub fn new(
        distances: &DistanceMatrix<F>,
        values: &ArrayBase<impl Data<Elem = F>, Ix1>,
        interval: F,
        max_distance: F,
    ) -> Result<Self> {
        let n_lags = (max_distance / interval)
            .floor()
            .to_usize()
            .filter(|n| *n > 0)
            .ok_or_else(|| KrigingError::ConfigurationError(format!(
                "no distance class fits in {max_distance} with interval {interval}"
            )))?;
        let mut lags: Vec<Lag<F>> = (0..n_lags)
            .map(|k| Lag::new(F::cast(k) * interval, F::cast(k + 1) * interval))
            .collect();
        let mut sq_sums = vec![F::zero(); n_lags];
        let mut d_sums = vec![F::zero(); n_lags];

        let d = distances.as_array();
        let n = distances.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                if let Some(k) = lag_index(&lags, d[[i, j]], interval) {
                    let diff = values[i] - values[j];
                    sq_sums[k] += diff * diff;
                    d_sums[k] += d[[i, j]];
                    lags[k].count += 1;
                }
            }
        }

        for (k, lag) in lags.iter_mut().enumerate() {
            if lag.is_populated() {
                let count = F::cast(lag.count);
                lag.variance_avg = sq_sums[k] / (F::cast(2.) * count);
                lag.distance_avg = d_sums[k] / count;
                if !(lag.variance_avg.is_finite() && lag.distance_avg.is_finite()) {
                    return Err(KrigingError::NumericError {
                        stage: Stage::Variogram,
                        message: format!("non finite semivariance in lag {k}"),
                    });
                }
            }
        }
        Ok(EmpiricalVariogram { interval, lags })
    }

    /// Width of the distance classes
    pub fn interval(&self) -> F {
        self.interval
    }

    /// All distance classes, empty ones included
    pub fn lags(&self) -> &[Lag<F>] {
        &self.lags
    }

    /// Distance classes holding at least one pair
    pub fn populated(&self) -> impl Iterator<Item = &Lag<F>> + '_ {
        self.lags.iter().filter(|l| l.is_populated())
    }

    /// Number of populated distance classes
    pub fn n_populated(&self) -> usize {
        self.populated().count()
    }

    /// `(distance_avg, variance_avg)` of populated classes
    pub fn populated_points(&self) -> (Array1<F>, Array1<F>) {
        (
            self.populated().map(|l| l.distance_avg).collect(),
            self.populated().map(|l| l.variance_avg).collect(),
        )
    }

    /// Store regression predictions of the populated classes, in order
    pub(crate) fn set_regression(&mut self, predicted: &Array1<F>) {
        for (lag, v) in self
            .lags
            .iter_mut()
            .filter(|l| l.is_populated())
            .zip(predicted.iter())
        {
            lag.variance_avg_reg = *v;
        }
    }

    /// Log the variogram table, at info level when verbose
    pub fn log_table(&self, verbose: bool) {
        let level = if verbose { Level::Info } else { Level::Debug };
        if !log::log_enabled!(level) {
            return;
        }
        log::log!(
            level,
            "{:>3} {:>9} {:>9} {:>7} {:>10} {:>12} {:>12}",
            "#",
            "lower",
            "upper",
            "pairs",
            "distance",
            "semivariance",
            "regression"
        );
        for (k, lag) in self.lags.iter().enumerate() {
            log::log!(
                level,
                "{k:>3} {:>9.2} {:>9.2} {:>7} {:>10.3} {:>12.3} {:>12.3}",
                lag.lower,
                lag.upper,
                lag.count,
                lag.distance_avg,
                lag.variance_avg,
                lag.variance_avg_reg
            );
        }
    }
}

/// Index of the class `(lower, upper]` holding the distance if any
fn lag_index<F: Float>(lags: &[Lag<F>], d: F, interval: F) -> Option<usize> {
    if !(d > F::zero()) {
        return None;
    }
    let last = lags.len().checked_sub(1)?;
    let mut k = ((d / interval).ceil() - F::one())
        .max(F::zero())
        .to_usize()?
        .min(last);
    // rounding of d / interval on class limits
    if d <= lags[k].lower && k > 0 {
        k -= 1;
    } else if d > lags[k].upper && k < last {
        k += 1;
    }
    let lag = &lags[k];
    (d > lag.lower && d <= lag.upper).then_some(k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::{StationPoint, StationSet};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use okriging_raster::GreatCircle;
    use rand_xoshiro::Xoshiro256Plus;

    fn scenario() -> (StationSet<f64>, DistanceMatrix<f64>) {
        let metric = GreatCircle::default();
        let points = vec![
            StationPoint::new("A", 0., 0., 10.),
            StationPoint::new("B", 0., 1., 20.),
            StationPoint::new("C", 1., 0., 30.),
        ];
        let set = StationSet::new(&points, &metric).unwrap();
        let dm = DistanceMatrix::new(&set, &metric).unwrap();
        (set, dm)
    }

    #[test]
    fn test_scenario_variogram() {
        let (set, dm) = scenario();
        let vario = EmpiricalVariogram::new(&dm, set.values(), 1., 900.).unwrap();
        assert_eq!(vario.lags().len(), 900);
        assert_eq!(vario.n_populated(), 2);
        let (d, v) = vario.populated_points();
        // A-B and A-C fall into (111, 112], B-C into (157, 158]
        assert_abs_diff_eq!(d, array![111.0948, 157.1078], epsilon = 1e-3);
        assert_abs_diff_eq!(v, array![(100. + 400.) / 4., 100. / 2.], epsilon = 1e-9);
        let first = vario.populated().next().unwrap();
        assert_eq!(first.count, 4);
        assert_abs_diff_eq!(first.lower, 111.);
        assert_abs_diff_eq!(first.upper, 112.);
    }

    #[test]
    fn test_partition() {
        let (set, dm) = scenario();
        let vario = EmpiricalVariogram::new(&dm, set.values(), 50., 920.).unwrap();
        assert_eq!(vario.lags().len(), 18);
        for (k, lag) in vario.lags().iter().enumerate() {
            assert!(lag.lower < lag.upper);
            assert_abs_diff_eq!(lag.lower, 50. * k as f64);
        }
        // 111 km falls into (100, 150] and 157 km into (150, 200]
        assert_eq!(vario.lags()[2].count, 4);
        assert_eq!(vario.lags()[3].count, 2);
        assert_eq!(vario.lags()[0].count, 0);
        assert_eq!(vario.lags()[0].variance_avg, 0.);
    }

    #[test]
    fn test_lag_index_on_limits() {
        let lags: Vec<Lag<f64>> = (0..3)
            .map(|k| Lag::new(k as f64 * 0.1, (k + 1) as f64 * 0.1))
            .collect();
        assert_eq!(lag_index(&lags, 0., 0.1), None);
        assert_eq!(lag_index(&lags, 0.1, 0.1), Some(0));
        assert_eq!(lag_index(&lags, 0.2, 0.1), Some(1));
        assert_eq!(lag_index(&lags, 0.3, 0.1), Some(2));
        assert_eq!(lag_index(&lags, 0.30001, 0.1), None);
        assert_eq!(lag_index(&lags, f64::NAN, 0.1), None);
    }

    #[test]
    fn test_semivariances_are_non_negative() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let lat = Array1::random_using(40, Uniform::new(47., 55.), &mut rng);
        let lon = Array1::random_using(40, Uniform::new(5., 16.), &mut rng);
        let values = Array1::random_using(40, Uniform::new(0., 30.), &mut rng);
        let points: Vec<_> = (0..40)
            .map(|i| StationPoint::new(format!("S{i}"), lat[i], lon[i], values[i]))
            .collect();
        let metric = GreatCircle::default();
        let set = StationSet::new(&points, &metric).unwrap();
        let dm = DistanceMatrix::new(&set, &metric).unwrap();
        let vario = EmpiricalVariogram::new(&dm, set.values(), 50., 900.).unwrap();
        let pairs: usize = vario.lags().iter().map(|l| l.count).sum();
        assert!(pairs > 0 && pairs <= 40 * 39);
        assert_eq!(pairs % 2, 0);
        assert!(vario.lags().iter().all(|l| l.variance_avg >= 0.));
        assert!(vario
            .populated()
            .all(|l| l.distance_avg > l.lower && l.distance_avg <= l.upper));
    }

    #[test]
    fn test_invalid_classes() {
        let (set, dm) = scenario();
        assert!(EmpiricalVariogram::new(&dm, set.values(), 50., 20.).is_err());
    }
}
