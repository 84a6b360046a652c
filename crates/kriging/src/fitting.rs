use crate::errors::{KrigingError, Result, Stage};
use crate::parameters::KrigingValidParams;
use crate::regression::PolynomialRegression;
use crate::variogram::EmpiricalVariogram;
use linfa::Float;
use log::{debug, info};
use ndarray::{Array1, ArrayBase, Data, Ix1};
use rayon::prelude::*;
use std::cmp::Ordering;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Exponential variogram model `nugget + sill * (1 - exp(-|d| / (range / 3)))`
/// fitted on an empirical variogram
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct VariogramModel<F: Float> {
    /// semivariance at distance zero
    pub nugget: F,
    /// height of the plateau above the nugget
    pub sill: F,
    /// distance (km) at which the model reaches 95% of the sill
    pub range: F,
    /// root mean squared error of the model on the fitted lags
    pub rmse: F,
    /// number of populated lags used by the sill/range search
    pub cutoff: usize,
    /// polynomial regression used to estimate the nugget
    pub regression: PolynomialRegression<F>,
    /// below this distance (km) the model reduces to the nugget
    pub(crate) zero_distance: F,
}

impl<F: Float> VariogramModel<F> {
    /// Model value at distance `d` (km)
    pub fn value(&self, d: F) -> F {
        exponential(self.nugget, self.sill, self.range, d, self.zero_distance)
    }

    /// Model with the given parameters and a constant regression
    #[cfg(test)]
    pub(crate) fn with_parameters(nugget: F, sill: F, range: F) -> Self {
        let d = ndarray::array![F::one(), F::cast(2.)];
        let v = ndarray::array![nugget, nugget];
        VariogramModel {
            nugget,
            sill,
            range,
            rmse: F::zero(),
            cutoff: 1,
            regression: PolynomialRegression::fit(&d, &v, 0).unwrap(),
            zero_distance: F::cast(okriging_raster::COORDINATE_EPS),
        }
    }
}

/// Exponential model value, `nugget` when `d` is below `zero_distance`
/// and `nugget + sill` when the range vanishes
pub(crate) fn exponential<F: Float>(nugget: F, sill: F, range: F, d: F, zero_distance: F) -> F {
    let d = d.abs();
    if d < zero_distance {
        nugget
    } else if range <= F::zero() {
        nugget + sill
    } else {
        nugget + sill * (F::one() - F::exp(-d / (range / F::cast(3.))))
    }
}

/// Nugget estimate: intercept of the polynomial fitted on populated lags
pub(crate) fn fit_nugget<F: Float>(
    variogram: &EmpiricalVariogram<F>,
    order: usize,
    floor: F,
) -> Result<(F, PolynomialRegression<F>)> {
    let (d, v) = variogram.populated_points();
    let regression = PolynomialRegression::fit(&d, &v, order)?;
    let nugget = regression.intercept();
    if !nugget.is_finite() {
        return Err(KrigingError::NumericError {
            stage: Stage::ModelFit,
            message: format!("non finite nugget {nugget}"),
        });
    }
    debug!(
        "Polynomial regression order {} coefficients {} r2={}",
        regression.order(),
        regression.coefficients(),
        regression.r2()
    );
    Ok((nugget.max(floor), regression))
}

/// Number of leading populated lags describing the ascending part of the variogram.
///
/// Semivariances are histogrammed in as many buckets as values over `[0, max]`, the cutoff
/// is the number of values falling into buckets up to the most populated one. On equal
/// counts the bucket of smallest semivariances wins.
pub(crate) fn cutoff_index<F: Float>(variances: &ArrayBase<impl Data<Elem = F>, Ix1>) -> usize {
    let n = variances.len();
    if n == 0 {
        return 0;
    }
    let ymax = variances.fold(F::zero(), |acc, v| acc.max(*v));
    let width = ymax / F::cast(n);
    let mut counts = vec![0usize; n];
    for v in variances.iter() {
        let bucket = if width > F::zero() {
            (*v / width).floor().to_usize().unwrap_or(0).min(n - 1)
        } else {
            0
        };
        counts[bucket] += 1;
    }
    let mut densest = 0;
    for (k, c) in counts.iter().enumerate() {
        if *c > counts[densest] {
            densest = k;
        }
    }
    counts[..=densest].iter().sum::<usize>().clamp(1, n)
}

#[derive(Clone, Copy, Debug)]
struct Candidate<F> {
    rmse: F,
    sill_idx: usize,
    range_idx: usize,
}

impl<F: Float> Candidate<F> {
    fn compare(&self, other: &Self) -> Ordering {
        self.rmse
            .partial_cmp(&other.rmse)
            .unwrap_or(Ordering::Equal)
            .then(self.sill_idx.cmp(&other.sill_idx))
            .then(self.range_idx.cmp(&other.range_idx))
    }
}

fn rmse<F: Float>(
    nugget: F,
    sill: F,
    range: F,
    d: &Array1<F>,
    v: &Array1<F>,
    zero_distance: F,
) -> F {
    let sq = d.iter().zip(v.iter()).fold(F::zero(), |acc, (d, v)| {
        let e = exponential(nugget, sill, range, *d, zero_distance) - *v;
        acc + e * e
    });
    (sq / F::cast(d.len())).sqrt()
}

/// Brute force search of `(sill, range)` minimizing the RMSE between the model
/// and the empirical semivariances of the first `cutoff` populated lags.
///
/// Sills are `k * sill_step` below `sill_max`, ranges `k * range_step` up to `range_max`.
/// Sill values are searched in parallel, the reduction keeps the smallest RMSE and on ties
/// the smallest sill then the smallest range.
pub(crate) fn grid_search<F: Float>(
    nugget: F,
    d: &Array1<F>,
    v: &Array1<F>,
    range_max: F,
    params: &KrigingValidParams<F>,
) -> Result<(F, F, F)> {
    let zero_distance = params.coordinate_eps();
    let n_sill = (params.sill_max() / params.sill_step())
        .ceil()
        .to_usize()
        .unwrap_or(0)
        .max(1);
    let n_range = (range_max / params.range_step())
        .floor()
        .to_usize()
        .unwrap_or(0);

    let best_by_sill = (0..n_sill)
        .into_par_iter()
        .map(|sill_idx| {
            let sill = F::cast(sill_idx) * params.sill_step();
            let mut best: Option<Candidate<F>> = None;
            for range_idx in 0..=n_range {
                let range = F::cast(range_idx) * params.range_step();
                let err = rmse(nugget, sill, range, d, v, zero_distance);
                if !err.is_finite() {
                    return Err(KrigingError::NumericError {
                        stage: Stage::ModelFit,
                        message: format!("RMSE is {err} for sill={sill} range={range}"),
                    });
                }
                if best.map_or(true, |b| err < b.rmse) {
                    best = Some(Candidate {
                        rmse: err,
                        sill_idx,
                        range_idx,
                    });
                }
            }
            Ok(best)
        })
        .collect::<Result<Vec<_>>>()?;

    let best = best_by_sill
        .into_iter()
        .flatten()
        .min_by(|a, b| a.compare(b))
        .ok_or_else(|| KrigingError::NumericError {
            stage: Stage::ModelFit,
            message: "empty sill/range search space".to_string(),
        })?;
    Ok((
        F::cast(best.sill_idx) * params.sill_step(),
        F::cast(best.range_idx) * params.range_step(),
        best.rmse,
    ))
}

/// Fit the exponential model on the empirical variogram and store the regression
/// predictions in its lags
pub fn fit_model<F: Float>(
    variogram: &mut EmpiricalVariogram<F>,
    params: &KrigingValidParams<F>,
) -> Result<VariogramModel<F>> {
    let (d, v) = variogram.populated_points();
    let n_lags = d.len();
    if n_lags == 0 {
        return Err(KrigingError::DataError(
            "no station pair within the variogram maximum distance".to_string(),
        ));
    }

    let (nugget, regression) =
        fit_nugget(variogram, params.regression_order(), params.nugget_floor())?;
    variogram.set_regression(&regression.predict_all(&d));

    let cutoff = cutoff_index(&v);
    let range_max = d[cutoff.min(n_lags - 1)];
    debug!("Model fit on {cutoff}/{n_lags} lags, range searched up to {range_max}");

    // sill and range are searched on top of the nugget floor, the regression
    // nugget only replaces it once the search is done
    let d_fit = d.slice(ndarray::s![..cutoff]).to_owned();
    let v_fit = v.slice(ndarray::s![..cutoff]).to_owned();
    let (sill, range, rmse) =
        grid_search(params.nugget_floor(), &d_fit, &v_fit, range_max, params)?;
    info!("Variogram model: nugget={nugget} sill={sill} range={range} (rmse={rmse})");

    Ok(VariogramModel {
        nugget,
        sill,
        range,
        rmse,
        cutoff,
        regression,
        zero_distance: params.coordinate_eps(),
    })
}
