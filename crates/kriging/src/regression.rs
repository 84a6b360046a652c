use crate::errors::{KrigingError, Result, Stage};
use linfa::Float;
use linfa_linalg::{qr::*, svd::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Polynomial least squares fit `y = b0 + b1 x + ... + bk x^k`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct PolynomialRegression<F: Float> {
    coefficients: Array1<F>,
    r2: F,
}

impl<F: Float> PolynomialRegression<F> {
    /// Fit a polynomial of at most `order` on the given points.
    ///
    /// The effective order is `min(order, n - 2)` so that at least one residual degree of
    /// freedom remains (order 0 fits the mean). The Vandermonde matrix is built on
    /// `x / max(|x|)` and solved by QR decomposition.
    pub fn fit(
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        order: usize,
    ) -> Result<Self> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(KrigingError::DataError(format!(
                "polynomial regression needs as many x as y values, at least one, got {} and {}",
                n,
                y.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(numeric("regression input holds non finite values"));
        }
        let order = order.min(n.saturating_sub(2));

        let scale = x.fold(F::zero(), |acc, v| acc.max(v.abs()));
        let scale = if scale > F::zero() { scale } else { F::one() };
        let vander = Array2::from_shape_fn((n, order + 1), |(i, k)| (x[i] / scale).powi(k as i32));

        let (q, r) = vander.qr()?.into_decomp();
        // Check whether we have an ill-conditionned problem
        let (_, sv, _) = r.svd(false, false)?;
        if sv.iter().any(|v| !v.is_finite()) {
            return Err(numeric("non finite singular values in polynomial regression"));
        }
        let sv_max = sv.fold(F::zero(), |acc, v| acc.max(*v));
        let sv_min = sv.fold(F::infinity(), |acc, v| acc.min(*v));
        if !(sv_min / sv_max >= F::cast(1e-10)) {
            return Err(numeric("polynomial regression is too ill conditioned"));
        }

        let yt = y.to_owned().insert_axis(ndarray::Axis(1));
        let beta = r.solve_triangular_into(q.t().dot(&yt), UPLO::Upper)?;
        let coefficients: Array1<F> = beta
            .column(0)
            .iter()
            .enumerate()
            .map(|(k, b)| *b / scale.powi(k as i32))
            .collect();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(numeric("non finite regression coefficients"));
        }

        let mut reg = PolynomialRegression {
            coefficients,
            r2: F::one(),
        };
        let predicted = reg.predict_all(x);
        if predicted.iter().any(|v| !v.is_finite()) {
            return Err(numeric("non finite regression predictions"));
        }
        let mean = y.sum() / F::cast(n);
        let ss_res = y
            .iter()
            .zip(predicted.iter())
            .fold(F::zero(), |acc, (a, b)| acc + (*a - *b) * (*a - *b));
        let ss_tot = y.fold(F::zero(), |acc, v| acc + (*v - mean) * (*v - mean));
        if ss_tot > F::epsilon() {
            reg.r2 = F::one() - ss_res / ss_tot;
        }
        Ok(reg)
    }

    /// Coefficients `[b0, b1, ..., bk]`
    pub fn coefficients(&self) -> &Array1<F> {
        &self.coefficients
    }

    /// Effective polynomial order
    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Intercept `b0`
    pub fn intercept(&self) -> F {
        self.coefficients[0]
    }

    /// Coefficient of determination of the fit
    pub fn r2(&self) -> F {
        self.r2
    }

    /// Polynomial value at x (Horner scheme)
    pub fn predict(&self, x: F) -> F {
        self.coefficients
            .iter()
            .rev()
            .fold(F::zero(), |acc, b| acc * x + *b)
    }

    /// Polynomial values at every x
    pub fn predict_all(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        x.mapv(|v| self.predict(v))
    }
}

fn numeric(message: &str) -> KrigingError {
    KrigingError::NumericError {
        stage: Stage::ModelFit,
        message: message.to_string(),
    }
}
