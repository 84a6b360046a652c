use crate::covariance::CovarianceMatrix;
use crate::errors::{KrigingError, Result, Stage};
use crate::health::{log_preview, MatrixHealth};
use crate::utils::try_zeros;
use linfa::Float;
use log::{debug, Level};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1};

/// Inverse of the augmented kriging matrix computed by Gauss-Jordan elimination.
///
/// No pivoting is done: the augmented matrix starts with a positive nugget on its diagonal.
/// A zero or non finite pivot is recorded and the elimination goes on, the resulting
/// non finite entries are reported by the health check as a singular matrix.
#[derive(Clone, Debug)]
pub struct InverseCovarianceMatrix<F: Float> {
    data: Array2<F>,
}

impl<F: Float> InverseCovarianceMatrix<F> {
    /// Invert the covariance matrix, which is left untouched
    pub fn new(cov: &CovarianceMatrix<F>, verbose: bool) -> Result<Self> {
        let (data, bad_pivot) = gauss_jordan(cov.as_array())?;
        if let Some(k) = bad_pivot {
            debug!("Zero or non finite pivot at row {k}");
        }
        log_preview(&data, "Inverse covariance matrix", verbose);

        let health = MatrixHealth::new(&data);
        log::log!(
            if verbose { Level::Info } else { Level::Debug },
            "Inverse covariance matrix: nan={} inf={} min={} max={} mean={}",
            health.nan_count,
            health.inf_count,
            health.min,
            health.max,
            health.mean
        );
        match (health.is_healthy(), bad_pivot) {
            (true, _) => Ok(InverseCovarianceMatrix { data }),
            (false, Some(pivot)) => Err(KrigingError::SingularMatrixError {
                stage: Stage::Inversion,
                pivot,
            }),
            (false, None) => Err(KrigingError::NumericError {
                stage: Stage::Inversion,
                message: format!(
                    "inverse holds {} NaN and {} infinite values",
                    health.nan_count, health.inf_count
                ),
            }),
        }
    }

    /// Wrap a given matrix as the inverse
    #[cfg(test)]
    pub(crate) fn from_array(data: Array2<F>) -> Self {
        InverseCovarianceMatrix { data }
    }

    /// Underlying matrix
    pub fn as_array(&self) -> &Array2<F> {
        &self.data
    }

    /// Kriging weights `C^-1 . c` of a covariance vector (length n+1)
    pub fn weights(&self, cov_vector: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        self.data.dot(cov_vector)
    }
}

/// Gauss-Jordan inversion without pivoting on a working copy.
/// Returns the inverse and the first zero or non finite pivot row if any.
fn gauss_jordan<F: Float>(matrix: &Array2<F>) -> Result<(Array2<F>, Option<usize>)> {
    let n = matrix.nrows();
    let mut a = try_zeros(Stage::Inversion, n, n)?;
    a.assign(matrix);
    let mut inv = try_zeros(Stage::Inversion, n, n)?;
    inv.diag_mut().fill(F::one());

    let mut bad_pivot = None;
    for k in 0..n {
        let pivot = a[[k, k]];
        if bad_pivot.is_none() && (pivot == F::zero() || !pivot.is_finite()) {
            bad_pivot = Some(k);
        }
        for j in 0..n {
            a[[k, j]] /= pivot;
            inv[[k, j]] /= pivot;
        }
        for i in 0..n {
            if i == k {
                continue;
            }
            let factor = a[[i, k]];
            if factor == F::zero() {
                continue;
            }
            for j in 0..n {
                let akj = a[[k, j]];
                let ikj = inv[[k, j]];
                a[[i, j]] -= factor * akj;
                inv[[i, j]] -= factor * ikj;
            }
        }
    }
    Ok((inv, bad_pivot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_gauss_jordan() {
        let m = array![[4., 7.], [2., 6.]];
        let (inv, bad) = gauss_jordan(&m).unwrap();
        assert_eq!(bad, None);
        assert_abs_diff_eq!(inv, array![[0.6, -0.7], [-0.2, 0.4]], epsilon = 1e-12);
        assert_abs_diff_eq!(m.dot(&inv), Array2::eye(2), epsilon = 1e-12);
    }

    #[test]
    fn test_augmented_inverse() {
        // nugget 1, sill-like covariances and the Lagrange border
        let m = array![
            [1., 3., 4., 1.],
            [3., 1., 5., 1.],
            [4., 5., 1., 1.],
            [1., 1., 1., 0.]
        ];
        let (inv, bad) = gauss_jordan(&m).unwrap();
        assert_eq!(bad, None);
        assert_abs_diff_eq!(m.dot(&inv), Array2::eye(4), epsilon = 1e-10);
        assert_abs_diff_eq!(inv.dot(&m), Array2::eye(4), epsilon = 1e-10);
    }

    #[test]
    fn test_zero_pivot_without_pivoting() {
        // invertible but the first pivot is zero
        let m: Array2<f64> = array![[0., 1.], [1., 0.]];
        let (inv, bad) = gauss_jordan(&m).unwrap();
        assert_eq!(bad, Some(0));
        assert!(inv.iter().any(|v| !v.is_finite()));
    }

    #[test]
    fn test_singular_matrix_error() {
        let cov = CovarianceMatrix {
            data: array![[0., 1.], [1., 0.]],
        };
        let res = InverseCovarianceMatrix::new(&cov, false);
        assert!(matches!(
            res,
            Err(KrigingError::SingularMatrixError {
                stage: Stage::Inversion,
                pivot: 0
            })
        ));
    }

    #[test]
    fn test_weights() {
        let cov = CovarianceMatrix {
            data: array![[4., 7.], [2., 6.]],
        };
        let inv = InverseCovarianceMatrix::new(&cov, false).unwrap();
        assert_abs_diff_eq!(inv.weights(&array![4., 2.]), array![1., 0.], epsilon = 1e-12);
    }
}
