//! Matrix health checks run after every matrix producing stage.
//!
//! The pipeline stops as soon as a matrix holds a NaN or infinite entry.
use crate::errors::{KrigingError, Result, Stage};
use linfa::Float;
use log::Level;
use ndarray::{ArrayBase, Data, Ix2};

/// Size of the upper-left block logged by [`log_preview`]
pub const PREVIEW_SIZE: usize = 20;

/// Summary of a matrix content
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixHealth<F: Float> {
    /// (rows, cols)
    pub shape: (usize, usize),
    /// number of NaN entries
    pub nan_count: usize,
    /// number of infinite entries
    pub inf_count: usize,
    /// smallest finite entry
    pub min: F,
    /// largest finite entry
    pub max: F,
    /// mean of finite entries
    pub mean: F,
}

impl<F: Float> MatrixHealth<F> {
    /// Scan the matrix entries
    pub fn new(matrix: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        let mut nan_count = 0;
        let mut inf_count = 0;
        let mut min = F::infinity();
        let mut max = F::neg_infinity();
        let mut sum = F::zero();
        let mut n = 0usize;
        for &v in matrix.iter() {
            if v.is_nan() {
                nan_count += 1;
            } else if v.is_infinite() {
                inf_count += 1;
            } else {
                min = min.min(v);
                max = max.max(v);
                sum += v;
                n += 1;
            }
        }
        let mean = if n > 0 { sum / F::cast(n) } else { F::nan() };
        MatrixHealth {
            shape: matrix.dim(),
            nan_count,
            inf_count,
            min,
            max,
            mean,
        }
    }

    /// No NaN nor infinite entry
    pub fn is_healthy(&self) -> bool {
        self.nan_count == 0 && self.inf_count == 0
    }

    fn log(&self, name: &str, level: Level) {
        log::log!(
            level,
            "{name} {}x{}: nan={} inf={} min={} max={} mean={}",
            self.shape.0,
            self.shape.1,
            self.nan_count,
            self.inf_count,
            self.min,
            self.max,
            self.mean
        );
    }
}

fn level(verbose: bool) -> Level {
    if verbose {
        Level::Info
    } else {
        Level::Debug
    }
}

/// Check that the matrix only holds finite values, log its summary
/// and fail with a numeric error of the given stage otherwise
pub fn ensure_finite<F: Float>(
    matrix: &ArrayBase<impl Data<Elem = F>, Ix2>,
    name: &str,
    stage: Stage,
    verbose: bool,
) -> Result<MatrixHealth<F>> {
    let health = MatrixHealth::new(matrix);
    health.log(name, level(verbose));
    if health.is_healthy() {
        Ok(health)
    } else {
        Err(KrigingError::NumericError {
            stage,
            message: format!(
                "{name} holds {} NaN and {} infinite values",
                health.nan_count, health.inf_count
            ),
        })
    }
}

/// Log the upper-left [`PREVIEW_SIZE`] block of the matrix
pub fn log_preview<F: Float>(matrix: &ArrayBase<impl Data<Elem = F>, Ix2>, name: &str, verbose: bool) {
    let level = level(verbose);
    if !log::log_enabled!(level) {
        return;
    }
    let (nrows, ncols) = matrix.dim();
    log::log!(level, "{name} ({nrows}x{ncols}) preview:");
    for row in matrix.rows().into_iter().take(PREVIEW_SIZE) {
        let line = row
            .iter()
            .take(PREVIEW_SIZE)
            .map(|v| format!("{:>10.3}", v))
            .collect::<Vec<_>>()
            .join(" ");
        log::log!(level, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_health_summary() {
        let m = array![[1., 2.], [3., 6.]];
        let health = MatrixHealth::new(&m);
        assert!(health.is_healthy());
        assert_eq!(health.shape, (2, 2));
        assert_abs_diff_eq!(health.min, 1.);
        assert_abs_diff_eq!(health.max, 6.);
        assert_abs_diff_eq!(health.mean, 3.);
    }

    #[test]
    fn test_unhealthy_matrix() {
        let m = array![[1., f64::NAN], [f64::INFINITY, f64::NEG_INFINITY]];
        let health = MatrixHealth::new(&m);
        assert_eq!(health.nan_count, 1);
        assert_eq!(health.inf_count, 2);
        assert_abs_diff_eq!(health.mean, 1.);
        let res = ensure_finite(&m, "test", Stage::Covariance, false);
        assert!(matches!(
            res,
            Err(KrigingError::NumericError {
                stage: Stage::Covariance,
                ..
            })
        ));
    }
}
