//! Gaussian-process surrogate regression: standardized fit + LCB-ranked
//! prediction (spec.md §4.4).

use super::kernel::{base_kernel, KernelKind};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

/// Default white-noise level added to the training covariance diagonal,
/// matching scikit-learn's `WhiteKernel` default.
const DEFAULT_NOISE_LEVEL: f64 = 1.0;

fn standardize_column(std: f64) -> f64 {
    if std > 1e-12 {
        std
    } else {
        1.0
    }
}

/// A fitted GP regressor over standardized `(feature_vector, scalar)`
/// pairs. Predictions are returned in the same standardized `y` units the
/// model was trained on (matching the reference, which never inverse-
/// transforms before ranking candidates — rankings are scale-invariant).
pub struct GaussianProcess {
    kernel: KernelKind,
    noise_level: f64,
    x_mean: Vec<f64>,
    x_std: Vec<f64>,
    train_x_std: Vec<Vec<f64>>,
    chol: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
}

impl GaussianProcess {
    /// Fit a GP to `xs`/`ys` (each `xs[i]` a feature vector, `ys[i]` the
    /// observed scalar), standardizing both before fitting.
    ///
    /// # Panics
    /// Panics if `xs` is empty, rows have inconsistent lengths, or the
    /// resulting kernel matrix is not positive definite (can happen with
    /// duplicate feature vectors and a very small noise level).
    pub fn fit(kernel: KernelKind, xs: &[Vec<f64>], ys: &[f64]) -> Self {
        assert!(!xs.is_empty(), "GP requires at least one observation");
        assert_eq!(xs.len(), ys.len());
        let n = xs.len();
        let dim = xs[0].len();

        let mut x_mean = vec![0.0; dim];
        let mut x_std = vec![1.0; dim];
        for j in 0..dim {
            let mean: f64 = xs.iter().map(|row| row[j]).sum::<f64>() / n as f64;
            let var: f64 = xs.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n as f64;
            x_mean[j] = mean;
            x_std[j] = standardize_column(var.sqrt());
        }

        let y_mean: f64 = ys.iter().sum::<f64>() / n as f64;
        let y_var: f64 = ys.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_std = standardize_column(y_var.sqrt());

        let train_x_std: Vec<Vec<f64>> = xs
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| (v - x_mean[j]) / x_std[j])
                    .collect()
            })
            .collect();
        let train_y_std: Vec<f64> = ys.iter().map(|v| (v - y_mean) / y_std).collect();

        let mut k = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                let mut v = base_kernel(kernel, &train_x_std[i], &train_x_std[j]);
                if i == j {
                    v += DEFAULT_NOISE_LEVEL;
                }
                k[(i, j)] = v;
            }
        }

        let chol = k
            .clone()
            .cholesky()
            .expect("GP training kernel matrix must be positive definite");
        let y_vec = DVector::from_vec(train_y_std);
        let alpha = chol.solve(&y_vec);

        GaussianProcess {
            kernel,
            noise_level: DEFAULT_NOISE_LEVEL,
            x_mean,
            x_std,
            train_x_std,
            chol,
            alpha,
        }
    }

    /// Predict the standardized mean and standard deviation at `x`.
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let x_std: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(j, v)| (v - self.x_mean[j]) / self.x_std[j])
            .collect();

        let k_star: Vec<f64> = self
            .train_x_std
            .iter()
            .map(|xt| base_kernel(self.kernel, xt, &x_std))
            .collect();
        let k_star_vec = DVector::from_vec(k_star);

        let mean = k_star_vec.dot(&self.alpha);

        let k_xx = base_kernel(self.kernel, &x_std, &x_std) + self.noise_level;
        let solved = self.chol.solve(&k_star_vec);
        let variance = (k_xx - k_star_vec.dot(&solved)).max(0.0);

        (mean, variance.sqrt())
    }

    /// Lower-confidence-bound acquisition value (`mean - std`, weight
    /// `1.0`) used to rank candidates for minimization (spec.md §4.4).
    pub fn lcb(&self, x: &[f64]) -> f64 {
        let (mean, std) = self.predict(x);
        mean - std
    }
}
