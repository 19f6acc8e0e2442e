//! Gaussian-process covariance kernels (spec.md §4.4).
//!
//! Each kernel is `base + WhiteNoise`; the white-noise term only
//! contributes to the training covariance diagonal (the probability that
//! two distinct, standardized feature vectors coincide exactly is
//! vanishing, so the off-diagonal white-noise contribution is dropped —
//! the same simplification scikit-learn's `WhiteKernel` reduces to in
//! practice for this use).

use crate::error::{AccelError, Result};

/// Selects which base covariance function backs the surrogate
/// (spec.md §4.4: `"linear"`, `"matern"`, `"rbf"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    /// `DotProduct`: `k(x, y) = sigma_0^2 + x . y`, `sigma_0 = 1`.
    Linear,
    /// `Matern` with `nu = 1.5`, unit length scale.
    Matern,
    /// `RBF` with unit length scale.
    Rbf,
}

impl KernelKind {
    /// Parse a CLI/config kernel name.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(KernelKind::Linear),
            "matern" => Ok(KernelKind::Matern),
            "rbf" => Ok(KernelKind::Rbf),
            other => Err(AccelError::UnknownVariant {
                kind: "kernel",
                value: other.to_string(),
            }),
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sq_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Evaluate the base (noise-free) kernel between two standardized feature
/// vectors.
pub fn base_kernel(kind: KernelKind, a: &[f64], b: &[f64]) -> f64 {
    match kind {
        KernelKind::Linear => 1.0 + dot(a, b),
        KernelKind::Rbf => (-0.5 * sq_euclidean(a, b)).exp(),
        KernelKind::Matern => {
            let d = sq_euclidean(a, b).sqrt();
            let term = 3f64.sqrt() * d;
            (1.0 + term) * (-term).exp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rbf_kernel_peaks_at_one_for_identical_points() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((base_kernel(KernelKind::Rbf, &v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn matern_kernel_peaks_at_one_for_identical_points() {
        let v = vec![0.5, -1.0];
        assert!((base_kernel(KernelKind::Matern, &v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn linear_kernel_matches_dot_product_plus_one() {
        let a = vec![1.0, 2.0];
        let b = vec![3.0, 4.0];
        assert_eq!(base_kernel(KernelKind::Linear, &a, &b), 1.0 + 11.0);
    }

    #[test]
    fn parse_rejects_unknown_kernel_name() {
        assert!(KernelKind::parse("bogus").is_err());
    }
}
