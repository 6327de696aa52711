//! Principal component analysis
//!
//! Projects centred data onto the eigenvectors of its covariance matrix,
//! ordered by explained variance. The eigendecomposition uses cyclic Jacobi
//! rotations, which is exact enough for the small post-selection feature
//! counts this is applied to.

use crate::error::{AutopriceError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

const MAX_SWEEPS: usize = 100;

/// Linear projection onto principal components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    /// Number of components to keep; `None` keeps `min(n_samples, n_features)`
    n_components: Option<usize>,
    mean: Array1<f64>,
    /// One component per row
    components: Array2<f64>,
    explained_variance: Vec<f64>,
    is_fitted: bool,
}

impl Default for Pca {
    fn default() -> Self {
        Self::new()
    }
}

impl Pca {
    pub fn new() -> Self {
        Self {
            n_components: None,
            mean: Array1::zeros(0),
            components: Array2::zeros((0, 0)),
            explained_variance: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_n_components(mut self, n: usize) -> Self {
        self.n_components = Some(n);
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let (n, d) = x.dim();
        if n < 2 || d == 0 {
            return Err(AutopriceError::ValidationError(format!(
                "PCA needs at least 2 samples and 1 feature, got {n}x{d}"
            )));
        }

        let keep = self.n_components.unwrap_or(n.min(d));
        if keep == 0 || keep > n.min(d) {
            return Err(AutopriceError::ConfigurationError(format!(
                "n_components = {keep} must be between 1 and {}",
                n.min(d)
            )));
        }

        let mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            AutopriceError::ComputationError("empty input to PCA".to_string())
        })?;
        let centered = x - &mean;
        let cov = centered.t().dot(&centered) / (n as f64 - 1.0);

        let (eigenvalues, eigenvectors) = symmetric_eigen(cov);
        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

        let mut components = Array2::zeros((keep, d));
        for (row, &idx) in order.iter().take(keep).enumerate() {
            let mut v = eigenvectors.column(idx).to_owned();
            // Deterministic sign: largest-magnitude loading is positive
            let pivot = v
                .iter()
                .copied()
                .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
            if pivot < 0.0 {
                v.mapv_inplace(|x| -x);
            }
            components.row_mut(row).assign(&v);
        }

        self.explained_variance = order.iter().take(keep).map(|&i| eigenvalues[i].max(0.0)).collect();
        self.mean = mean;
        self.components = components;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(AutopriceError::ModelNotFitted);
        }
        if x.ncols() != self.mean.len() {
            return Err(AutopriceError::ShapeError {
                expected: format!("{} columns", self.mean.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok((x - &self.mean).dot(&self.components.t()))
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        let total: f64 = self.explained_variance.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.explained_variance.len()];
        }
        self.explained_variance.iter().map(|v| v / total).collect()
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }
}

/// Eigenvalues and eigenvectors (as columns) of a symmetric matrix.
fn symmetric_eigen(mut a: Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);
    let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off <= 1e-24 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    ((0..n).map(|i| a[[i, i]]).collect(), v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_eigen_of_diagonal_like_matrix() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let (mut values, _) = symmetric_eigen(m);
        values.sort_by(|a, b| a.total_cmp(b));
        assert!((values[0] - 1.0).abs() < 1e-10);
        assert!((values[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_first_component_follows_main_axis() {
        let x = array![[1.0, 1.1], [2.0, 1.9], [3.0, 3.2], [4.0, 3.9], [5.0, 5.0]];
        let mut pca = Pca::new();
        pca.fit(&x).unwrap();

        let first = pca.components().row(0);
        assert!((first[0] - first[1]).abs() < 0.1);
        assert!(pca.explained_variance_ratio()[0] > 0.95);
    }

    #[test]
    fn test_full_rotation_preserves_distances() {
        let x = array![[0.0, 1.0, 2.0], [1.0, 0.0, 3.0], [2.0, 2.0, 0.0], [3.0, 1.0, 1.0]];
        let mut pca = Pca::new();
        let z = pca.fit_transform(&x).unwrap();
        assert_eq!(z.dim(), (4, 3));

        let dist = |m: &Array2<f64>, i: usize, j: usize| {
            (&m.row(i) - &m.row(j)).mapv(|v| v * v).sum().sqrt()
        };
        assert!((dist(&x, 0, 2) - dist(&z, 0, 2)).abs() < 1e-9);
        assert!((dist(&x, 1, 3) - dist(&z, 1, 3)).abs() < 1e-9);
    }

    #[test]
    fn test_transform_before_fit() {
        let pca = Pca::new();
        assert!(matches!(pca.transform(&array![[1.0]]), Err(AutopriceError::ModelNotFitted)));
    }
}
