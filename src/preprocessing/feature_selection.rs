//! Univariate feature selection

use crate::error::{AutopriceError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// F-statistic of a linear fit of `y` on each column.
///
/// `F = r² / (1 - r²) * (n - 2)` where `r` is the Pearson correlation.
/// Constant columns score NaN.
pub fn f_regression(x: &Array2<f64>, y: &Array1<f64>) -> Result<Vec<f64>> {
    if x.nrows() != y.len() {
        return Err(AutopriceError::ShapeError {
            expected: format!("{} targets", x.nrows()),
            actual: format!("{} targets", y.len()),
        });
    }
    if x.nrows() < 3 {
        return Err(AutopriceError::ValidationError(
            "f_regression needs at least 3 samples".to_string(),
        ));
    }

    let dof = (x.nrows() - 2) as f64;
    Ok(x
        .axis_iter(Axis(1))
        .map(|col| {
            let r = pearson(col, y.view());
            let r2 = r * r;
            if r2 >= 1.0 {
                f64::INFINITY
            } else {
                r2 / (1.0 - r2) * dof
            }
        })
        .collect())
}

fn pearson(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    cov / (var_a * var_b).sqrt()
}

/// Keeps the `k` highest-scoring columns by [`f_regression`].
///
/// NaN scores rank lowest; among equal scores the later column wins.
/// Selected columns keep their original order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectKBest {
    k: usize,
    /// Fit-time diagnostics; may hold NaN or infinity, so never persisted
    #[serde(skip)]
    scores: Vec<f64>,
    selected: Vec<usize>,
    n_features_in: usize,
    is_fitted: bool,
}

impl SelectKBest {
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(AutopriceError::ConfigurationError(
                "k_best must select at least one feature".to_string(),
            ));
        }
        Ok(Self {
            k,
            scores: Vec::new(),
            selected: Vec::new(),
            n_features_in: 0,
            is_fitted: false,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if self.k > x.ncols() {
            return Err(AutopriceError::ConfigurationError(format!(
                "k_best = {} but only {} features are available",
                self.k,
                x.ncols()
            )));
        }

        self.scores = f_regression(x, y)?;
        let mut order: Vec<usize> = (0..self.scores.len()).collect();
        let key = |i: usize| {
            let s = self.scores[i];
            if s.is_nan() { f64::NEG_INFINITY } else { s }
        };
        order.sort_by(|&a, &b| key(a).total_cmp(&key(b)).then(a.cmp(&b)));

        let mut selected = order.split_off(order.len() - self.k);
        selected.sort_unstable();
        self.selected = selected;
        self.n_features_in = x.ncols();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(AutopriceError::ModelNotFitted);
        }
        if x.ncols() != self.n_features_in {
            return Err(AutopriceError::ShapeError {
                expected: format!("{} columns", self.n_features_in),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(x.select(Axis(1), &self.selected))
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }

    pub fn selected_indices(&self) -> &[usize] {
        &self.selected
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }
}
