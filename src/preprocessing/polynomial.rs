//! Polynomial feature expansion

use crate::error::{AutopriceError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Expands `n` inputs into all monomials up to `degree`.
///
/// Terms are ordered by degree, then lexicographically by the input indices
/// (combinations with replacement), e.g. for two inputs and degree 2:
/// `a, b, a², ab, b²`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    degree: usize,
    include_bias: bool,
    n_features_in: usize,
    terms: Vec<Vec<usize>>,
    is_fitted: bool,
}

impl PolynomialFeatures {
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            include_bias: false,
            n_features_in: 0,
            terms: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_bias(mut self, include_bias: bool) -> Self {
        self.include_bias = include_bias;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if self.degree == 0 {
            return Err(AutopriceError::ConfigurationError(
                "polynomial degree must be at least 1".to_string(),
            ));
        }

        self.n_features_in = x.ncols();
        self.terms.clear();
        if self.include_bias {
            self.terms.push(Vec::new());
        }
        for degree in 1..=self.degree {
            let mut combo = Vec::with_capacity(degree);
            push_combinations(self.n_features_in, degree, 0, &mut combo, &mut self.terms);
        }

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

        let mut out = Array2::zeros((x.nrows(), self.terms.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (j, term) in self.terms.iter().enumerate() {
                out[[i, j]] = term.iter().map(|&k| row[k]).product();
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn n_output_features(&self) -> usize {
        self.terms.len()
    }
}

fn push_combinations(n: usize, remaining: usize, start: usize, combo: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    if remaining == 0 {
        out.push(combo.clone());
        return;
    }
    for k in start..n {
        combo.push(k);
        push_combinations(n, remaining - 1, k, combo, out);
        combo.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_degree_two_layout() {
        let x = array![[2.0, 3.0]];
        let mut poly = PolynomialFeatures::new(2);
        let out = poly.fit_transform(&x).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![2.0, 3.0, 4.0, 6.0, 9.0]);
    }

    #[test]
    fn test_degree_three_feature_count() {
        // 3 inputs, degree 3, no bias: 3 + 6 + 10
        let x = Array2::<f64>::ones((4, 3));
        let mut poly = PolynomialFeatures::new(3);
        poly.fit(&x).unwrap();
        assert_eq!(poly.n_output_features(), 19);
    }

    #[test]
    fn test_bias_column() {
        let x = array![[5.0]];
        let mut poly = PolynomialFeatures::new(1).with_bias(true);
        let out = poly.fit_transform(&x).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut poly = PolynomialFeatures::new(2);
        poly.fit(&Array2::<f64>::zeros((1, 2))).unwrap();
        assert!(poly.transform(&Array2::<f64>::zeros((1, 3))).is_err());
    }
}
