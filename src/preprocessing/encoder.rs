//! Smoothed target encoding for categorical columns

use crate::data::text_values;
use crate::error::{AutopriceError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Replaces each category with a blend of its mean target and the global mean.
///
/// For a category seen `n` times with mean target `m`:
/// `s = 1 / (1 + exp(-(n - min_samples_leaf) / smoothing))` and the encoding
/// is `prior * (1 - s) + m * s`. Categories seen once, unseen categories and
/// missing values all encode to the prior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEncoder {
    min_samples_leaf: usize,
    smoothing: f64,
    prior: f64,
    mappings: Vec<(String, HashMap<String, f64>)>,
    is_fitted: bool,
}

impl Default for TargetEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetEncoder {
    pub fn new() -> Self {
        Self {
            min_samples_leaf: 20,
            smoothing: 10.0,
            prior: 0.0,
            mappings: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Encoding learned for `category` in `column`, if it was seen at fit time.
    pub fn encoding(&self, column: &str, category: &str) -> Option<f64> {
        self.mappings
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, map)| map.get(category).copied())
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[String], y: &Array1<f64>) -> Result<&mut Self> {
        if df.height() != y.len() {
            return Err(AutopriceError::ShapeError {
                expected: format!("{} targets", df.height()),
                actual: format!("{} targets", y.len()),
            });
        }
        if y.is_empty() {
            return Err(AutopriceError::ValidationError(
                "cannot fit target encoder on empty data".to_string(),
            ));
        }
        if self.smoothing <= 0.0 {
            return Err(AutopriceError::ConfigurationError(format!(
                "smoothing must be positive, got {}",
                self.smoothing
            )));
        }

        self.prior = y.mean().unwrap_or(0.0);
        self.mappings.clear();

        for name in columns {
            let values = text_values(df, name)?;
            let mut stats: HashMap<&str, (usize, f64)> = HashMap::new();
            for (value, &target) in values.into_iter().zip(y.iter()) {
                if let Some(value) = value {
                    let entry = stats.entry(value).or_insert((0, 0.0));
                    entry.0 += 1;
                    entry.1 += target;
                }
            }

            let mapping = stats
                .into_iter()
                .map(|(category, (count, sum))| (category.to_string(), self.blend(count, sum / count as f64)))
                .collect();
            self.mappings.push((name.clone(), mapping));
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn blend(&self, count: usize, mean: f64) -> f64 {
        if count == 1 {
            return self.prior;
        }
        let weight = 1.0 / (1.0 + (-(count as f64 - self.min_samples_leaf as f64) / self.smoothing).exp());
        self.prior * (1.0 - weight) + mean * weight
    }

    /// Encoded matrix with one column per fitted categorical column, in fit order.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(AutopriceError::ModelNotFitted);
        }

        let mut out = Array2::zeros((df.height(), self.mappings.len()));
        for (j, (name, mapping)) in self.mappings.iter().enumerate() {
            let values = text_values(df, name)?;
            for (i, value) in values.into_iter().enumerate() {
                out[[i, j]] = value
                    .and_then(|v| mapping.get(v).copied())
                    .unwrap_or(self.prior);
            }
        }
        Ok(out)
    }

    pub fn n_columns(&self) -> usize {
        self.mappings.len()
    }
}
