//! Voting ensemble over pricing pipelines

use crate::error::{AutopriceError, Result};
use crate::training::{PricePipeline, TabularModel};
use ndarray::Array1;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Averages the predictions of independently fitted pipelines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingRegressor {
    estimators: Vec<(String, PricePipeline)>,
    /// Relative weight per estimator; equal when unset
    weights: Option<Vec<f64>>,
}

impl VotingRegressor {
    pub fn new(estimators: Vec<(String, PricePipeline)>) -> Self {
        Self {
            estimators,
            weights: None,
        }
    }

    /// Set estimator weights. Must match the estimator count and sum to a positive value.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != self.estimators.len() {
            return Err(AutopriceError::ConfigurationError(format!(
                "{} weights given for {} estimators",
                weights.len(),
                self.estimators.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(AutopriceError::ConfigurationError(
                "voting weights must be non-negative with a positive sum".to_string(),
            ));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    pub fn names(&self) -> Vec<&str> {
        self.estimators.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn estimators(&self) -> &[(String, PricePipeline)] {
        &self.estimators
    }

    pub fn is_fitted(&self) -> bool {
        !self.estimators.is_empty() && self.estimators.iter().all(|(_, p)| p.is_fitted())
    }

    /// Fit every member on the same data, in parallel
    pub fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        if self.estimators.is_empty() {
            return Err(AutopriceError::ConfigurationError(
                "voting ensemble has no estimators".to_string(),
            ));
        }
        self.estimators
            .par_iter_mut()
            .map(|(name, pipe)| {
                debug!(member = %name, "Fitting ensemble member");
                pipe.fit(x, y).map(|_| ())
            })
            .collect::<Result<Vec<()>>>()?;
        Ok(self)
    }

    pub fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(AutopriceError::ModelNotFitted);
        }
        let predictions = self
            .estimators
            .iter()
            .map(|(_, pipe)| pipe.predict(x))
            .collect::<Result<Vec<_>>>()?;
        self.predict_from_predictions(&predictions)
    }

    /// Weighted mean of member predictions
    pub fn predict_from_predictions(&self, predictions: &[Array1<f64>]) -> Result<Array1<f64>> {
        let first = predictions
            .first()
            .ok_or_else(|| AutopriceError::ValidationError("No predictions provided".to_string()))?;
        let n_samples = first.len();
        if let Some(bad) = predictions.iter().find(|p| p.len() != n_samples) {
            return Err(AutopriceError::ShapeError {
                expected: format!("{n_samples} predictions"),
                actual: format!("{}", bad.len()),
            });
        }

        let weights = self
            .weights
            .clone()
            .unwrap_or_else(|| vec![1.0; predictions.len()]);
        let total: f64 = weights.iter().sum();

        let mut result = Array1::zeros(n_samples);
        for (pred, &w) in predictions.iter().zip(&weights) {
            result.scaled_add(w / total, pred);
        }
        Ok(result)
    }
}

impl TabularModel for VotingRegressor {
    fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<()> {
        VotingRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        VotingRegressor::predict(self, x)
    }
}
