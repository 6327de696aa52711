//! Least-squares gradient boosting
//!
//! Starts from the target mean and adds shallow regression trees fitted to
//! the current residuals, each shrunk by the learning rate.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decision_tree::DecisionTreeRegressor;
use super::Regressor;
use crate::error::{AutopriceError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each tree
    pub subsample: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

impl GradientBoostingConfig {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(AutopriceError::ConfigurationError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(AutopriceError::ConfigurationError(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(AutopriceError::ConfigurationError(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub config: GradientBoostingConfig,
    trees: Vec<DecisionTreeRegressor>,
    initial_prediction: f64,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
        }
    }

    /// Fit the gradient boosting model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.config.validate()?;
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(AutopriceError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(AutopriceError::ValidationError(
                "cannot fit gradient boosting on empty data".to_string(),
            ));
        }

        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let residuals: Array1<f64> = if n_samples > 10_000 {
                let preds = &predictions;
                (0..n_samples).into_par_iter().map(|i| y[i] - preds[i]).collect::<Vec<_>>().into()
            } else {
                y - &predictions
            };

            let mut tree = DecisionTreeRegressor::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_random_state(rng.next_u64());

            if self.config.subsample < 1.0 {
                let sample = self.subsample_indices(n_samples, &mut rng);
                tree.fit(&x.select(Axis(0), &sample), &residuals.select(Axis(0), &sample))?;
            } else {
                tree.fit(x, &residuals)?;
            }

            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
            trees.push(tree);
        }

        debug!(
            n_trees = trees.len(),
            learning_rate = self.config.learning_rate,
            max_depth = self.config.max_depth,
            "Fitted gradient boosting"
        );
        self.trees = trees;
        Ok(self)
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let k = ((n as f64 * self.config.subsample).round() as usize).clamp(1, n);
        let mut sample = rand::seq::index::sample(rng, n, k).into_vec();
        sample.sort_unstable();
        sample
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(AutopriceError::ModelNotFitted);
        }

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GradientBoostingRegressor::predict(self, x)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((100, 2), |(i, j)| ((i * (j + 2) * 31) % 97) as f64);
        let y = x.column(0).mapv(|a| 3.0 * a) - x.column(1).mapv(|b| 0.5 * b) + 10.0;
        (x, y)
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let (x, y) = create_regression_data();
        let mut gbr = GradientBoostingRegressor::new(GradientBoostingConfig::default().with_max_depth(3));
        gbr.fit(&x, &y).unwrap();
        assert_eq!(gbr.n_trees(), 100);

        let pred = gbr.predict(&x).unwrap();
        let mae = (&pred - &y).mapv(f64::abs).mean().unwrap();
        let baseline = (&y - y.mean().unwrap()).mapv(f64::abs).mean().unwrap();
        assert!(mae < baseline * 0.1, "mae {mae} vs baseline {baseline}");
    }

    #[test]
    fn test_single_round_is_shrunk_step_from_mean() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 10.0, 10.0]);

        let config = GradientBoostingConfig::default().with_n_estimators(1).with_learning_rate(0.5);
        let mut gbr = GradientBoostingRegressor::new(config);
        gbr.fit(&x, &y).unwrap();

        // mean 5, residuals -5/+5, half step
        let pred = gbr.predict(&x).unwrap();
        assert_eq!(pred.to_vec(), vec![2.5, 2.5, 7.5, 7.5]);
    }

    #[test]
    fn test_invalid_config() {
        let (x, y) = create_regression_data();
        let mut gbr = GradientBoostingRegressor::new(GradientBoostingConfig::default().with_learning_rate(0.0));
        assert!(matches!(gbr.fit(&x, &y), Err(AutopriceError::ConfigurationError(_))));
    }
}
