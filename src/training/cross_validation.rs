//! K-fold cross-validation

use super::metrics::mean_absolute_error;
use super::TabularModel;
use crate::data::subset;
use crate::error::{AutopriceError, Result};
use ndarray::Array1;
use polars::prelude::DataFrame;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter. Unshuffled by default: folds are contiguous blocks and
/// the first `n % k` folds hold one extra row.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: u64,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: 42,
        }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.random_state = seed;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(AutopriceError::ConfigurationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < self.n_splits {
            return Err(AutopriceError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }
}

/// Summary of per-fold scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    pub mean_score: f64,
    /// Population standard deviation of the fold scores
    pub std_score: f64,
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: f64::NAN,
                std_score: f64::NAN,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}

/// Held-out and in-sample MAE across folds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub test_mae: CVResults,
    pub train_mae: CVResults,
}

/// Fit a fresh copy of `model` on each fold and score both sides by MAE.
/// Folds run in parallel.
pub fn cross_validate<M>(model: &M, x: &DataFrame, y: &Array1<f64>, kfold: &KFold) -> Result<CrossValidationReport>
where
    M: TabularModel + Clone,
{
    let splits = kfold.split(x.height())?;

    let fold_scores = splits
        .par_iter()
        .map(|split| -> Result<(f64, f64)> {
            let (x_train, y_train) = subset(x, y, &split.train_indices)?;
            let (x_test, y_test) = subset(x, y, &split.test_indices)?;

            let mut fold_model = model.clone();
            fold_model.fit(&x_train, &y_train)?;
            let test = mean_absolute_error(&y_test, &fold_model.predict(&x_test)?);
            let train = mean_absolute_error(&y_train, &fold_model.predict(&x_train)?);
            debug!(fold = split.fold_idx, test_mae = test, train_mae = train, "Scored fold");
            Ok((test, train))
        })
        .collect::<Result<Vec<_>>>()?;

    let (test, train): (Vec<f64>, Vec<f64>) = fold_scores.into_iter().unzip();
    Ok(CrossValidationReport {
        test_mae: CVResults::from_scores(test),
        train_mae: CVResults::from_scores(train),
    })
}
