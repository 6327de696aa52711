//! Exhaustive grid search with k-fold cross-validation
//!
//! Every (candidate, fold) pair is an independent fit, so the whole grid is
//! fanned out over rayon and reduced to a mean score per candidate.

use crate::data::subset;
use crate::error::{AutopriceError, Result};
use crate::training::{mean_absolute_error, KFold, PricePipeline};
use ndarray::Array1;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// A single hyper-parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(usize),
    Float(f64),
}

impl ParamValue {
    pub fn as_usize(&self, name: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) => Ok(*v),
            ParamValue::Float(v) => Err(AutopriceError::ConfigurationError(format!(
                "parameter '{name}' expects an integer, got {v}"
            ))),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Int(v) => *v as f64,
            ParamValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One point of a grid, keyed by parameter name
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Render a parameter set as `name=value, ...`
pub fn format_params(params: &ParamSet) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Named parameter axes; the grid is their Cartesian product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    axes: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ints(mut self, name: &str, values: &[usize]) -> Self {
        self.axes.insert(name.to_string(), values.iter().map(|&v| ParamValue::Int(v)).collect());
        self
    }

    pub fn with_floats(mut self, name: &str, values: &[f64]) -> Self {
        self.axes.insert(name.to_string(), values.iter().map(|&v| ParamValue::Float(v)).collect());
        self
    }

    /// `n_estimators` x `max_depth` for the random forest
    pub fn random_forest() -> Self {
        Self::new()
            .with_ints("n_estimators", &[100, 200, 300])
            .with_ints("max_depth", &[5, 8, 10])
    }

    /// `learning_rate` x `max_depth` for gradient boosting
    pub fn gradient_boosting() -> Self {
        Self::new()
            .with_floats("learning_rate", &[0.05, 0.1, 0.2])
            .with_ints("max_depth", &[3, 5, 7])
    }

    /// All combinations; parameter names in sorted order, the last varying fastest.
    pub fn combinations(&self) -> Vec<ParamSet> {
        let mut combos = vec![ParamSet::new()];
        for (name, values) in &self.axes {
            combos = combos
                .into_iter()
                .flat_map(|partial| {
                    values.iter().map(move |v| {
                        let mut next = partial.clone();
                        next.insert(name.clone(), *v);
                        next
                    })
                })
                .collect();
        }
        combos
    }

    pub fn len(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.values().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, params: &ParamSet) -> bool {
        params.len() == self.axes.len()
            && params
                .iter()
                .all(|(k, v)| self.axes.get(k).is_some_and(|values| values.contains(v)))
    }
}

/// Mean cross-validated score of one grid point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ParamSet,
    /// Mean negative MAE over folds (higher is better)
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

/// Outcome of a grid search
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    /// Best candidate refitted on all of the search data
    pub best_estimator: PricePipeline,
    pub candidates: Vec<CandidateScore>,
}

/// Grid search scored by negative mean absolute error
#[derive(Debug, Clone)]
pub struct GridSearchCV {
    grid: ParamGrid,
    cv: KFold,
}

impl GridSearchCV {
    pub fn new(grid: ParamGrid) -> Self {
        Self {
            grid,
            cv: KFold::new(5),
        }
    }

    pub fn with_cv(mut self, cv: KFold) -> Self {
        self.cv = cv;
        self
    }

    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    /// Score every grid point on every fold, pick the best mean score
    /// (first candidate wins ties) and refit it on all of `x`.
    pub fn fit(&self, base: &PricePipeline, x: &DataFrame, y: &Array1<f64>) -> Result<GridSearchResult> {
        let candidates = self.grid.combinations();
        if self.grid.is_empty() {
            return Err(AutopriceError::ConfigurationError(
                "parameter grid is empty".to_string(),
            ));
        }
        let splits = self.cv.split(x.height())?;

        let start = Instant::now();
        info!(
            estimator = base.estimator().name(),
            candidates = candidates.len(),
            folds = splits.len(),
            "Starting grid search"
        );

        let tasks: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..splits.len()).map(move |f| (c, f)))
            .collect();

        let scores = tasks
            .par_iter()
            .map(|&(c, f)| -> Result<(usize, f64)> {
                let split = &splits[f];
                let (x_train, y_train) = subset(x, y, &split.train_indices)?;
                let (x_test, y_test) = subset(x, y, &split.test_indices)?;

                let mut model = base.clone();
                model.set_params(&candidates[c])?;
                model.fit(&x_train, &y_train)?;
                let score = -mean_absolute_error(&y_test, &model.predict(&x_test)?);
                debug!(candidate = c, fold = f, score, "Scored grid point");
                Ok((c, score))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut fold_scores: Vec<Vec<f64>> = vec![Vec::with_capacity(splits.len()); candidates.len()];
        for (c, score) in scores {
            fold_scores[c].push(score);
        }

        let results: Vec<CandidateScore> = candidates
            .into_iter()
            .zip(fold_scores)
            .map(|(params, fold_scores)| CandidateScore {
                mean_score: fold_scores.iter().sum::<f64>() / fold_scores.len() as f64,
                params,
                fold_scores,
            })
            .collect();

        let best = results
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (i, r)| match best {
                Some((_, s)) if s >= r.mean_score => best,
                _ => Some((i, r.mean_score)),
            })
            .map(|(i, _)| i)
            .ok_or_else(|| AutopriceError::ComputationError("no grid point could be scored".to_string()))?;

        let best_params = results[best].params.clone();
        let best_score = results[best].mean_score;

        let mut best_estimator = base.clone();
        best_estimator.set_params(&best_params)?;
        best_estimator.fit(x, y)?;

        info!(
            estimator = base.estimator().name(),
            best_params = %format_params(&best_params),
            best_score,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Grid search finished"
        );

        Ok(GridSearchResult {
            best_params,
            best_score,
            best_estimator,
            candidates: results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinations_order_and_size() {
        let grid = ParamGrid::random_forest();
        let combos = grid.combinations();
        assert_eq!(combos.len(), 9);
        assert_eq!(grid.len(), 9);

        // Sorted names: max_depth, n_estimators (last varies fastest)
        assert_eq!(combos[0]["max_depth"], ParamValue::Int(5));
        assert_eq!(combos[0]["n_estimators"], ParamValue::Int(100));
        assert_eq!(combos[1]["n_estimators"], ParamValue::Int(200));
        assert_eq!(combos[3]["max_depth"], ParamValue::Int(8));
        assert!(combos.iter().all(|c| grid.contains(c)));
    }

    #[test]
    fn test_contains_rejects_off_grid() {
        let grid = ParamGrid::gradient_boosting();
        let mut params = ParamSet::new();
        params.insert("learning_rate".to_string(), ParamValue::Float(0.3));
        params.insert("max_depth".to_string(), ParamValue::Int(3));
        assert!(!grid.contains(&params));
    }

    #[test]
    fn test_empty_grid() {
        assert!(ParamGrid::new().is_empty());
        assert_eq!(ParamGrid::new().with_ints("max_depth", &[]).len(), 0);
    }

    #[test]
    fn test_param_value_json() {
        let json = serde_json::to_string(&ParamValue::Float(0.1)).unwrap();
        assert_eq!(json, "0.1");
        assert_eq!(format_params(&ParamGrid::random_forest().combinations()[0]), "max_depth=5, n_estimators=100");
    }
}
