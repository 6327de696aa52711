//! Model training module
//!
//! Provides the regression estimators, the pricing pipelines built from them,
//! cross-validation and the end-to-end training run:
//! - Ordinary least squares
//! - CART regression trees, random forests and gradient boosting
//! - Preprocessing + selection + PCA + estimator pipelines
//! - K-fold cross-validation
//! - The [`Trainer`] that produces persisted model artifacts

mod config;
mod metrics;
mod trainer;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod pipeline;
pub mod random_forest;

pub use config::TrainingConfig;
pub use cross_validation::{cross_validate, CVResults, CVSplit, CrossValidationReport, KFold};
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use linear_models::LinearRegression;
pub use metrics::{mean_absolute_error, ModelMetrics};
pub use pipeline::{
    build_model, build_pipeline, pipe_ensemble, pipe_gbr, pipe_lr, pipe_rfr, Estimator, ModelKind,
    PipelineOptions, PriceModel, PricePipeline,
};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use trainer::{train, CvRow, GridSearchSummary, ModelEvaluation, Trainer, TrainingReport};

use crate::error::Result;
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;

/// Estimator over a dense feature matrix
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;
}

/// Model over a feature frame: preprocessing is part of the model
pub trait TabularModel: Send + Sync {
    fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &DataFrame) -> Result<Array1<f64>>;
}
