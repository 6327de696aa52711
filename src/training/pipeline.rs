//! Pricing pipelines: preprocessing, optional selection and PCA, then an estimator

use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::linear_models::LinearRegression;
use super::random_forest::RandomForestRegressor;
use super::{Regressor, TabularModel};
use crate::ensemble::VotingRegressor;
use crate::error::{AutopriceError, Result};
use crate::optimizer::ParamSet;
use crate::preprocessing::{make_preprocessor, ColumnPreprocessor, Pca, SelectKBest};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Features kept by the selection step of every standard pipeline
pub const K_BEST: usize = 10;

/// Final regression step of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    Linear(LinearRegression),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl Estimator {
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::Linear(_) => "linear_regression",
            Estimator::RandomForest(_) => "random_forest",
            Estimator::GradientBoosting(_) => "gradient_boosting",
        }
    }

    /// Apply named hyper-parameters. Unknown names are rejected.
    pub fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            match (&mut *self, name.as_str()) {
                (Estimator::RandomForest(rf), "n_estimators") => rf.n_estimators = value.as_usize(name)?,
                (Estimator::RandomForest(rf), "max_depth") => rf.max_depth = Some(value.as_usize(name)?),
                (Estimator::RandomForest(rf), "min_samples_leaf") => rf.min_samples_leaf = value.as_usize(name)?,
                (Estimator::GradientBoosting(gb), "n_estimators") => gb.config.n_estimators = value.as_usize(name)?,
                (Estimator::GradientBoosting(gb), "max_depth") => gb.config.max_depth = value.as_usize(name)?,
                (Estimator::GradientBoosting(gb), "min_samples_leaf") => {
                    gb.config.min_samples_leaf = value.as_usize(name)?
                }
                (Estimator::GradientBoosting(gb), "learning_rate") => gb.config.learning_rate = value.as_f64(),
                (estimator, _) => {
                    return Err(AutopriceError::ConfigurationError(format!(
                        "{} has no parameter '{name}'",
                        estimator.name()
                    )))
                }
            }
        }
        Ok(())
    }

    fn regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Estimator::Linear(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::GradientBoosting(m) => m,
        }
    }

    fn regressor(&self) -> &dyn Regressor {
        match self {
            Estimator::Linear(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::GradientBoosting(m) => m,
        }
    }
}

impl Regressor for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.regressor().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.regressor().is_fitted()
    }
}

/// Optional pipeline stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Keep this many features by F-statistic
    pub k_best: Option<usize>,
    /// Degree-3 polynomial expansion of the numeric branch
    pub poly: bool,
    /// Rotate onto principal components before the estimator
    pub use_pca: bool,
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_k_best(mut self, k: usize) -> Self {
        self.k_best = Some(k);
        self
    }

    pub fn with_poly(mut self, poly: bool) -> Self {
        self.poly = poly;
        self
    }

    pub fn with_pca(mut self, use_pca: bool) -> Self {
        self.use_pca = use_pca;
        self
    }
}

/// Preprocessor, optional selector and PCA, and an estimator fitted as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePipeline {
    preprocessor: ColumnPreprocessor,
    selector: Option<SelectKBest>,
    pca: Option<Pca>,
    estimator: Estimator,
    is_fitted: bool,
}

/// Assemble an unfitted pipeline.
pub fn build_pipeline(
    estimator: Estimator,
    numeric: &[String],
    categorical: &[String],
    options: PipelineOptions,
) -> Result<PricePipeline> {
    let selector = options.k_best.map(SelectKBest::new).transpose()?;
    Ok(PricePipeline {
        preprocessor: make_preprocessor(numeric, categorical, options.poly),
        selector,
        pca: options.use_pca.then(Pca::new),
        estimator,
        is_fitted: false,
    })
}

impl PricePipeline {
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn preprocessor(&self) -> &ColumnPreprocessor {
        &self.preprocessor
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Apply hyper-parameters to the estimator; the pipeline must be refitted.
    pub fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        self.estimator.set_params(params)?;
        self.is_fitted = false;
        Ok(())
    }

    pub fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        let mut features = self.preprocessor.fit_transform(x, y)?;
        if let Some(selector) = self.selector.as_mut() {
            features = selector.fit_transform(&features, y)?;
        }
        if let Some(pca) = self.pca.as_mut() {
            features = pca.fit_transform(&features)?;
        }
        debug!(
            estimator = self.estimator.name(),
            rows = features.nrows(),
            features = features.ncols(),
            "Fitting pipeline estimator"
        );
        Regressor::fit(&mut self.estimator, &features, y)?;
        self.is_fitted = true;
        Ok(self)
    }

    /// Design matrix as seen by the estimator
    pub fn transform(&self, x: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(AutopriceError::ModelNotFitted);
        }
        let mut features = self.preprocessor.transform(x)?;
        if let Some(selector) = &self.selector {
            features = selector.transform(&features)?;
        }
        if let Some(pca) = &self.pca {
            features = pca.transform(&features)?;
        }
        Ok(features)
    }

    pub fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        let features = self.transform(x)?;
        Regressor::predict(&self.estimator, &features)
    }
}

impl TabularModel for PricePipeline {
    fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<()> {
        PricePipeline::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        PricePipeline::predict(self, x)
    }
}

/// Linear regression on degree-3 numeric terms, 10 best features, PCA
pub fn pipe_lr(numeric: &[String], categorical: &[String]) -> Result<PricePipeline> {
    build_pipeline(
        Estimator::Linear(LinearRegression::new()),
        numeric,
        categorical,
        PipelineOptions::new().with_poly(true).with_k_best(K_BEST).with_pca(true),
    )
}

/// Random forest (depth 10), 10 best features, PCA
pub fn pipe_rfr(numeric: &[String], categorical: &[String]) -> Result<PricePipeline> {
    build_pipeline(
        Estimator::RandomForest(RandomForestRegressor::new(100).with_max_depth(10)),
        numeric,
        categorical,
        PipelineOptions::new().with_k_best(K_BEST).with_pca(true),
    )
}

/// Gradient boosting (depth 7, learning rate 0.1), 10 best features, PCA
pub fn pipe_gbr(numeric: &[String], categorical: &[String]) -> Result<PricePipeline> {
    build_pipeline(
        Estimator::GradientBoosting(GradientBoostingRegressor::new(
            GradientBoostingConfig::default().with_max_depth(7).with_learning_rate(0.1),
        )),
        numeric,
        categorical,
        PipelineOptions::new().with_k_best(K_BEST).with_pca(true),
    )
}

/// Equal-weight average of the gbr, rfr and lr pipelines, each fitted on its own
pub fn pipe_ensemble(numeric: &[String], categorical: &[String]) -> Result<VotingRegressor> {
    Ok(VotingRegressor::new(vec![
        ("gbr".to_string(), pipe_gbr(numeric, categorical)?),
        ("rfr".to_string(), pipe_rfr(numeric, categorical)?),
        ("lr".to_string(), pipe_lr(numeric, categorical)?),
    ]))
}

/// The four trained model configurations, keyed as on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Lr,
    Rfr,
    Gbr,
    Ensemble,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [ModelKind::Lr, ModelKind::Rfr, ModelKind::Gbr, ModelKind::Ensemble];

    pub fn key(&self) -> &'static str {
        match self {
            ModelKind::Lr => "lr",
            ModelKind::Rfr => "rfr",
            ModelKind::Gbr => "gbr",
            ModelKind::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ModelKind {
    type Err = AutopriceError;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::ALL
            .into_iter()
            .find(|k| k.key() == s)
            .ok_or_else(|| AutopriceError::ConfigurationError(format!("unknown model '{s}'")))
    }
}

/// A trained (or trainable) pricing model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PriceModel {
    Pipeline(PricePipeline),
    Voting(VotingRegressor),
}

impl PriceModel {
    pub fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<()> {
        match self {
            PriceModel::Pipeline(p) => p.fit(x, y).map(|_| ()),
            PriceModel::Voting(v) => v.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        match self {
            PriceModel::Pipeline(p) => p.predict(x),
            PriceModel::Voting(v) => v.predict(x),
        }
    }

    pub fn as_pipeline(&self) -> Option<&PricePipeline> {
        match self {
            PriceModel::Pipeline(p) => Some(p),
            PriceModel::Voting(_) => None,
        }
    }
}

impl TabularModel for PriceModel {
    fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<()> {
        PriceModel::fit(self, x, y)
    }

    fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        PriceModel::predict(self, x)
    }
}

/// Unfitted model for one of the four standard configurations.
pub fn build_model(kind: ModelKind, numeric: &[String], categorical: &[String]) -> Result<PriceModel> {
    Ok(match kind {
        ModelKind::Lr => PriceModel::Pipeline(pipe_lr(numeric, categorical)?),
        ModelKind::Rfr => PriceModel::Pipeline(pipe_rfr(numeric, categorical)?),
        ModelKind::Gbr => PriceModel::Pipeline(pipe_gbr(numeric, categorical)?),
        ModelKind::Ensemble => PriceModel::Voting(pipe_ensemble(numeric, categorical)?),
    })
}
