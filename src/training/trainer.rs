//! End-to-end training run
//!
//! load -> (sample) -> clean -> engineer -> split -> fit and evaluate the four
//! model configurations -> persist -> (grid search, cross-validation) -> chart.
//! Any failure before persistence aborts the run with nothing written.

use super::cross_validation::{cross_validate, CrossValidationReport, KFold};
use super::metrics::ModelMetrics;
use super::pipeline::{build_model, pipe_gbr, pipe_lr, pipe_rfr, ModelKind, PriceModel, PricePipeline};
use super::TrainingConfig;
use crate::data::{load_raw, sample_rows, subset, text_values, train_test_split, Cleaner, PRICE, VEHICLE_CONDITION};
use crate::error::Result;
use crate::feature_engineering::{add_engineered, split_features, FeatureSplit};
use crate::inference::ModelArtifact;
use crate::optimizer::{format_params, GridSearchCV, ParamGrid, ParamSet};
use crate::visualization::mae_bar;
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Held-out performance of one trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub name: String,
    pub mae: f64,
    pub r2: f64,
}

/// Winner of one grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchSummary {
    pub estimator: String,
    pub best_params: ParamSet,
    /// Mean negative MAE over the folds
    pub best_score: f64,
    pub n_candidates: usize,
}

/// Cross-validated MAE of one model on the full cleaned data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvRow {
    pub name: String,
    pub test_mae_mean: f64,
    pub test_mae_std: f64,
    pub train_mae_mean: f64,
    pub train_mae_std: f64,
}

impl CvRow {
    fn new(name: &str, report: &CrossValidationReport) -> Self {
        Self {
            name: name.to_string(),
            test_mae_mean: report.test_mae.mean_score,
            test_mae_std: report.test_mae.std_score,
            train_mae_mean: report.train_mae.mean_score,
            train_mae_std: report.train_mae.std_score,
        }
    }
}

/// Everything a training run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub quick: bool,
    pub rows_loaded: usize,
    pub rows_cleaned: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Surviving rows whose condition is not `USED`
    pub non_used_rows: usize,
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub evaluations: Vec<ModelEvaluation>,
    pub grid_search: Vec<GridSearchSummary>,
    pub cross_validation: Vec<CvRow>,
    pub artifacts: Vec<PathBuf>,
    /// `None` when the chart could not be rendered
    pub chart: Option<PathBuf>,
    pub elapsed_secs: f64,
}

impl TrainingReport {
    /// Evaluation with the lowest MAE
    pub fn best(&self) -> Option<&ModelEvaluation> {
        self.evaluations.iter().min_by(|a, b| a.mae.total_cmp(&b.mae))
    }
}

/// Runs the training pipeline with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn train(&self, csv_path: impl AsRef<Path>, quick: bool) -> Result<TrainingReport> {
        let start = Instant::now();
        let config = &self.config;

        let raw = load_raw(csv_path.as_ref())?;
        let rows_loaded = raw.height();
        let raw = if quick {
            let n = config.quick_sample.min(rows_loaded);
            info!(rows = n, "Quick mode: sampling rows");
            sample_rows(&raw, n, config.random_state)?
        } else {
            raw
        };

        let cleaned = Cleaner::new(config.cleaner.clone()).clean(&raw)?;
        let engineered = add_engineered(&cleaned, config.current_year)?;
        let non_used_rows = count_non_used(&engineered)?;
        if non_used_rows > 0 {
            warn!(rows = non_used_rows, "Cleaned data holds vehicles whose condition is not USED");
        }

        let features = split_features(&engineered, PRICE)?;
        let (train_idx, test_idx) = train_test_split(features.x.height(), config.test_size, config.random_state)?;
        let (x_train, y_train) = subset(&features.x, &features.y, &train_idx)?;
        let (x_test, y_test) = subset(&features.x, &features.y, &test_idx)?;
        info!(
            rows = features.x.height(),
            train = train_idx.len(),
            test = test_idx.len(),
            numeric = features.numeric.len(),
            categorical = features.categorical.len(),
            "Prepared training data"
        );

        let (models, evaluations) = self.fit_and_evaluate(&features, &x_train, &y_train, &x_test, &y_test)?;
        let artifacts = self.persist(&features, &models)?;

        let mut grid_search = Vec::new();
        let mut cross_validation = Vec::new();
        if !quick {
            let kfold = KFold::new(config.cv_folds);
            let (rf, rf_summary) = search(
                pipe_rfr(&features.numeric, &features.categorical)?,
                &config.rf_grid,
                &kfold,
                &x_train,
                &y_train,
            )?;
            let (gb, gb_summary) = search(
                pipe_gbr(&features.numeric, &features.categorical)?,
                &config.gbr_grid,
                &kfold,
                &x_train,
                &y_train,
            )?;
            grid_search.push(rf_summary);
            grid_search.push(gb_summary);

            let lr = pipe_lr(&features.numeric, &features.categorical)?;
            for (name, pipeline) in [("lr", &lr), ("rfr", &rf), ("gbr", &gb)] {
                let report = cross_validate(pipeline, &features.x, &features.y, &kfold)?;
                info!(
                    model = name,
                    test_mae = report.test_mae.mean_score,
                    test_mae_std = report.test_mae.std_score,
                    train_mae = report.train_mae.mean_score,
                    "Cross-validated"
                );
                cross_validation.push(CvRow::new(name, &report));
            }
        }

        let bars: Vec<(String, f64)> = evaluations.iter().map(|e| (e.name.clone(), e.mae)).collect();
        let chart = match mae_bar(&bars, &config.chart_path) {
            Ok(()) => Some(config.chart_path.clone()),
            Err(e) => {
                warn!(path = %config.chart_path.display(), error = %e, "Could not render MAE chart");
                None
            }
        };

        let report = TrainingReport {
            quick,
            rows_loaded,
            rows_cleaned: engineered.height(),
            n_train: train_idx.len(),
            n_test: test_idx.len(),
            non_used_rows,
            numeric_features: features.numeric.clone(),
            categorical_features: features.categorical.clone(),
            evaluations,
            grid_search,
            cross_validation,
            artifacts,
            chart,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        if let Some(best) = report.best() {
            info!(model = %best.name, mae = best.mae, elapsed_secs = report.elapsed_secs, "Training finished");
        }
        Ok(report)
    }

    fn fit_and_evaluate(
        &self,
        features: &FeatureSplit,
        x_train: &DataFrame,
        y_train: &Array1<f64>,
        x_test: &DataFrame,
        y_test: &Array1<f64>,
    ) -> Result<(Vec<(ModelKind, PriceModel)>, Vec<ModelEvaluation>)> {
        let mut models = Vec::with_capacity(ModelKind::ALL.len());
        let mut evaluations = Vec::with_capacity(ModelKind::ALL.len());

        for kind in ModelKind::ALL {
            let fit_start = Instant::now();
            let mut model = build_model(kind, &features.numeric, &features.categorical)?;
            model.fit(x_train, y_train)?;
            let metrics = ModelMetrics::compute_regression(y_test, &model.predict(x_test)?);
            info!(
                model = %kind,
                mae = metrics.mae,
                r2 = metrics.r2,
                fit_secs = fit_start.elapsed().as_secs_f64(),
                "Evaluated model"
            );
            evaluations.push(ModelEvaluation {
                name: kind.key().to_string(),
                mae: metrics.mae,
                r2: metrics.r2,
            });
            models.push((kind, model));
        }
        Ok((models, evaluations))
    }

    fn persist(&self, features: &FeatureSplit, models: &[(ModelKind, PriceModel)]) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.config.models_dir)?;
        models
            .iter()
            .map(|(kind, model)| {
                let path = self.config.artifact_path(kind.key());
                ModelArtifact::new(*kind, self.config.current_year, features.schema(), model.clone()).save(&path)?;
                Ok(path)
            })
            .collect()
    }
}

/// Train with the default configuration.
pub fn train(csv_path: impl AsRef<Path>, quick: bool) -> Result<TrainingReport> {
    Trainer::default().train(csv_path, quick)
}

fn count_non_used(df: &DataFrame) -> Result<usize> {
    if df.column(VEHICLE_CONDITION).is_err() {
        return Ok(0);
    }
    let conditions = text_values(df, VEHICLE_CONDITION)?;
    Ok(conditions.into_iter().flatten().filter(|c| *c != "USED").count())
}

fn search(
    base: PricePipeline,
    grid: &ParamGrid,
    kfold: &KFold,
    x: &DataFrame,
    y: &Array1<f64>,
) -> Result<(PricePipeline, GridSearchSummary)> {
    let result = GridSearchCV::new(grid.clone()).with_cv(kfold.clone()).fit(&base, x, y)?;
    info!(
        estimator = base.estimator().name(),
        best_params = %format_params(&result.best_params),
        best_mae = -result.best_score,
        "Grid search winner"
    );
    let summary = GridSearchSummary {
        estimator: base.estimator().name().to_string(),
        best_params: result.best_params,
        best_score: result.best_score,
        n_candidates: result.candidates.len(),
    };
    Ok((result.best_estimator, summary))
}
