//! Integration tests for pricing pipelines, grid search and the trainer

mod common;

use autoprice::inference::ModelArtifact;
use autoprice::optimizer::{GridSearchCV, ParamGrid};
use autoprice::training::{
    build_pipeline, cross_validate, Estimator, GradientBoostingRegressor, KFold, LinearRegression, ModelKind,
    PipelineOptions, RandomForestRegressor, Trainer,
};

fn options() -> PipelineOptions {
    PipelineOptions::new().with_k_best(4).with_pca(true)
}

#[test]
fn test_repredicting_is_stable() {
    let (df, y, num, cat) = common::feature_frame(200);
    for estimator in [
        Estimator::Linear(LinearRegression::new()),
        Estimator::RandomForest(RandomForestRegressor::new(20).with_max_depth(6)),
        Estimator::GradientBoosting(GradientBoostingRegressor::default()),
    ] {
        let mut pipe = build_pipeline(estimator, &num, &cat, options()).unwrap();
        pipe.fit(&df, &y).unwrap();
        let first = pipe.predict(&df).unwrap();
        let second = pipe.predict(&df).unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}

#[test]
fn test_grid_search_best_is_in_grid() {
    let (df, y, num, cat) = common::feature_frame(150);
    let base = build_pipeline(
        Estimator::GradientBoosting(GradientBoostingRegressor::default()),
        &num,
        &cat,
        options(),
    )
    .unwrap();
    let grid = ParamGrid::new()
        .with_floats("learning_rate", &[0.05, 0.2])
        .with_ints("max_depth", &[2, 3]);

    let result = GridSearchCV::new(grid.clone()).with_cv(KFold::new(3)).fit(&base, &df, &y).unwrap();

    assert_eq!(result.candidates.len(), 4);
    assert!(grid.contains(&result.best_params));
    assert!(result.candidates.iter().all(|c| c.fold_scores.len() == 3));
    assert!(result.candidates.iter().all(|c| c.mean_score <= result.best_score));
    assert!(result.best_estimator.is_fitted());
}

#[test]
fn test_cross_validate_reports_both_sides() {
    let (df, y, num, cat) = common::feature_frame(120);
    let pipe = build_pipeline(Estimator::Linear(LinearRegression::new()), &num, &cat, options()).unwrap();
    let report = cross_validate(&pipe, &df, &y, &KFold::new(4)).unwrap();
    assert_eq!(report.test_mae.n_folds, 4);
    assert!(report.test_mae.mean_score > 0.0);
    assert!(report.train_mae.std_score >= 0.0);
}

#[test]
fn test_quick_training_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let report = common::train_quick(dir.path(), 300);

    assert!(report.quick);
    assert_eq!(report.non_used_rows, 1);
    assert_eq!(report.evaluations.len(), ModelKind::ALL.len());
    for kind in ModelKind::ALL {
        let artifact = ModelArtifact::load(dir.path().join("models").join(format!("{}.json", kind.key()))).unwrap();
        assert_eq!(artifact.key, kind);
        assert_eq!(artifact.schema.numeric.len(), 3);
    }
    let best = report.best().unwrap();
    assert!(best.mae.is_finite() && best.mae > 0.0);
}

#[test]
fn test_full_training_runs_search_once_per_estimator() {
    let dir = tempfile::tempdir().unwrap();
    let csv = common::write_adverts(dir.path(), 180);
    let config = common::test_config(dir.path());
    let report = Trainer::new(config.clone()).train(&csv, false).unwrap();

    assert_eq!(report.grid_search.len(), 2);
    assert!(config.rf_grid.contains(&report.grid_search[0].best_params));
    assert!(config.gbr_grid.contains(&report.grid_search[1].best_params));
    assert_eq!(report.cross_validation.len(), 3);
}
