//! Training run configuration

use crate::data::CleanerConfig;
use crate::optimizer::ParamGrid;
use chrono::Datelike;
use std::path::PathBuf;

/// Settings for one end-to-end training run
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Where `<key>.json` artifacts are written
    pub models_dir: PathBuf,
    /// MAE bar chart output
    pub chart_path: PathBuf,
    /// Reference year for `vehicle_age`
    pub current_year: i32,
    pub random_state: u64,
    pub test_size: f64,
    /// Row cap in quick mode
    pub quick_sample: usize,
    pub cv_folds: usize,
    pub rf_grid: ParamGrid,
    pub gbr_grid: ParamGrid,
    pub cleaner: CleanerConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            models_dir: std::env::var("AUTOPRICE_MODELS_DIR")
                .unwrap_or_else(|_| "models".to_string())
                .into(),
            chart_path: std::env::var("AUTOPRICE_CHART_PATH")
                .unwrap_or_else(|_| "docs/images/mae_bar.svg".to_string())
                .into(),
            current_year: std::env::var("AUTOPRICE_CURRENT_YEAR")
                .ok()
                .and_then(|y| y.parse().ok())
                .unwrap_or_else(|| chrono::Local::now().year()),
            random_state: 42,
            test_size: 0.3,
            quick_sample: 60_000,
            cv_folds: 5,
            rf_grid: ParamGrid::random_forest(),
            gbr_grid: ParamGrid::gradient_boosting(),
            cleaner: CleanerConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    pub fn with_chart_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chart_path = path.into();
        self
    }

    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_quick_sample(mut self, rows: usize) -> Self {
        self.quick_sample = rows;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_rf_grid(mut self, grid: ParamGrid) -> Self {
        self.rf_grid = grid;
        self
    }

    pub fn with_gbr_grid(mut self, grid: ParamGrid) -> Self {
        self.gbr_grid = grid;
        self
    }

    pub fn with_cleaner(mut self, cleaner: CleanerConfig) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Path of the artifact for a model key
    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.models_dir.join(format!("{key}.json"))
    }
}
