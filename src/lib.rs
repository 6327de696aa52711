//! autoprice - used-vehicle price estimation
//!
//! Trains regression models on historical car adverts and prices new adverts
//! entered through a form.
//!
//! # Modules
//!
//! ## Training
//! - [`data`] - Advert loading, cleansing and row utilities
//! - [`feature_engineering`] - Vehicle age, mileage-per-year and the feature split
//! - [`preprocessing`] - Imputation, scaling, polynomial terms, target encoding, selection, PCA
//! - [`training`] - Estimators, pricing pipelines, cross-validation and the [`training::Trainer`]
//! - [`optimizer`] - Grid search over estimator hyper-parameters
//! - [`ensemble`] - Voting ensemble of pipelines
//! - [`visualization`] - MAE comparison chart
//!
//! ## Serving
//! - [`inference`] - Pricing form, model artifacts and the cached estimator
//! - [`lookup`] - Make/model vocabulary for the form
//! - [`server`] - HTTP pricing form and JSON API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod data;
pub mod feature_engineering;
pub mod preprocessing;
pub mod training;
pub mod optimizer;
pub mod ensemble;
pub mod visualization;

pub mod inference;
pub mod lookup;
pub mod server;
pub mod cli;

pub use error::{AutopriceError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::data::{clean, load_raw, Cleaner, CleanerConfig};
    pub use crate::error::{AutopriceError, Result};
    pub use crate::feature_engineering::{add_engineered, split_features, FeatureSchema, FeatureSplit};
    pub use crate::inference::{format_price, AdvertForm, BodyType, FuelType, ModelArtifact, ModelCache, PriceEstimator};
    pub use crate::lookup::{LookupCache, LookupTable};
    pub use crate::optimizer::{GridSearchCV, ParamGrid, ParamSet, ParamValue};
    pub use crate::training::{
        build_model, train, ModelKind, PriceModel, PricePipeline, TabularModel, Trainer, TrainingConfig,
        TrainingReport,
    };
}
