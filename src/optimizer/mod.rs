//! Hyper-parameter search
//!
//! Exhaustive grid search over named estimator parameters, scored by
//! cross-validated negative mean absolute error.

pub mod grid_search;

pub use grid_search::{format_params, CandidateScore, GridSearchCV, GridSearchResult, ParamGrid, ParamSet, ParamValue};
