//! Feature preprocessing
//!
//! Fit-on-train, frozen-at-transform building blocks:
//! - Missing value imputation (mean, most frequent)
//! - Min-max scaling
//! - Polynomial feature expansion
//! - Smoothed target encoding
//! - Univariate feature selection (F-statistic)
//! - Principal component analysis
//!
//! [`ColumnPreprocessor`] wires the column-level steps into the numeric and
//! categorical branches used by every pricing pipeline.

mod encoder;
mod imputer;
mod pipeline;
mod polynomial;
mod scaler;
pub mod feature_selection;
pub mod pca;

pub use encoder::TargetEncoder;
pub use feature_selection::{f_regression, SelectKBest};
pub use imputer::{ImputeStrategy, Imputer};
pub use pca::Pca;
pub use pipeline::{frame_to_matrix, make_preprocessor, ColumnPreprocessor, POLY_DEGREE};
pub use polynomial::PolynomialFeatures;
pub use scaler::MinMaxScaler;
