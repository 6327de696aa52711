//! Column-wise preprocessing: numeric and categorical branches plus passthrough

use super::{
    encoder::TargetEncoder,
    imputer::{ImputeStrategy, Imputer},
    polynomial::PolynomialFeatures,
    scaler::MinMaxScaler,
};
use crate::data::f64_values;
use crate::error::{AutopriceError, Result};
use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Degree of the optional numeric polynomial expansion
pub const POLY_DEGREE: usize = 3;

/// Turns a feature frame into a dense matrix.
///
/// Numeric columns are mean-imputed, min-max scaled and optionally expanded
/// into degree-3 polynomial terms. Categorical columns are mode-imputed and
/// target encoded. Any other column of the fit frame is passed through as
/// `Float64` after the two branches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    remainder_columns: Vec<String>,
    numeric_imputer: Imputer,
    scaler: MinMaxScaler,
    poly: Option<PolynomialFeatures>,
    categorical_imputer: Imputer,
    encoder: TargetEncoder,
    is_fitted: bool,
}

/// Build an unfitted preprocessor for the given column roles.
pub fn make_preprocessor(numeric: &[String], categorical: &[String], poly: bool) -> ColumnPreprocessor {
    ColumnPreprocessor::new(numeric.to_vec(), categorical.to_vec(), poly)
}

impl ColumnPreprocessor {
    pub fn new(numeric_columns: Vec<String>, categorical_columns: Vec<String>, poly: bool) -> Self {
        Self {
            numeric_columns,
            categorical_columns,
            remainder_columns: Vec::new(),
            numeric_imputer: Imputer::new(ImputeStrategy::Mean),
            scaler: MinMaxScaler::new(),
            poly: poly.then(|| PolynomialFeatures::new(POLY_DEGREE)),
            categorical_imputer: Imputer::new(ImputeStrategy::MostFrequent),
            encoder: TargetEncoder::new(),
            is_fitted: false,
        }
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn remainder_columns(&self) -> &[String] {
        &self.remainder_columns
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit(&mut self, df: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        if df.height() != y.len() {
            return Err(AutopriceError::ShapeError {
                expected: format!("{} targets", df.height()),
                actual: format!("{} targets", y.len()),
            });
        }

        self.remainder_columns = df
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .filter(|c| !self.numeric_columns.contains(c) && !self.categorical_columns.contains(c))
            .collect();

        let imputed = self.numeric_imputer.fit_transform(df, &self.numeric_columns)?;
        let scaled = self.scaler.fit_transform(&imputed, &self.numeric_columns)?;
        if let Some(poly) = self.poly.as_mut() {
            poly.fit(&frame_to_matrix(&scaled, &self.numeric_columns)?)?;
        }

        let imputed = self.categorical_imputer.fit_transform(df, &self.categorical_columns)?;
        self.encoder.fit(&imputed, &self.categorical_columns, y)?;

        self.is_fitted = true;
        debug!(
            numeric = self.numeric_columns.len(),
            categorical = self.categorical_columns.len(),
            remainder = self.remainder_columns.len(),
            "Fitted column preprocessor"
        );
        Ok(self)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(AutopriceError::ModelNotFitted);
        }

        let imputed = self.numeric_imputer.transform(df)?;
        let scaled = self.scaler.transform(&imputed)?;
        let mut numeric = frame_to_matrix(&scaled, &self.numeric_columns)?;
        if let Some(poly) = &self.poly {
            numeric = poly.transform(&numeric)?;
        }

        let imputed = self.categorical_imputer.transform(df)?;
        let categorical = self.encoder.transform(&imputed)?;
        let remainder = frame_to_matrix(df, &self.remainder_columns)?;

        Ok(concatenate(
            Axis(1),
            &[numeric.view(), categorical.view(), remainder.view()],
        )?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, y: &Array1<f64>) -> Result<Array2<f64>> {
        self.fit(df, y)?;
        self.transform(df)
    }
}

/// Dense matrix of the named columns cast to `Float64`; nulls become NaN.
pub fn frame_to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut out = Array2::zeros((df.height(), columns.len()));
    for (j, name) in columns.iter().enumerate() {
        let values = f64_values(df, name)?;
        for (i, v) in values.into_iter().enumerate() {
            out[[i, j]] = v.unwrap_or(f64::NAN);
        }
    }
    Ok(out)
}
