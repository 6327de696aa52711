//! Min-max feature scaling

use crate::data::f64_values;
use crate::error::{AutopriceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    min: f64,
    range: f64,
}

/// Rescales numeric columns to `[0, 1]` using the training minimum and range.
///
/// A constant column has its range set to one, so it maps to zero.
/// Values outside the training range map outside `[0, 1]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: Vec<(String, ScalerParams)>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.params.clear();
        for name in columns {
            let ca = f64_values(df, name)?;
            let min = ca.min().unwrap_or(0.0);
            let max = ca.max().unwrap_or(1.0);
            let range = max - min;
            self.params.push((
                name.clone(),
                ScalerParams {
                    min,
                    range: if range == 0.0 { 1.0 } else { range },
                },
            ));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Scale the fitted columns; the output columns are `Float64`.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(AutopriceError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|(name, params)| {
                let scaled: Float64Chunked = f64_values(df, name)?
                    .into_iter()
                    .map(|opt| opt.map(|v| (v - params.min) / params.range))
                    .collect();
                Ok(scaled.with_name(name.as_str().into()).into_series())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }
        Ok(result)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }
}
