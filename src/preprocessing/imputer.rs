//! Missing value imputation

use crate::data::{f64_values, most_frequent, text_values};
use crate::error::{AutopriceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the column mean; output is `Float64`
    Mean,
    /// Replace with the most frequent value; output is text
    MostFrequent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    Text(String),
}

/// Per-column imputer learned on training data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<(String, ImputeValue)>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learn one fill value per column.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.fill_values.clear();
        for name in columns {
            let value = match self.strategy {
                ImputeStrategy::Mean => f64_values(df, name)?
                    .mean()
                    .map(ImputeValue::Numeric),
                ImputeStrategy::MostFrequent => {
                    most_frequent(&text_values(df, name)?).map(ImputeValue::Text)
                }
            }
            .ok_or_else(|| AutopriceError::ImputationError(name.clone()))?;
            self.fill_values.push((name.clone(), value));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill nulls in the fitted columns; other columns pass through.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(AutopriceError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (name, value) in &self.fill_values {
            let filled = match value {
                ImputeValue::Numeric(fill) => {
                    let ca: Float64Chunked = f64_values(df, name)?
                        .into_iter()
                        .map(|v| Some(v.unwrap_or(*fill)))
                        .collect();
                    ca.with_name(name.as_str().into()).into_series()
                }
                ImputeValue::Text(fill) => {
                    let ca: StringChunked = text_values(df, name)?
                        .into_iter()
                        .map(|v| Some(v.unwrap_or(fill.as_str()).to_string()))
                        .collect();
                    ca.with_name(name.as_str().into()).into_series()
                }
            };
            result.with_column(filled)?;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_imputation() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[Some(1i64), None, Some(3), Some(4)]),
        ])
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        let result = imputer.fit_transform(&df, &["a".to_string()]).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        assert!((col.get(1).unwrap() - 8.0 / 3.0).abs() < 1e-12);
        assert_eq!(col.null_count(), 0);
    }

    #[test]
    fn test_most_frequent_casts_booleans() {
        let df = DataFrame::new(vec![
            Column::new("flag".into(), &[Some(true), None, Some(true), Some(false)]),
        ])
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let result = imputer.fit_transform(&df, &["flag".to_string()]).unwrap();

        let col = result.column("flag").unwrap().str().unwrap();
        assert_eq!(col.get(1), Some("true"));
        assert_eq!(col.get(3), Some("false"));
    }

    #[test]
    fn test_fill_values_frozen_after_fit() {
        let train = df! { "a" => [Some(2.0), Some(4.0), None] }.unwrap();
        let test = df! { "a" => [None::<f64>, Some(100.0)] }.unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        imputer.fit(&train, &["a".to_string()]).unwrap();
        let out = imputer.transform(&test).unwrap();
        assert_eq!(out.column("a").unwrap().f64().unwrap().get(0), Some(3.0));
    }

    #[test]
    fn test_unfitted_and_missing_column() {
        let df = df! { "a" => [1.0] }.unwrap();
        let imputer = Imputer::new(ImputeStrategy::Mean);
        assert!(matches!(imputer.transform(&df), Err(AutopriceError::ModelNotFitted)));

        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        imputer.fit(&df, &["a".to_string()]).unwrap();
        let other = df! { "b" => [1.0] }.unwrap();
        assert!(matches!(imputer.transform(&other), Err(AutopriceError::SchemaError(_))));
    }

    #[test]
    fn test_all_null_column_fails() {
        let df = df! { "a" => [None::<f64>, None] }.unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        assert!(matches!(
            imputer.fit(&df, &["a".to_string()]),
            Err(AutopriceError::ImputationError(_))
        ));
    }
}
