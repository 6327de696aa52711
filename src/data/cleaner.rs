//! Advert cleansing: outlier trimming, year filtering and categorical imputation

use super::{
    f64_values, most_frequent, require_columns, text_values, BODY_TYPE, FUEL_TYPE, MILEAGE, PRICE,
    STANDARD_COLOUR, YEAR_OF_REGISTRATION,
};
use crate::error::{AutopriceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cleansing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerConfig {
    /// Columns trimmed with the upper IQR fence, in order
    pub outlier_columns: Vec<String>,
    /// Fence multiplier on the inter-quartile range
    pub whisker: f64,
    /// Rows must have a registration year strictly after this
    pub min_year: i64,
    /// Text columns whose nulls are replaced by the column mode
    pub impute_columns: Vec<String>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            outlier_columns: vec![MILEAGE.to_string(), PRICE.to_string()],
            whisker: 1.5,
            min_year: 1975,
            impute_columns: vec![
                FUEL_TYPE.to_string(),
                BODY_TYPE.to_string(),
                STANDARD_COLOUR.to_string(),
            ],
        }
    }
}

impl CleanerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_whisker(mut self, whisker: f64) -> Self {
        self.whisker = whisker;
        self
    }

    pub fn with_min_year(mut self, year: i64) -> Self {
        self.min_year = year;
        self
    }
}

/// Applies the cleansing steps to a raw advert frame
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    config: CleanerConfig,
}

impl Cleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Trim outliers, drop pre-cutoff or unregistered vehicles, impute categoricals.
    pub fn clean(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut required: Vec<&str> = self.config.outlier_columns.iter().map(String::as_str).collect();
        required.push(YEAR_OF_REGISTRATION);
        required.extend(self.config.impute_columns.iter().map(String::as_str));
        require_columns(df, &required)?;

        let rows_in = df.height();
        let mut out = df.clone();
        for column in &self.config.outlier_columns {
            out = self.remove_outliers(&out, column)?;
        }
        out = self.filter_years(&out)?;
        if out.height() > 0 {
            out = self.impute_modes(&out)?;
        }

        info!(rows_in, rows_out = out.height(), "Cleaned advert data");
        Ok(out)
    }

    /// Keep rows at or below the upper fence; missing values never pass.
    fn remove_outliers(&self, df: &DataFrame, column: &str) -> Result<DataFrame> {
        let values = f64_values(df, column)?;
        let mask: Vec<bool> = match iqr_upper_fence(&values, self.config.whisker)? {
            Some(fence) => {
                debug!(column, fence, "Upper IQR fence");
                values.into_iter().map(|v| v.is_some_and(|x| x <= fence)).collect()
            }
            None => vec![false; df.height()],
        };
        Ok(df.filter(&BooleanChunked::from_slice("mask".into(), &mask))?)
    }

    fn filter_years(&self, df: &DataFrame) -> Result<DataFrame> {
        let years = f64_values(df, YEAR_OF_REGISTRATION)?;
        let cutoff = self.config.min_year as f64;
        let mask: Vec<bool> = years.into_iter().map(|v| v.is_some_and(|y| y > cutoff)).collect();
        Ok(df.filter(&BooleanChunked::from_slice("mask".into(), &mask))?)
    }

    fn impute_modes(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        for column in &self.config.impute_columns {
            let values = text_values(&out, column)?;
            if values.null_count() == 0 {
                continue;
            }
            let mode = most_frequent(&values)
                .ok_or_else(|| AutopriceError::ImputationError(column.clone()))?;
            debug!(column = column.as_str(), mode = mode.as_str(), nulls = values.null_count(), "Imputing mode");

            let filled: StringChunked = values
                .into_iter()
                .map(|v| Some(v.unwrap_or(mode.as_str()).to_string()))
                .collect();
            out.with_column(filled.with_name(column.as_str().into()).into_series())?;
        }
        Ok(out)
    }
}

/// `Q3 + whisker * (Q3 - Q1)` over the non-null values, linear quantiles.
/// `None` when the column has no observed value.
pub fn iqr_upper_fence(values: &Float64Chunked, whisker: f64) -> Result<Option<f64>> {
    let q1 = values.quantile(0.25, QuantileMethod::Linear)?;
    let q3 = values.quantile(0.75, QuantileMethod::Linear)?;
    Ok(match (q1, q3) {
        (Some(q1), Some(q3)) => Some(q3 + whisker * (q3 - q1)),
        _ => None,
    })
}

/// Clean with the default configuration.
pub fn clean(df: &DataFrame) -> Result<DataFrame> {
    Cleaner::default().clean(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df! {
            MILEAGE => [Some(10_000.0), Some(20_000.0), Some(30_000.0), Some(40_000.0), Some(1_000_000.0), None],
            PRICE => [5_000.0, 6_000.0, 7_000.0, 8_000.0, 9_000.0, 10_000.0],
            YEAR_OF_REGISTRATION => [Some(2015i64), Some(2016), Some(2017), Some(2018), Some(2019), Some(2020)],
            FUEL_TYPE => [None, Some("Petrol"), Some("Diesel"), Some("Petrol"), Some("Diesel"), Some("Petrol")],
            BODY_TYPE => ["SUV", "SUV", "Hatchback", "Saloon", "SUV", "Estate"],
            STANDARD_COLOUR => ["Black", "White", "Black", "Red", "Grey", "Blue"],
        }
        .unwrap()
    }

    #[test]
    fn test_fence_linear_quantiles() {
        let values = Float64Chunked::from_vec("v".into(), vec![1.0, 2.0, 3.0, 4.0]);
        // Q1 = 1.75, Q3 = 3.25
        let fence = iqr_upper_fence(&values, 1.5).unwrap().unwrap();
        assert!((fence - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_clean_drops_outlier_and_missing_mileage() {
        let cleaned = clean(&frame()).unwrap();
        assert_eq!(cleaned.height(), 4);

        let mileage = cleaned.column(MILEAGE).unwrap().f64().unwrap();
        assert!(mileage.into_iter().all(|m| m.is_some_and(|m| m < 1_000_000.0)));
    }

    #[test]
    fn test_clean_imputes_mode() {
        let cleaned = clean(&frame()).unwrap();
        let fuel = cleaned.column(FUEL_TYPE).unwrap().str().unwrap();
        assert_eq!(fuel.null_count(), 0);
        // Petrol appears twice among the surviving rows, Diesel once
        assert_eq!(fuel.get(0), Some("Petrol"));
    }

    #[test]
    fn test_clean_year_filter_drops_missing_and_old() {
        let df = df! {
            MILEAGE => [1.0, 2.0, 3.0, 4.0],
            PRICE => [1.0, 2.0, 3.0, 4.0],
            YEAR_OF_REGISTRATION => [Some(1975i64), Some(1976), None, Some(2010)],
            FUEL_TYPE => ["Petrol"; 4],
            BODY_TYPE => ["SUV"; 4],
            STANDARD_COLOUR => ["Black"; 4],
        }
        .unwrap();

        let cleaned = clean(&df).unwrap();
        let years = cleaned.column(YEAR_OF_REGISTRATION).unwrap().i64().unwrap();
        let kept: Vec<i64> = years.into_iter().flatten().collect();
        assert_eq!(kept, vec![1976, 2010]);
    }

    #[test]
    fn test_clean_missing_column_is_schema_error() {
        let df = frame().drop(PRICE).unwrap();
        assert!(matches!(clean(&df), Err(AutopriceError::SchemaError(c)) if c == PRICE));
    }

    #[test]
    fn test_clean_all_null_category_fails() {
        let df = df! {
            MILEAGE => [1.0, 2.0],
            PRICE => [1.0, 2.0],
            YEAR_OF_REGISTRATION => [2010i64, 2011],
            FUEL_TYPE => ["Petrol", "Diesel"],
            BODY_TYPE => [None::<&str>, None],
            STANDARD_COLOUR => ["Black", "Red"],
        }
        .unwrap();

        assert!(matches!(clean(&df), Err(AutopriceError::ImputationError(c)) if c == BODY_TYPE));
    }
}
