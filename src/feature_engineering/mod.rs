//! Derived vehicle features and the numeric/categorical feature split

use crate::data::{
    f64_values, require_columns, MILEAGE, PRICE, PUBLIC_REFERENCE, REG_CODE, YEAR_OF_REGISTRATION,
};
use crate::error::{AutopriceError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const VEHICLE_AGE: &str = "vehicle_age";
pub const MILEAGE_TO_AGE_RATIO: &str = "mileage_to_age_ratio";

/// Mileage per year of age, with ages below one year counted as one.
pub fn mileage_to_age_ratio(mileage: f64, vehicle_age: f64) -> f64 {
    mileage / vehicle_age.max(1.0)
}

/// Append `vehicle_age` and `mileage_to_age_ratio` to a copy of `df`.
pub fn add_engineered(df: &DataFrame, current_year: i32) -> Result<DataFrame> {
    require_columns(df, &[MILEAGE, YEAR_OF_REGISTRATION])?;

    let years = f64_values(df, YEAR_OF_REGISTRATION)?;
    let mileage = f64_values(df, MILEAGE)?;
    let current_year = f64::from(current_year);

    let age: Float64Chunked = years
        .into_iter()
        .map(|y| y.map(|y| current_year - y))
        .collect();
    let ratio: Float64Chunked = mileage
        .into_iter()
        .zip(age.into_iter())
        .map(|(m, a)| match (m, a) {
            (Some(m), Some(a)) => Some(mileage_to_age_ratio(m, a)),
            _ => None,
        })
        .collect();

    let mut out = df.clone();
    out.with_column(age.with_name(VEHICLE_AGE.into()).into_series())?;
    out.with_column(ratio.with_name(MILEAGE_TO_AGE_RATIO.into()).into_series())?;
    Ok(out)
}

/// Model inputs partitioned by column kind
#[derive(Debug, Clone)]
pub struct FeatureSplit {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    /// Projection of the input onto `numeric ++ categorical`
    pub x: DataFrame,
    pub y: Array1<f64>,
}

/// Column roles recorded alongside a trained model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureSplit {
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema {
            numeric: self.numeric.clone(),
            categorical: self.categorical.clone(),
        }
    }
}

/// Partition columns into numeric and categorical features and pull out the target.
///
/// Numeric columns exclude the price, identifier and raw registration year
/// (age replaces it). Categorical columns are everything else except the
/// identifier and `reg_code`. Both keep the input column order.
pub fn split_features(df: &DataFrame, target: &str) -> Result<FeatureSplit> {
    let target_col = df
        .column(target)
        .map_err(|_| AutopriceError::SchemaError(target.to_string()))?;
    let target_values = target_col.as_materialized_series().cast(&DataType::Float64)?;
    let target_values = target_values.f64()?;
    if target_values.null_count() > 0 {
        return Err(AutopriceError::DataError(format!(
            "target '{target}' has {} missing values",
            target_values.null_count()
        )));
    }
    let y: Array1<f64> = target_values.into_no_null_iter().collect();

    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    for col in df.get_columns() {
        let name = col.name().as_str();
        if name == target || name == PUBLIC_REFERENCE {
            continue;
        }
        if col.dtype().is_primitive_numeric() {
            if name != PRICE && name != YEAR_OF_REGISTRATION {
                numeric.push(name.to_string());
            }
        } else if name != REG_CODE {
            categorical.push(name.to_string());
        }
    }

    let x = df.select(numeric.iter().chain(categorical.iter()).map(String::as_str))?;
    debug!(?numeric, ?categorical, "Split features");

    Ok(FeatureSplit {
        numeric,
        categorical,
        x,
        y,
    })
}
