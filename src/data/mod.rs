//! Advert data loading and row-level utilities
//!
//! The raw advert export is read into a polars [`DataFrame`]. Everything
//! downstream addresses columns by name, so the header spelling in the CSV
//! is a load-time contract.

pub mod cleaner;

pub use cleaner::{clean, iqr_upper_fence, Cleaner, CleanerConfig};

use crate::error::{AutopriceError, Result};
use ndarray::{Array1, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const PUBLIC_REFERENCE: &str = "public_reference";
pub const MILEAGE: &str = "mileage";
pub const REG_CODE: &str = "reg_code";
pub const STANDARD_COLOUR: &str = "standard_colour";
pub const STANDARD_MAKE: &str = "standard_make";
pub const STANDARD_MODEL: &str = "standard_model";
pub const VEHICLE_CONDITION: &str = "vehicle_condition";
pub const YEAR_OF_REGISTRATION: &str = "year_of_registration";
pub const PRICE: &str = "price";
pub const BODY_TYPE: &str = "body_type";
pub const CROSSOVER: &str = "crossover_car_and_van";
pub const FUEL_TYPE: &str = "fuel_type";

/// Load the raw advert CSV.
///
/// A text-typed `crossover_car_and_van` column (`True`/`False`) is
/// normalised to booleans so it matches what the pricing form submits.
pub fn load_raw(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AutopriceError::FileNotFound(path.to_path_buf()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    info!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded advert data");
    normalize_flags(df)
}

/// Cast a text boolean crossover column to `Boolean`; other dtypes pass through.
pub fn normalize_flags(mut df: DataFrame) -> Result<DataFrame> {
    let Ok(col) = df.column(CROSSOVER) else {
        return Ok(df);
    };
    if col.dtype() != &DataType::String {
        return Ok(df);
    }

    let flags: BooleanChunked = col
        .str()?
        .into_iter()
        .map(|v| match v.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "true" => Some(true),
            Some(s) if s == "false" => Some(false),
            _ => None,
        })
        .collect();

    df.with_column(flags.with_name(CROSSOVER.into()).into_series())?;
    Ok(df)
}

/// Draw `n` rows without replacement (all rows when `n` exceeds the height).
pub fn sample_rows(df: &DataFrame, n: usize, seed: u64) -> Result<DataFrame> {
    let mut indices: Vec<usize> = (0..df.height()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices.truncate(n.min(df.height()));
    debug!(requested = n, sampled = indices.len(), "Sampled rows");
    take_rows(df, &indices)
}

/// Select rows by position, in the given order.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

/// Row subset of a feature frame and its aligned target.
pub fn subset(x: &DataFrame, y: &Array1<f64>, indices: &[usize]) -> Result<(DataFrame, Array1<f64>)> {
    if x.height() != y.len() {
        return Err(AutopriceError::ShapeError {
            expected: format!("{} targets", x.height()),
            actual: format!("{} targets", y.len()),
        });
    }
    Ok((take_rows(x, indices)?, y.select(Axis(0), indices)))
}

/// Shuffled train/test split of `n_rows` positions.
///
/// The test part holds `ceil(test_size * n_rows)` rows. Returns
/// `(train, test)` index lists.
pub fn train_test_split(n_rows: usize, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(AutopriceError::ConfigurationError(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let n_test = (test_size * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(AutopriceError::ValidationError(format!(
            "cannot split {n_rows} rows with test_size {test_size}"
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// Column values as `Float64`, nulls preserved.
pub(crate) fn f64_values(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let col = df
        .column(name)
        .map_err(|_| AutopriceError::SchemaError(name.to_string()))?;
    let series = col.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

/// Column values as text, nulls preserved. Booleans render as `true`/`false`.
pub(crate) fn text_values(df: &DataFrame, name: &str) -> Result<StringChunked> {
    let col = df
        .column(name)
        .map_err(|_| AutopriceError::SchemaError(name.to_string()))?;
    let series = col.as_materialized_series().cast(&DataType::String)?;
    Ok(series.str()?.clone())
}

/// Most frequent non-null value; ties go to the value seen first.
pub(crate) fn most_frequent(values: &StringChunked) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, v) in values.into_iter().enumerate() {
        if let Some(v) = v {
            counts.entry(v).or_insert((0, pos)).0 += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (ca, pa)), (_, (cb, pb))| ca.cmp(cb).then(pb.cmp(pa)))
        .map(|(v, _)| v.to_string())
}

/// Ensure every named column exists.
pub(crate) fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    for name in columns {
        if df.column(name).is_err() {
            return Err(AutopriceError::SchemaError(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_frequent_prefers_first_seen_on_tie() {
        let ca = StringChunked::from_iter_options(
            "c".into(),
            [Some("Blue"), None, Some("Red"), Some("Red"), Some("Blue")].into_iter(),
        );
        assert_eq!(most_frequent(&ca).as_deref(), Some("Blue"));

        let empty = StringChunked::from_iter_options("c".into(), [None::<&str>, None].into_iter());
        assert!(most_frequent(&empty).is_none());
    }

    #[test]
    fn test_train_test_split_sizes() {
        let (train, test) = train_test_split(10, 0.3, 42).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        // Same seed, same partition
        let (train2, test2) = train_test_split(10, 0.3, 42).unwrap();
        assert_eq!(train, train2);
        assert_eq!(test, test2);
    }

    #[test]
    fn test_train_test_split_rejects_bad_ratio() {
        assert!(matches!(
            train_test_split(10, 1.5, 42),
            Err(AutopriceError::ConfigurationError(_))
        ));
        assert!(train_test_split(1, 0.3, 42).is_err());
    }

    #[test]
    fn test_normalize_flags() {
        let df = df! {
            CROSSOVER => ["True", "false", "FALSE", ""],
        }
        .unwrap();

        let df = normalize_flags(df).unwrap();
        let flags = df.column(CROSSOVER).unwrap().bool().unwrap();
        assert_eq!(flags.get(0), Some(true));
        assert_eq!(flags.get(1), Some(false));
        assert_eq!(flags.get(2), Some(false));
        assert_eq!(flags.get(3), None);
    }

    #[test]
    fn test_sample_rows_caps_at_height() {
        let df = df! { "a" => [1i64, 2, 3, 4, 5] }.unwrap();
        assert_eq!(sample_rows(&df, 3, 42).unwrap().height(), 3);
        assert_eq!(sample_rows(&df, 60_000, 42).unwrap().height(), 5);
    }

    #[test]
    fn test_load_raw_missing_file() {
        let err = load_raw("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, AutopriceError::FileNotFound(_)));
    }
}
