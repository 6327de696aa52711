//! Single-advert price estimation from a persisted model

use super::{AdvertForm, ModelArtifact};
use crate::error::{AutopriceError, Result};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// A loaded model ready to price form submissions
#[derive(Debug, Clone)]
pub struct PriceEstimator {
    artifact: ModelArtifact,
}

impl PriceEstimator {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        ModelArtifact::load(path).map(Self::new)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Project the form record onto the columns the model was trained with.
    fn features(&self, form: &AdvertForm) -> Result<DataFrame> {
        let record = form.to_record()?;
        let schema = &self.artifact.schema;
        let columns = schema.numeric.iter().chain(schema.categorical.iter());
        for name in columns.clone() {
            if record.column(name).is_err() {
                return Err(AutopriceError::SchemaError(name.clone()));
            }
        }
        Ok(record.select(columns.map(String::as_str))?)
    }

    /// Estimated price for one advert. Unseen categories fall back to the
    /// encoder prior rather than failing.
    pub fn predict(&self, form: &AdvertForm) -> Result<f64> {
        let x = self.features(form)?;
        let prediction = self
            .artifact
            .model
            .predict(&x)?
            .get(0)
            .copied()
            .ok_or_else(|| AutopriceError::ComputationError("model returned no prediction".to_string()))?;
        if !prediction.is_finite() {
            return Err(AutopriceError::ComputationError(format!(
                "model produced a non-finite price ({prediction})"
            )));
        }
        debug!(make = %form.make, model = %form.model, prediction, "Priced advert");
        Ok(prediction)
    }
}

/// Loads the serving model on first use and shares it afterwards
#[derive(Debug)]
pub struct ModelCache {
    path: PathBuf,
    estimator: OnceLock<Arc<PriceEstimator>>,
}

impl ModelCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            estimator: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.estimator.get().is_some()
    }

    /// The cached estimator, loading it if this is the first call.
    /// A failed load is not cached; the next call tries again.
    pub fn get(&self) -> Result<Arc<PriceEstimator>> {
        if let Some(estimator) = self.estimator.get() {
            return Ok(Arc::clone(estimator));
        }
        let loaded = Arc::new(PriceEstimator::load(&self.path)?);
        info!(path = %self.path.display(), "Model cached for serving");
        Ok(Arc::clone(self.estimator.get_or_init(|| loaded)))
    }
}

/// Whole pounds with thousands separators, e.g. `£12,345`.
pub fn format_price(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-£{grouped}")
    } else {
        format!("£{grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(12_345.4), "£12,345");
        assert_eq!(format_price(999.5), "£1,000");
        assert_eq!(format_price(0.0), "£0");
        assert_eq!(format_price(1_234_567.0), "£1,234,567");
        assert_eq!(format_price(-1_500.0), "-£1,500");
    }

    #[test]
    fn test_cache_reports_missing_artifact() {
        let cache = ModelCache::new("models/missing.json");
        assert!(matches!(cache.get(), Err(AutopriceError::ArtifactError(_))));
        assert!(!cache.is_loaded());
    }
}
