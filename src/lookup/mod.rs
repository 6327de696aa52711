//! Make and model vocabulary for the pricing form

use crate::data::{load_raw, text_values, STANDARD_MAKE, STANDARD_MODEL};
use crate::error::Result;
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::info;

/// Distinct (make, model) pairs, sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    models_by_make: BTreeMap<String, BTreeSet<String>>,
}

impl LookupTable {
    /// Read `standard_make`/`standard_model` from a CSV. Rows missing
    /// either value are skipped.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let table = Self::from_frame(&load_raw(path)?)?;
        info!(path = %path.display(), makes = table.models_by_make.len(), "Loaded make/model lookup");
        Ok(table)
    }

    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let makes = text_values(df, STANDARD_MAKE)?;
        let models = text_values(df, STANDARD_MODEL)?;

        let mut models_by_make: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (make, model) in makes.into_iter().zip(models.into_iter()) {
            if let (Some(make), Some(model)) = (make, model) {
                models_by_make
                    .entry(make.to_string())
                    .or_default()
                    .insert(model.to_string());
            }
        }
        Ok(Self { models_by_make })
    }

    pub fn list_makes(&self) -> Vec<String> {
        self.models_by_make.keys().cloned().collect()
    }

    /// Models for `make`; empty when the make is unknown.
    pub fn list_models(&self, make: &str) -> Vec<String> {
        self.models_by_make
            .get(make)
            .map(|models| models.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, make: &str, model: &str) -> bool {
        self.models_by_make.get(make).is_some_and(|m| m.contains(model))
    }
}

/// Lookup table loaded on first use and kept for the life of the process
#[derive(Debug)]
pub struct LookupCache {
    path: PathBuf,
    table: OnceLock<Arc<LookupTable>>,
}

impl LookupCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Result<Arc<LookupTable>> {
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }
        let loaded = Arc::new(LookupTable::from_csv(&self.path)?);
        Ok(Arc::clone(self.table.get_or_init(|| loaded)))
    }

    pub fn list_makes(&self) -> Result<Vec<String>> {
        Ok(self.get()?.list_makes())
    }

    pub fn list_models(&self, make: &str) -> Result<Vec<String>> {
        Ok(self.get()?.list_models(make))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutopriceError;
    use polars::prelude::*;

    fn table() -> LookupTable {
        let df = df! {
            STANDARD_MAKE => [Some("Ford"), Some("BMW"), Some("Ford"), Some("Ford"), None, Some("Audi")],
            STANDARD_MODEL => [Some("Focus"), Some("X5"), Some("Fiesta"), Some("Focus"), Some("A3"), None],
        }
        .unwrap();
        LookupTable::from_frame(&df).unwrap()
    }

    #[test]
    fn test_makes_sorted_distinct() {
        // Audi only appears with a null model
        assert_eq!(table().list_makes(), vec!["BMW", "Ford"]);
    }

    #[test]
    fn test_models_for_make() {
        let t = table();
        assert_eq!(t.list_models("Ford"), vec!["Fiesta", "Focus"]);
        assert!(t.list_models("Zzzbrand").is_empty());
        assert!(t.contains("BMW", "X5"));
        assert!(!t.contains("BMW", "Focus"));
    }

    #[test]
    fn test_missing_column() {
        let df = df! { STANDARD_MAKE => ["Ford"] }.unwrap();
        assert!(matches!(LookupTable::from_frame(&df), Err(AutopriceError::SchemaError(_))));
    }

    #[test]
    fn test_cache_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("makes_models.csv");
        std::fs::write(&path, "standard_make,standard_model\nKia,Ceed\nKia,Picanto\nFord,Ka\n").unwrap();

        let cache = LookupCache::new(&path);
        assert_eq!(cache.list_makes().unwrap(), vec!["Ford", "Kia"]);

        // Later file changes are not seen
        std::fs::write(&path, "standard_make,standard_model\nSeat,Ibiza\n").unwrap();
        assert_eq!(cache.list_models("Kia").unwrap(), vec!["Ceed", "Picanto"]);
    }
}
