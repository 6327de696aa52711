//! Versioned on-disk model artifacts

use crate::error::{AutopriceError, Result};
use crate::feature_engineering::FeatureSchema;
use crate::training::{ModelKind, PriceModel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Bumped whenever the serialized model layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A fitted model plus what is needed to feed it at serving time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub crate_version: String,
    pub key: ModelKind,
    pub trained_at: DateTime<Utc>,
    /// Year used to derive `vehicle_age` during training
    pub current_year: i32,
    pub schema: FeatureSchema,
    pub model: PriceModel,
}

impl ModelArtifact {
    pub fn new(key: ModelKind, current_year: i32, schema: FeatureSchema, model: PriceModel) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            key,
            trained_at: Utc::now(),
            current_year,
            schema,
            model,
        }
    }

    /// Write as JSON, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!(path = %path.display(), model = %self.key, "Saved model artifact");
        Ok(())
    }

    /// Read an artifact. A missing, unreadable or foreign-version file is an `ArtifactError`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| AutopriceError::ArtifactError(format!("cannot open {}: {e}", path.display())))?;
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AutopriceError::ArtifactError(format!("{} is not valid JSON: {e}", path.display())))?;

        let version = value.get("format_version").and_then(serde_json::Value::as_u64);
        if version != Some(u64::from(ARTIFACT_FORMAT_VERSION)) {
            return Err(AutopriceError::ArtifactError(format!(
                "{} has format version {}, expected {ARTIFACT_FORMAT_VERSION}",
                path.display(),
                version.map_or_else(|| "none".to_string(), |v| v.to_string())
            )));
        }

        let artifact: Self = serde_json::from_value(value)
            .map_err(|e| AutopriceError::ArtifactError(format!("{} is corrupt: {e}", path.display())))?;
        info!(
            path = %path.display(),
            model = %artifact.key,
            trained_at = %artifact.trained_at.to_rfc3339(),
            "Loaded model artifact"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = ModelArtifact::load("does/not/exist.json").unwrap_err();
        assert!(matches!(err, AutopriceError::ArtifactError(_)));
    }

    #[test]
    fn test_corrupt_and_foreign_version() {
        let dir = tempfile::tempdir().unwrap();

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert!(matches!(ModelArtifact::load(&corrupt), Err(AutopriceError::ArtifactError(_))));

        let foreign = dir.path().join("foreign.json");
        std::fs::write(&foreign, r#"{"format_version": 99}"#).unwrap();
        let err = ModelArtifact::load(&foreign).unwrap_err();
        assert!(err.to_string().contains("format version 99"));

        let truncated = dir.path().join("truncated.json");
        std::fs::write(&truncated, r#"{"format_version": 1, "key": "gbr"}"#).unwrap();
        assert!(matches!(ModelArtifact::load(&truncated), Err(AutopriceError::ArtifactError(_))));
    }
}
