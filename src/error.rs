//! Error types for autoprice

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for autoprice operations
pub type Result<T> = std::result::Result<T, AutopriceError>;

/// Main error type for the pricing pipeline
#[derive(Error, Debug)]
pub enum AutopriceError {
    #[error("Schema error: required column '{0}' is missing")]
    SchemaError(String),

    #[error("Imputation error: column '{0}' has no observed values")]
    ImputationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Artifact error: {0}")]
    ArtifactError(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for AutopriceError {
    fn from(err: polars::error::PolarsError) -> Self {
        AutopriceError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for AutopriceError {
    fn from(err: serde_json::Error) -> Self {
        AutopriceError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AutopriceError {
    fn from(err: ndarray::ShapeError) -> Self {
        AutopriceError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutopriceError::SchemaError("price".to_string());
        assert_eq!(err.to_string(), "Schema error: required column 'price' is missing");

        let err = AutopriceError::FileNotFound(PathBuf::from("data/Adverts.csv"));
        assert_eq!(err.to_string(), "File not found: data/Adverts.csv");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AutopriceError = io_err.into();
        assert!(matches!(err, AutopriceError::IoError(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AutopriceError = json_err.into();
        assert!(matches!(err, AutopriceError::SerializationError(_)));
    }
}
