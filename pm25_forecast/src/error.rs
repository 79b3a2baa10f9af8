//! Error types for the pm25_forecast crate

use air_math::MathError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the pm25_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A caller-supplied argument was empty or out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Feature building left nothing to train on
    #[error("No trainable data: {0}")]
    NoTrainableData(String),

    /// A feature vector did not follow the model's column schema
    #[error("Feature schema mismatch: expected {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Error raised while fitting or querying a model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error from invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from numeric helpers
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV serialization
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
