//! # Air Math
//!
//! Numeric building blocks for pollutant time series.
//! This crate provides positional lags, trailing rolling statistics with a
//! minimum-period policy, and least-squares trend fitting.

use thiserror::Error;

pub mod summary;
pub mod trend;
pub mod window;

pub use summary::{mean, sample_std_dev};
pub use trend::{linear_fit, LinearFit};
pub use window::{lag, rolling_mean, rolling_std, RollingWindow};

/// Errors that can occur in series calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
