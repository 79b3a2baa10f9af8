//! Metrics for evaluating the regressor on held-out rows

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Diagnostic accuracy of the model on the test slice.
///
/// These never gate the pipeline; a poor fit still produces a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Coefficient of determination
    pub r2: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
}

impl ModelMetrics {
    /// Placeholder reported when there are no test rows to score
    pub fn zeroed() -> Self {
        Self {
            r2: 0.0,
            rmse: 0.0,
            mae: 0.0,
        }
    }
}

/// Score `predicted` against `actual`
pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> Result<ModelMetrics> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::DataError(
            "Actual and predicted values must have the same non-zero length".to_string(),
        ));
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted.iter())
        .map(|(&a, &p)| a - p)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let ss_res = errors.iter().map(|e| e.powi(2)).sum::<f64>();
    let rmse = (ss_res / n).sqrt();

    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot = actual.iter().map(|&a| (a - mean).powi(2)).sum::<f64>();

    // constant target: perfect fit scores 1, anything else 0
    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(ModelMetrics { r2, rmse, mae })
}

impl std::fmt::Display for ModelMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Model Performance Metrics:")?;
        writeln!(f, "  R2:    {:.4}", self.r2)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        Ok(())
    }
}
