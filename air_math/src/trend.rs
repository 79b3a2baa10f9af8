//! Least-squares trend fitting over a positional index

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// First-degree fit `y = slope * x + intercept`, with `x = 0, 1, 2, ...`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Value of the fitted line at position `x`
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a straight line to `values` against their row index
pub fn linear_fit(values: &[f64]) -> Result<LinearFit> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Need at least 2 points for a linear fit, have {}",
            values.len()
        )));
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }

    if denominator.abs() < 1e-10 {
        return Err(MathError::CalculationError(
            "Cannot calculate slope: x values are too similar".to_string(),
        ));
    }

    let slope = numerator / denominator;
    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_line() {
        let fit = linear_fit(&[10.0, 20.0, 30.0]).unwrap();

        assert_relative_eq!(fit.slope, 10.0);
        assert_relative_eq!(fit.intercept, 10.0);
        assert_relative_eq!(fit.value_at(3.0), 40.0);
    }

    #[test]
    fn test_flat_series() {
        let fit = linear_fit(&[7.0; 20]).unwrap();
        assert_relative_eq!(fit.slope, 0.0);
        assert_relative_eq!(fit.intercept, 7.0);
    }

    #[test]
    fn test_noisy_slope_sign() {
        let values: Vec<f64> = (0..50)
            .map(|i| 0.5 * i as f64 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let fit = linear_fit(&values).unwrap();
        assert!((fit.slope - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_insufficient_points() {
        assert!(matches!(
            linear_fit(&[1.0]),
            Err(MathError::InsufficientData(_))
        ));
        assert!(linear_fit(&[]).is_err());
    }
}
