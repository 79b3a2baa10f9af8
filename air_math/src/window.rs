//! Positional lags and trailing rolling statistics
//!
//! Windows are measured in rows, not calendar time: a gap in the
//! underlying series simply shifts which observations fall inside a window.
//! Rolling statistics are trailing and inclusive of the current row.

use crate::summary::sample_std_dev;
use crate::{MathError, Result};
use std::collections::VecDeque;

/// Trailing window over the most recent `period` values
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    min_periods: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingWindow {
    /// Create a window of `period` rows that yields statistics once at
    /// least `min_periods` rows have been seen
    pub fn new(period: usize, min_periods: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }
        if min_periods == 0 || min_periods > period {
            return Err(MathError::InvalidInput(format!(
                "min_periods must be in 1..={}, got {}",
                period, min_periods
            )));
        }

        Ok(Self {
            period,
            min_periods,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value, evicting the oldest one once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Mean of the rows currently in the window
    pub fn mean(&self) -> Option<f64> {
        if self.values.len() < self.min_periods {
            return None;
        }
        Some(self.sum / self.values.len() as f64)
    }

    /// Sample standard deviation of the rows currently in the window
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.len() < self.min_periods {
            return None;
        }
        let (front, back) = self.values.as_slices();
        if back.is_empty() {
            sample_std_dev(front)
        } else {
            let contiguous: Vec<f64> = self.values.iter().copied().collect();
            sample_std_dev(&contiguous)
        }
    }

    /// Number of rows currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window holds no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the configured period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the window, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Value `periods` rows earlier, `None` where no such row exists
pub fn lag(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(periods).map(|j| values[j]))
        .collect()
}

/// Trailing rolling mean for every row
pub fn rolling_mean(values: &[f64], period: usize, min_periods: usize) -> Result<Vec<Option<f64>>> {
    let mut window = RollingWindow::new(period, min_periods)?;
    Ok(values
        .iter()
        .map(|&v| {
            window.update(v);
            window.mean()
        })
        .collect())
}

/// Trailing rolling sample standard deviation for every row.
///
/// A row is `None` while fewer than `min_periods` rows (or fewer than two)
/// are available.
pub fn rolling_std(values: &[f64], period: usize, min_periods: usize) -> Result<Vec<Option<f64>>> {
    let mut window = RollingWindow::new(period, min_periods)?;
    Ok(values
        .iter()
        .map(|&v| {
            window.update(v);
            window.std_dev()
        })
        .collect())
}
