//! Single-shot long-horizon extrapolation
//!
//! The feature row for the target date freezes the recent lag and rolling
//! statistics at their last known values instead of simulating the series
//! forward day by day. A linear trend over the recent window is reported
//! alongside the model's point estimate but never feeds into it; the two
//! can disagree.

use crate::config::{PipelineConfig, DEFAULT_HORIZON_DAYS, DEFAULT_RECENT_WINDOW};
use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::features::{CalendarFeatures, FeatureRow, WindowFeatures, LONG_WINDOW, SHORT_WINDOW};
use crate::models::{FittedRegressor, TrainedModel};
use crate::utils::round_to;
use air_math::linear_fit;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// z-score of a two-sided 95% normal interval
pub const CONFIDENCE_Z: f64 = 1.96;

/// PM2.5 forecast for the end of the horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pm25Forecast {
    /// Mean of the recent window
    pub current_avg_pm25: f64,
    pub predicted_pm25_5y: f64,
    pub prediction_date: NaiveDate,
    /// Date of the last observation
    pub current_date: NaiveDate,
    /// Recent linear slope scaled to a year
    pub annual_trend: f64,
    pub five_year_trend: f64,
    pub location: String,
    pub confidence_interval_low: f64,
    pub confidence_interval_high: f64,
}

impl Pm25Forecast {
    pub fn confidence_interval(&self) -> (f64, f64) {
        (self.confidence_interval_low, self.confidence_interval_high)
    }

    /// Copy with every concentration rounded to 2 decimals for display
    pub fn rounded(&self) -> Self {
        Self {
            current_avg_pm25: round_to(self.current_avg_pm25, 2),
            predicted_pm25_5y: round_to(self.predicted_pm25_5y, 2),
            annual_trend: round_to(self.annual_trend, 2),
            five_year_trend: round_to(self.five_year_trend, 2),
            confidence_interval_low: round_to(self.confidence_interval_low, 2),
            confidence_interval_high: round_to(self.confidence_interval_high, 2),
            ..self.clone()
        }
    }
}

/// Builds the future feature row and turns a model prediction into a
/// [`Pm25Forecast`]
#[derive(Debug, Clone)]
pub struct Extrapolator {
    recent_window: usize,
    horizon_days: i64,
}

impl Default for Extrapolator {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl Extrapolator {
    pub fn new(recent_window: usize, horizon_days: i64) -> Result<Self> {
        if recent_window == 0 || horizon_days <= 0 {
            return Err(ForecastError::InvalidInput(format!(
                "recent_window ({}) and horizon_days ({}) must be positive",
                recent_window, horizon_days
            )));
        }
        Ok(Self {
            recent_window,
            horizon_days,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.recent_window, config.horizon_days)
    }

    /// Horizon expressed in 365-day years
    pub fn horizon_years(&self) -> f64 {
        self.horizon_days as f64 / 365.0
    }

    /// Feature row for `last observation + horizon`.
    ///
    /// Lag-1 is the latest observation; lag-7, lag-30 and both rolling
    /// means are means of the last 7/30 recent observations; rolling std is
    /// the sample std of the last 7 (zero when undefined).
    pub fn future_row(&self, series: &HistoricalSeries) -> Result<FeatureRow> {
        let (first, last) = match (series.first_timestamp(), series.last_timestamp()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(ForecastError::DataError(
                    "cannot extrapolate from an empty series".to_string(),
                ))
            }
        };

        let recent: Vec<f64> = series
            .tail(self.recent_window)
            .iter()
            .map(|o| o.concentration)
            .collect();
        let last_value = recent[recent.len() - 1];
        let short = tail(&recent, SHORT_WINDOW);
        let long = tail(&recent, LONG_WINDOW);

        let future = last + Duration::days(self.horizon_days);
        let short_mean = short.iter().mean();
        let long_mean = long.iter().mean();

        Ok(FeatureRow {
            timestamp: future,
            target: recent.iter().mean(),
            calendar: CalendarFeatures::from_timestamp(&future),
            window: WindowFeatures {
                lag_1: last_value,
                lag_7: short_mean,
                lag_30: long_mean,
                rolling_mean_7: short_mean,
                rolling_mean_30: long_mean,
                rolling_std_7: defined_or_zero(short.iter().std_dev()),
            },
            days_since_start: (future - first).num_days(),
        })
    }

    /// Predict the concentration at the horizon and derive trend context
    /// and a normal-approximation confidence band
    pub fn extrapolate<F: FittedRegressor>(
        &self,
        model: &TrainedModel<F>,
        series: &HistoricalSeries,
    ) -> Result<Pm25Forecast> {
        let row = self.future_row(series)?;
        let predicted = model.predict_row(&row)?;

        let recent: Vec<f64> = series
            .tail(self.recent_window)
            .iter()
            .map(|o| o.concentration)
            .collect();
        let current_avg = row.target;
        // fewer than two points: zero-width band
        let current_std = defined_or_zero(recent.iter().std_dev());

        let slope = if recent.len() >= 2 {
            linear_fit(&recent)?.slope
        } else {
            0.0
        };
        let annual_trend = slope * 365.0;

        let current_date = series
            .last_timestamp()
            .map(|ts| ts.date_naive())
            .unwrap_or_else(|| row.timestamp.date_naive());

        log::debug!(
            "Extrapolated {} days from {}: {:.2} (recent mean {:.2}, std {:.2})",
            self.horizon_days,
            current_date,
            predicted,
            current_avg,
            current_std
        );

        Ok(Pm25Forecast {
            current_avg_pm25: current_avg,
            predicted_pm25_5y: predicted,
            prediction_date: row.timestamp.date_naive(),
            current_date,
            annual_trend,
            five_year_trend: annual_trend * self.horizon_years(),
            location: series.location().to_string(),
            confidence_interval_low: predicted - CONFIDENCE_Z * current_std,
            confidence_interval_high: predicted + CONFIDENCE_Z * current_std,
        })
    }
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

fn defined_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
