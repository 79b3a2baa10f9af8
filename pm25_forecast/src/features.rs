//! Feature engineering for the PM2.5 regressor
//!
//! Each observation becomes one [`FeatureRow`]: calendar fields and their
//! cyclical encodings, positional lags, trailing rolling statistics and the
//! day offset from the start of the series. Lags and windows count rows, not
//! calendar days. Rows with any undefined field are dropped, which removes
//! exactly the first [`MAX_LAG`] rows of the series.

use crate::data::Observation;
use crate::error::{ForecastError, Result};
use air_math::{lag, rolling_mean, rolling_std};
use chrono::{DateTime, Datelike, Utc};
use polars::prelude::*;
use serde::Serialize;
use std::f64::consts::PI;
use std::fs::File;
use std::path::Path;

/// Ordered feature columns every model is trained and queried with
pub const FEATURE_COLUMNS: [&str; 16] = [
    "year",
    "month",
    "day_of_year",
    "day_of_week",
    "week_of_year",
    "month_sin",
    "month_cos",
    "day_sin",
    "day_cos",
    "pm25_lag_1",
    "pm25_lag_7",
    "pm25_lag_30",
    "pm25_rolling_7",
    "pm25_rolling_30",
    "pm25_rolling_std_7",
    "days_since_start",
];

/// Name of the target column in exported tables
pub const TARGET_COLUMN: &str = "pm25_value";

pub const SHORT_WINDOW: usize = 7;
pub const LONG_WINDOW: usize = 30;
/// Longest lag; rows before it have no complete feature set
pub const MAX_LAG: usize = 30;

/// Ordered list of feature names bound to a trained model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema(Vec<String>);

impl Default for FeatureSchema {
    fn default() -> Self {
        Self(FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect())
    }
}

impl FeatureSchema {
    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Feature values tagged with the column names they were built for
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

/// Calendar fields derived from a timestamp alone
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month: u32,
    pub day_of_year: u32,
    /// Monday = 0
    pub day_of_week: u32,
    /// ISO 8601 week number
    pub week_of_year: u32,
    pub month_sin: f64,
    pub month_cos: f64,
    pub day_sin: f64,
    pub day_cos: f64,
}

impl CalendarFeatures {
    pub fn from_timestamp(ts: &DateTime<Utc>) -> Self {
        let month = ts.month();
        let day_of_year = ts.ordinal();
        let month_angle = 2.0 * PI * month as f64 / 12.0;
        let day_angle = 2.0 * PI * day_of_year as f64 / 365.0;

        Self {
            year: ts.year(),
            month,
            day_of_year,
            day_of_week: ts.weekday().num_days_from_monday(),
            week_of_year: ts.iso_week().week(),
            month_sin: month_angle.sin(),
            month_cos: month_angle.cos(),
            day_sin: day_angle.sin(),
            day_cos: day_angle.cos(),
        }
    }
}

/// Lag and rolling-window statistics over preceding rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowFeatures {
    pub lag_1: f64,
    pub lag_7: f64,
    pub lag_30: f64,
    pub rolling_mean_7: f64,
    pub rolling_mean_30: f64,
    pub rolling_std_7: f64,
}

/// One fully-defined training or prediction row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    /// Concentration the row describes (the regression target)
    pub target: f64,
    pub calendar: CalendarFeatures,
    pub window: WindowFeatures,
    pub days_since_start: i64,
}

impl FeatureRow {
    /// Feature values in [`FEATURE_COLUMNS`] order
    pub fn values(&self) -> [f64; 16] {
        let c = &self.calendar;
        let w = &self.window;
        [
            f64::from(c.year),
            f64::from(c.month),
            f64::from(c.day_of_year),
            f64::from(c.day_of_week),
            f64::from(c.week_of_year),
            c.month_sin,
            c.month_cos,
            c.day_sin,
            c.day_cos,
            w.lag_1,
            w.lag_7,
            w.lag_30,
            w.rolling_mean_7,
            w.rolling_mean_30,
            w.rolling_std_7,
            self.days_since_start as f64,
        ]
    }

    pub fn to_feature_vector(&self) -> FeatureVector {
        FeatureVector {
            columns: FeatureSchema::default().0,
            values: self.values().to_vec(),
        }
    }
}

/// Feature rows for one series, in chronological order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: FeatureSchema,
    rows: Vec<FeatureRow>,
    dropped: usize,
}

impl FeatureTable {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Rows removed for lacking a complete feature set
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature matrix, one `Vec` per row
    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.values().to_vec()).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.target).collect()
    }

    /// Export as a polars DataFrame: timestamp, target, then every feature
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.schema.len() + 2);
        columns.push(Series::new(
            "timestamp",
            self.rows
                .iter()
                .map(|r| r.timestamp.to_rfc3339())
                .collect::<Vec<String>>(),
        ));
        columns.push(Series::new(TARGET_COLUMN, self.targets()));

        let matrix = self.matrix();
        for (idx, name) in self.schema.columns().iter().enumerate() {
            let values: Vec<f64> = matrix.iter().map(|row| row[idx]).collect();
            columns.push(Series::new(name.as_str(), values));
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Write the table to a CSV file
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
        Ok(())
    }
}

/// Builds feature tables from chronologically sorted observations
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the feature table for `observations`.
    ///
    /// Fails if the observations are not sorted ascending by timestamp.
    pub fn build(&self, observations: &[Observation]) -> Result<FeatureTable> {
        if let Some(pos) = observations
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(ForecastError::DataError(format!(
                "Observations must be sorted by timestamp (row {} precedes row {})",
                pos + 1,
                pos
            )));
        }

        let values: Vec<f64> = observations.iter().map(|o| o.concentration).collect();
        let lag_1 = lag(&values, 1);
        let lag_7 = lag(&values, 7);
        let lag_30 = lag(&values, MAX_LAG);
        let rolling_7 = rolling_mean(&values, SHORT_WINDOW, 1)?;
        let rolling_30 = rolling_mean(&values, LONG_WINDOW, 1)?;
        let rolling_std_7 = rolling_std(&values, SHORT_WINDOW, 1)?;

        let Some(first) = observations.first().map(|o| o.timestamp) else {
            return Ok(FeatureTable {
                schema: FeatureSchema::default(),
                rows: Vec::new(),
                dropped: 0,
            });
        };

        let mut rows = Vec::with_capacity(observations.len().saturating_sub(MAX_LAG));
        for (i, obs) in observations.iter().enumerate() {
            let window = match (
                lag_1[i],
                lag_7[i],
                lag_30[i],
                rolling_7[i],
                rolling_30[i],
                rolling_std_7[i],
            ) {
                (Some(l1), Some(l7), Some(l30), Some(r7), Some(r30), Some(s7)) => WindowFeatures {
                    lag_1: l1,
                    lag_7: l7,
                    lag_30: l30,
                    rolling_mean_7: r7,
                    rolling_mean_30: r30,
                    rolling_std_7: s7,
                },
                _ => continue,
            };

            rows.push(FeatureRow {
                timestamp: obs.timestamp,
                target: obs.concentration,
                calendar: CalendarFeatures::from_timestamp(&obs.timestamp),
                window,
                days_since_start: (obs.timestamp - first).num_days(),
            });
        }

        let dropped = observations.len() - rows.len();
        log::debug!(
            "Built {} feature rows ({} dropped for incomplete history)",
            rows.len(),
            dropped
        );

        Ok(FeatureTable {
            schema: FeatureSchema::default(),
            rows,
            dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn daily(values: &[f64]) -> Vec<Observation> {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation::new(start + Duration::days(i as i64), v, "Testville"))
            .collect()
    }

    #[test]
    fn test_calendar_fields() {
        // Sunday, ISO week 52 of 2022
        let ts = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let cal = CalendarFeatures::from_timestamp(&ts);

        assert_eq!(cal.year, 2023);
        assert_eq!(cal.month, 1);
        assert_eq!(cal.day_of_year, 1);
        assert_eq!(cal.day_of_week, 6);
        assert_eq!(cal.week_of_year, 52);
        assert!((cal.month_sin - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_first_complete_row() {
        let values: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let table = FeatureBuilder::new().build(&daily(&values)).unwrap();

        assert_eq!(table.len(), 10);
        assert_eq!(table.dropped(), 30);

        let row = &table.rows()[0];
        assert_eq!(row.target, 30.0);
        assert_eq!(row.window.lag_1, 29.0);
        assert_eq!(row.window.lag_7, 23.0);
        assert_eq!(row.window.lag_30, 0.0);
        // mean of 24..=30
        assert_eq!(row.window.rolling_mean_7, 27.0);
        // mean of 1..=30
        assert_eq!(row.window.rolling_mean_30, 15.5);
        assert_eq!(row.days_since_start, 30);
    }

    #[test]
    fn test_unsorted_input_rejected() {
        let mut obs = daily(&[1.0, 2.0, 3.0]);
        obs.swap(0, 2);
        assert!(matches!(
            FeatureBuilder::new().build(&obs),
            Err(ForecastError::DataError(_))
        ));
    }

    #[test]
    fn test_short_series_yields_no_rows() {
        let table = FeatureBuilder::new().build(&daily(&[10.0; 30])).unwrap();
        assert!(table.is_empty());

        let table = FeatureBuilder::new().build(&[]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_values_follow_schema_order() {
        let values: Vec<f64> = (0..35).map(|i| 10.0 + i as f64).collect();
        let table = FeatureBuilder::new().build(&daily(&values)).unwrap();
        let row = &table.rows()[0];
        let vector = row.to_feature_vector();

        assert_eq!(vector.columns.len(), FEATURE_COLUMNS.len());
        let lag_idx = FEATURE_COLUMNS.iter().position(|c| *c == "pm25_lag_1").unwrap();
        assert_eq!(vector.values[lag_idx], row.window.lag_1);
        assert_eq!(vector.values[15], row.days_since_start as f64);
    }
}
