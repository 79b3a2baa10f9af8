//! Pollutant observations and the ordered series they form

use crate::error::{ForecastError, Result};
use crate::utils::date_parser::parse_timestamp;
use chrono::{DateTime, Duration, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// A single concentration sample (µg/m³) for a named location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub concentration: f64,
    pub location: String,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, concentration: f64, location: impl Into<String>) -> Self {
        Self {
            timestamp,
            concentration,
            location: location.into(),
        }
    }
}

/// Observations for one location, sorted ascending by timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    location: String,
    observations: Vec<Observation>,
}

impl HistoricalSeries {
    /// Build a series, sorting the observations chronologically
    pub fn new(location: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|obs| obs.timestamp);
        Self {
            location: location.into(),
            observations,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Concentration column in chronological order
    pub fn concentrations(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.concentration).collect()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.observations.first().map(|o| o.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.observations.last().map(|o| o.timestamp)
    }

    /// The trailing `n` observations (fewer if the series is shorter)
    pub fn tail(&self, n: usize) -> &[Observation] {
        let start = self.observations.len().saturating_sub(n);
        &self.observations[start..]
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Write the series as `timestamp,concentration,location` CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for obs in &self.observations {
            writer.serialize(obs)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Loader for observation CSV files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load `pollutant` observations for `location` from a CSV file.
    ///
    /// Expects a time column (`timestamp`, `date`, ...) and a concentration
    /// column (`pm25_ugm3`, `value`, or anything containing `pm25`). An
    /// optional `pollutant` column filters rows case-insensitively and an
    /// optional `location_name`/`location` column must match `location`.
    /// Rows without a parsable timestamp or a concentration are skipped.
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        location: &str,
        pollutant: &str,
    ) -> Result<Vec<Observation>> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df, location, pollutant)
    }

    /// Extract observations from an already loaded DataFrame
    pub fn from_dataframe(
        df: &DataFrame,
        location: &str,
        pollutant: &str,
    ) -> Result<Vec<Observation>> {
        let time_column = Self::detect_time_column(df)?;
        let value_column = Self::detect_value_column(df)?;

        let timestamps = Self::column_as_strings(df, &time_column)?;
        let values = Self::column_as_f64(df, &value_column)?;
        let pollutants = match Self::find_column(df, &["pollutant"]) {
            Some(name) => Some(Self::column_as_strings(df, &name)?),
            None => None,
        };
        let locations = match Self::find_column(df, &["location_name", "location"]) {
            Some(name) => Some(Self::column_as_strings(df, &name)?),
            None => None,
        };

        let mut observations = Vec::with_capacity(df.height());
        let mut skipped = 0usize;

        for i in 0..df.height() {
            if let Some(pollutants) = &pollutants {
                match pollutants[i].as_deref() {
                    Some(p) if p.trim().eq_ignore_ascii_case(pollutant) => {}
                    _ => continue,
                }
            }
            if let Some(locations) = &locations {
                match locations[i].as_deref() {
                    Some(name) if name.trim() == location => {}
                    _ => continue,
                }
            }

            let timestamp = timestamps[i].as_deref().and_then(parse_timestamp);
            match (timestamp, values[i]) {
                (Some(timestamp), Some(value)) if value.is_finite() => {
                    observations.push(Observation::new(timestamp, value, location));
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {} CSV rows without timestamp or concentration", skipped);
        }

        Ok(observations)
    }

    /// Keep only observations within `lookback_days` of the newest one
    pub fn within_lookback(mut observations: Vec<Observation>, lookback_days: u32) -> Vec<Observation> {
        if let Some(newest) = observations.iter().map(|o| o.timestamp).max() {
            let cutoff = newest - Duration::days(i64::from(lookback_days));
            observations.retain(|o| o.timestamp >= cutoff);
        }
        observations
    }

    /// Detect the time column in a DataFrame
    fn detect_time_column(df: &DataFrame) -> Result<String> {
        let column_names = df.get_column_names();

        for name in &column_names {
            let lower_name = name.to_lowercase();
            if lower_name.contains("time") || lower_name.contains("date") {
                return Ok(name.to_string());
            }
        }

        Err(ForecastError::DataError(
            "No time column found in data".to_string(),
        ))
    }

    /// Detect the concentration column, preferring true concentration
    /// fields over generic ones
    fn detect_value_column(df: &DataFrame) -> Result<String> {
        if let Some(name) = Self::find_column(df, &["pm25_ugm3", "value", "concentration"]) {
            return Ok(name);
        }

        df.get_column_names()
            .iter()
            .find(|name| name.to_lowercase().contains("pm25"))
            .map(|name| name.to_string())
            .ok_or_else(|| {
                ForecastError::DataError("No concentration column found in data".to_string())
            })
    }

    /// First column whose lowercase name equals one of `candidates`
    fn find_column(df: &DataFrame, candidates: &[&str]) -> Option<String> {
        let column_names = df.get_column_names();
        candidates.iter().find_map(|candidate| {
            column_names
                .iter()
                .find(|name| name.to_lowercase() == *candidate)
                .map(|name| name.to_string())
        })
    }

    fn column_as_strings(df: &DataFrame, column_name: &str) -> Result<Vec<Option<String>>> {
        let col = df
            .column(column_name)
            .map_err(|e| {
                ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
            })?
            .cast(&DataType::Utf8)?;

        let values = col.utf8()?.into_iter().map(|v| v.map(str::to_string)).collect();
        Ok(values)
    }

    fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<Option<f64>>> {
        let col = df
            .column(column_name)
            .map_err(|e| {
                ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
            })?
            .cast(&DataType::Float64)?;

        let values = col.f64()?.into_iter().collect();
        Ok(values)
    }
}
