//! Historical series sources
//!
//! Every source follows the same contract: an empty location name is an
//! invalid-input error raised before any I/O, while any retrieval failure
//! (network, timeout, malformed payload, unreadable file) is reported as an
//! empty sequence so the pipeline can fall back to synthetic data.

use crate::config::ElasticConfig;
use crate::data::{DataLoader, Observation};
use crate::error::{ForecastError, Result};
use crate::utils::date_parser::parse_timestamp;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;
use std::f64::consts::PI;
use std::path::PathBuf;

/// Supplies ordered concentration samples for a location
pub trait SeriesSource {
    /// Short name used in log output
    fn name(&self) -> &str;

    /// Observations from the last `lookback_days`, sorted ascending
    fn fetch(&self, location: &str, lookback_days: u32) -> Result<Vec<Observation>>;
}

/// Fail fast on a missing location
pub fn validate_location(location: &str) -> Result<&str> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(ForecastError::InvalidInput(
            "location is required".to_string(),
        ));
    }
    Ok(trimmed)
}

const SYNTHETIC_BASE: f64 = 35.0;
const SYNTHETIC_SEASONAL_AMPLITUDE: f64 = 15.0;
const SYNTHETIC_TREND_TOTAL: f64 = 5.0;
const SYNTHETIC_NOISE_STD: f64 = 8.0;
const SYNTHETIC_WEEKDAY_OFFSET: f64 = 5.0;
const SYNTHETIC_WEEKEND_OFFSET: f64 = -3.0;
/// Physical range synthetic samples are clipped to
pub const SYNTHETIC_RANGE: (f64, f64) = (5.0, 150.0);

/// Deterministic daily PM2.5 generator for offline runs
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    end_date: NaiveDate,
}

impl SyntheticSource {
    /// Samples end the day before `end_date`
    pub fn new(seed: u64, end_date: NaiveDate) -> Self {
        Self { seed, end_date }
    }

    /// Generate `days` daily samples for `location`.
    ///
    /// Two seasonal cycles over the window, a 5 µg/m³ upward drift,
    /// Gaussian noise and a weekday/weekend offset, clipped to
    /// [`SYNTHETIC_RANGE`].
    pub fn generate(&self, location: &str, days: u32) -> Result<Vec<Observation>> {
        let noise = Normal::new(0.0, SYNTHETIC_NOISE_STD)
            .map_err(|e| ForecastError::DataError(e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let end = DateTime::<Utc>::from_naive_utc_and_offset(
            NaiveDateTime::new(self.end_date, NaiveTime::default()),
            Utc,
        );
        let n = days as usize;

        let observations = (0..n)
            .map(|i| {
                let seasonal = SYNTHETIC_SEASONAL_AMPLITUDE
                    * (linspace(0.0, 4.0 * PI, n, i) + PI / 2.0).sin();
                let trend = linspace(0.0, SYNTHETIC_TREND_TOTAL, n, i);
                let weekly = if i % 7 < 5 {
                    SYNTHETIC_WEEKDAY_OFFSET
                } else {
                    SYNTHETIC_WEEKEND_OFFSET
                };
                let value = (SYNTHETIC_BASE + seasonal + trend + noise.sample(&mut rng) + weekly)
                    .clamp(SYNTHETIC_RANGE.0, SYNTHETIC_RANGE.1);
                let timestamp = end - Duration::days((n - i) as i64);
                Observation::new(timestamp, value, location)
            })
            .collect();

        Ok(observations)
    }
}

/// `i`-th of `n` evenly spaced points over `[start, stop]`, endpoints included
fn linspace(start: f64, stop: f64, n: usize, i: usize) -> f64 {
    if n < 2 {
        return start;
    }
    start + (stop - start) * i as f64 / (n - 1) as f64
}

impl SeriesSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, location: &str, lookback_days: u32) -> Result<Vec<Observation>> {
        let location = validate_location(location)?;
        self.generate(location, lookback_days)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    hits: HitsEnvelope,
}

#[derive(Debug, Default, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    /// Kept untyped so one malformed document cannot fail the whole page
    #[serde(rename = "_source", default)]
    source: serde_json::Value,
}

/// Indexed exposure document; only true concentrations are accepted,
/// never values derived from an AQI
#[derive(Debug)]
struct ExposureDocument {
    timestamp: DateTime<Utc>,
    concentration: f64,
    location_name: Option<String>,
}

impl ExposureDocument {
    /// Coerce a raw `_source`; `None` when the timestamp or the
    /// concentration is missing or unusable
    fn from_source(source: &serde_json::Value) -> Option<Self> {
        let timestamp = source.get("@timestamp").and_then(coerce_timestamp)?;
        let concentration = source
            .get("pm25_ugm3")
            .and_then(coerce_f64)
            .or_else(|| source.get("value").and_then(coerce_f64))?;
        let location_name = source
            .get("location_name")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        Some(Self {
            timestamp,
            concentration,
            location_name,
        })
    }
}

/// Numbers and numeric strings; anything non-finite is rejected
fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Date strings, or epoch milliseconds as stored by `epoch_millis` mappings
fn coerce_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => parse_timestamp(s),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Live source backed by an Elasticsearch exposure index
#[derive(Debug, Clone)]
pub struct ElasticSource {
    config: ElasticConfig,
    client: reqwest::blocking::Client,
}

impl ElasticSource {
    pub fn new(config: ElasticConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ForecastError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    /// Search body: pollutant tag, trailing time range, exact location name
    pub fn query_body(&self, location: &str, lookback_days: u32) -> serde_json::Value {
        serde_json::json!({
            "query": {
                "bool": {
                    "must": [
                        { "term": { "pollutant": self.config.pollutant } },
                        { "range": { "@timestamp": {
                            "gte": format!("now-{}d", lookback_days),
                            "lte": "now"
                        } } },
                        { "term": { "location_name.keyword": location } }
                    ]
                }
            },
            "size": self.config.max_hits,
            "sort": [ { "@timestamp": "asc" } ]
        })
    }

    fn search(&self, location: &str, lookback_days: u32) -> std::result::Result<SearchResponse, reqwest::Error> {
        let mut request = self
            .client
            .post(self.config.search_url())
            .json(&self.query_body(location, lookback_days));
        if let Some(key) = &self.config.credentials {
            request = request.header("Authorization", format!("ApiKey {}", key));
        }

        request.send()?.error_for_status()?.json::<SearchResponse>()
    }

    /// Convert a search response into sorted observations
    pub(crate) fn observations_from_response(response: SearchResponse, location: &str) -> Vec<Observation> {
        let mut skipped = 0usize;
        let mut observations: Vec<Observation> = response
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| match ExposureDocument::from_source(&hit.source) {
                Some(doc) => Some(Observation::new(
                    doc.timestamp,
                    doc.concentration,
                    doc.location_name.unwrap_or_else(|| location.to_string()),
                )),
                None => {
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            log::debug!("Skipped {} documents without a usable timestamp or concentration", skipped);
        }
        observations.sort_by_key(|obs| obs.timestamp);
        observations
    }

    /// Parse a raw `_search` response body
    pub fn parse_response(body: &str, location: &str) -> Result<Vec<Observation>> {
        let response: SearchResponse = serde_json::from_str(body)?;
        Ok(Self::observations_from_response(response, location))
    }
}

impl SeriesSource for ElasticSource {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    fn fetch(&self, location: &str, lookback_days: u32) -> Result<Vec<Observation>> {
        let location = validate_location(location)?;

        match self.search(location, lookback_days) {
            Ok(response) => {
                let observations = Self::observations_from_response(response, location);
                log::info!("Fetched {} records for {}", observations.len(), location);
                Ok(observations)
            }
            Err(e) => {
                log::warn!("Elasticsearch fetch error: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

/// Series read from a local CSV export
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    pollutant: String,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, pollutant: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            pollutant: pollutant.into(),
        }
    }
}

impl SeriesSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, location: &str, lookback_days: u32) -> Result<Vec<Observation>> {
        let location = validate_location(location)?;

        match DataLoader::from_csv(&self.path, location, &self.pollutant) {
            Ok(observations) => {
                let mut observations = DataLoader::within_lookback(observations, lookback_days);
                observations.sort_by_key(|obs| obs.timestamp);
                log::info!(
                    "Loaded {} records for {} from {}",
                    observations.len(),
                    location,
                    self.path.display()
                );
                Ok(observations)
            }
            Err(e) => {
                log::warn!("CSV read error for {}: {}", self.path.display(), e);
                Ok(Vec::new())
            }
        }
    }
}
