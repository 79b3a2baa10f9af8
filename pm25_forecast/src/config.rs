//! Explicit configuration for the forecasting pipeline
//!
//! Every tunable the pipeline relies on is pinned here as a named default so
//! that two runs over the same input train the same forest. Configuration is
//! passed by value into constructors; nothing in the library reads the
//! process environment except [`ElasticConfig::from_env`], which is meant to
//! be called once at the binary boundary.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of trees in the ensemble
pub const DEFAULT_N_ESTIMATORS: usize = 100;
/// Maximum depth of any single tree
pub const DEFAULT_MAX_DEPTH: usize = 15;
/// Minimum number of samples a node needs before it may be split
pub const DEFAULT_MIN_SAMPLES_SPLIT: usize = 5;
/// Minimum number of samples each child of a split must keep
pub const DEFAULT_MIN_SAMPLES_LEAF: usize = 2;
/// Seed shared by the forest and the synthetic generator
pub const DEFAULT_SEED: u64 = 42;

/// Days of history requested from a series source
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;
/// Trailing observations used for current statistics and the trend fit
pub const DEFAULT_RECENT_WINDOW: usize = 90;
/// Forecast horizon, five 365-day years
pub const DEFAULT_HORIZON_DAYS: i64 = 5 * 365;
/// Share of feature rows used for training
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;

/// Elasticsearch index holding exposure documents
pub const DEFAULT_INDEX_NAME: &str = "tempo-exposure";
/// Pollutant tag queried by the live source
pub const DEFAULT_POLLUTANT: &str = "pm25";

/// Hyperparameters of the bagged regression-tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    /// Draw a bootstrap sample per tree instead of using every row
    pub bootstrap: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: DEFAULT_MAX_DEPTH,
            min_samples_split: DEFAULT_MIN_SAMPLES_SPLIT,
            min_samples_leaf: DEFAULT_MIN_SAMPLES_LEAF,
            seed: DEFAULT_SEED,
            bootstrap: true,
        }
    }
}

impl ForestConfig {
    /// Reject settings the tree builder cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::ConfigError(
                "n_estimators must be greater than zero".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ForecastError::ConfigError(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::ConfigError(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection settings for the live exposure store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// Base URL of the cluster, e.g. `https://host:9243`
    pub endpoint: String,
    /// API key sent as `Authorization: ApiKey <key>`
    #[serde(default)]
    pub credentials: Option<String>,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_pollutant")]
    pub pollutant: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_hits")]
    pub max_hits: usize,
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_pollutant() -> String {
    DEFAULT_POLLUTANT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_hits() -> usize {
    10_000
}

impl ElasticConfig {
    /// Settings for `endpoint` with every other field at its default
    pub fn new(endpoint: impl Into<String>, credentials: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials,
            index_name: default_index_name(),
            pollutant: default_pollutant(),
            timeout_secs: default_timeout_secs(),
            max_hits: default_max_hits(),
        }
    }

    /// Read `ELASTIC_URL`, `ELASTIC_API_KEY` and `ELASTIC_INDEX`
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("ELASTIC_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ForecastError::ConfigError("ELASTIC_URL is not set".to_string()))?;
        let credentials = std::env::var("ELASTIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let mut config = Self::new(endpoint, credentials);
        if let Ok(index) = std::env::var("ELASTIC_INDEX") {
            if !index.trim().is_empty() {
                config.index_name = index;
            }
        }
        Ok(config)
    }

    /// URL of the index's `_search` endpoint
    pub fn search_url(&self) -> String {
        format!(
            "{}/{}/_search",
            self.endpoint.trim_end_matches('/'),
            self.index_name
        )
    }
}

/// Settings for one end-to-end forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub lookback_days: u32,
    pub recent_window: usize,
    pub horizon_days: i64,
    pub train_ratio: f64,
    pub synthetic_seed: u64,
    /// Last day covered by synthetic series; today when unset
    pub synthetic_end_date: Option<NaiveDate>,
    pub forest: ForestConfig,
    pub elastic: Option<ElasticConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            recent_window: DEFAULT_RECENT_WINDOW,
            horizon_days: DEFAULT_HORIZON_DAYS,
            train_ratio: DEFAULT_TRAIN_RATIO,
            synthetic_seed: DEFAULT_SEED,
            synthetic_end_date: None,
            forest: ForestConfig::default(),
            elastic: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.recent_window == 0 {
            return Err(ForecastError::ConfigError(
                "recent_window must be greater than zero".to_string(),
            ));
        }
        if self.horizon_days <= 0 {
            return Err(ForecastError::ConfigError(
                "horizon_days must be positive".to_string(),
            ));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(ForecastError::ConfigError(format!(
                "train_ratio must be in (0, 1), got {}",
                self.train_ratio
            )));
        }
        self.forest.validate()
    }
}
