//! # PM2.5 Forecast
//!
//! Long-horizon PM2.5 forecasting with a downstream lung-health estimate.
//!
//! ## Features
//!
//! - Historical series from Elasticsearch, a CSV export, or a deterministic
//!   synthetic generator
//! - Calendar, lag and rolling-window features over daily samples
//! - Random forest regression trained on a chronological split
//! - Single-shot 5-year extrapolation with a normal-approximation interval
//! - FEV1 capacity projection and risk tier
//!
//! ## Quick Start
//!
//! ```no_run
//! use pm25_forecast::{ForecastPipeline, PipelineConfig};
//!
//! let pipeline = ForecastPipeline::new(PipelineConfig::default())?;
//! let result = pipeline.run("Chicago, IL", false)?;
//!
//! println!("{} in 5 years: {}", result.location, result.pm25.predicted_pm25_5y);
//! println!("Risk: {}", result.fev1.risk_level);
//! # Ok::<(), pm25_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod extrapolate;
pub mod features;
pub mod health;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use crate::config::{ElasticConfig, ForestConfig, PipelineConfig};
pub use crate::data::{DataLoader, HistoricalSeries, Observation};
pub use crate::error::ForecastError;
pub use crate::extrapolate::{Extrapolator, Pm25Forecast};
pub use crate::features::{FeatureBuilder, FeatureRow, FeatureSchema, FeatureTable};
pub use crate::health::{estimate_health_impact, HealthImpact, RiskLevel};
pub use crate::metrics::ModelMetrics;
pub use crate::models::forest::RandomForestRegressor;
pub use crate::models::{train, FittedRegressor, Regressor, TrainedModel};
pub use crate::pipeline::{run, ForecastPipeline, PipelineResult, PipelineRun};
pub use crate::source::{CsvSource, ElasticSource, SeriesSource, SyntheticSource};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
