//! End-to-end run: fetch, build features, train, extrapolate, map to health impact

use crate::config::PipelineConfig;
use crate::data::HistoricalSeries;
use crate::error::Result;
use crate::extrapolate::{Extrapolator, Pm25Forecast};
use crate::features::{FeatureBuilder, FeatureTable};
use crate::health::{estimate_health_impact, HealthImpact};
use crate::metrics::ModelMetrics;
use crate::models::forest::RandomForestRegressor;
use crate::models::train;
use crate::source::{validate_location, SeriesSource, SyntheticSource};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Result record of one forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub location: String,
    pub pm25: Pm25Forecast,
    pub fev1: HealthImpact,
    pub metrics: ModelMetrics,
}

/// A [`PipelineResult`] together with the intermediate artefacts it was
/// derived from
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub result: PipelineResult,
    pub history: HistoricalSeries,
    pub features: FeatureTable,
    /// Forest importances, highest first
    pub importances: Vec<(String, f64)>,
}

/// Runs the forecasting pipeline for one location at a time.
///
/// Every run trains its own model; nothing is cached between runs.
pub struct ForecastPipeline {
    config: PipelineConfig,
    live: Option<Box<dyn SeriesSource>>,
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, live: None })
    }

    /// Source consulted when real data is requested
    pub fn with_live_source(mut self, source: Box<dyn SeriesSource>) -> Self {
        self.live = Some(source);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn synthetic_source(&self) -> SyntheticSource {
        let end_date = self
            .config
            .synthetic_end_date
            .unwrap_or_else(|| Utc::now().date_naive());
        SyntheticSource::new(self.config.synthetic_seed, end_date)
    }

    /// Live observations when requested and available, synthetic otherwise
    fn load_history(&self, location: &str, use_real_data: bool) -> Result<HistoricalSeries> {
        let days = self.config.lookback_days;

        if use_real_data {
            match &self.live {
                Some(source) => {
                    let observations = source.fetch(location, days)?;
                    if !observations.is_empty() {
                        log::info!(
                            "Using {} observations from {}",
                            observations.len(),
                            source.name()
                        );
                        return Ok(HistoricalSeries::new(location, observations));
                    }
                    log::warn!(
                        "No real data from {} for {}; falling back to synthetic",
                        source.name(),
                        location
                    );
                }
                None => log::warn!("Real data requested but no live source configured; using synthetic"),
            }
        }

        let observations = self.synthetic_source().fetch(location, days)?;
        Ok(HistoricalSeries::new(location, observations))
    }

    /// Run the pipeline and keep the intermediate artefacts
    pub fn execute(&self, location: &str, use_real_data: bool) -> Result<PipelineRun> {
        let location = validate_location(location)?;
        log::info!("Forecasting PM2.5 for {}", location);

        let history = self.load_history(location, use_real_data)?;
        let features = FeatureBuilder::new().build(history.observations())?;

        let regressor = RandomForestRegressor::new(self.config.forest.clone())?;
        let (model, metrics) = train(&regressor, &features, self.config.train_ratio)?;

        let pm25 = Extrapolator::from_config(&self.config)?.extrapolate(&model, &history)?;
        // the mapper sees the unrounded prediction
        let fev1 = estimate_health_impact(pm25.predicted_pm25_5y)?;

        let result = PipelineResult {
            location: location.to_string(),
            pm25: pm25.rounded(),
            fev1: fev1.rounded(),
            metrics,
        };
        log::info!(
            "{}: {:.2} µg/m³ in {} days, risk {}",
            location,
            result.pm25.predicted_pm25_5y,
            self.config.horizon_days,
            result.fev1.risk_level
        );

        Ok(PipelineRun {
            result,
            history,
            features,
            importances: model.feature_importances(),
        })
    }

    pub fn run(&self, location: &str, use_real_data: bool) -> Result<PipelineResult> {
        self.execute(location, use_real_data).map(|run| run.result)
    }
}

/// Run with default settings.
///
/// Without a live source, `use_real_data` falls back to synthetic data.
pub fn run(location: &str, use_real_data: bool, lookback_days: u32) -> Result<PipelineResult> {
    let config = PipelineConfig {
        lookback_days,
        ..PipelineConfig::default()
    };
    ForecastPipeline::new(config)?.run(location, use_real_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use crate::error::ForecastError;
    use chrono::NaiveDate;

    struct EmptySource;

    impl SeriesSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        fn fetch(&self, location: &str, _lookback_days: u32) -> Result<Vec<Observation>> {
            validate_location(location)?;
            Ok(Vec::new())
        }
    }

    fn small_config() -> PipelineConfig {
        let mut config = PipelineConfig {
            lookback_days: 120,
            synthetic_end_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            ..PipelineConfig::default()
        };
        config.forest.n_estimators = 10;
        config
    }

    #[test]
    fn test_empty_location_rejected() {
        let pipeline = ForecastPipeline::new(small_config()).unwrap();
        let err = pipeline.run("  ", false).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_live_source_falls_back() {
        let synthetic = ForecastPipeline::new(small_config()).unwrap();
        let fallback = ForecastPipeline::new(small_config())
            .unwrap()
            .with_live_source(Box::new(EmptySource));

        let expected = synthetic.run("Testville", false).unwrap();
        let actual = fallback.run("Testville", true).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_run_keeps_artefacts() {
        let run = ForecastPipeline::new(small_config())
            .unwrap()
            .execute("Testville", false)
            .unwrap();
        assert_eq!(run.history.len(), 120);
        assert_eq!(run.features.len(), 90);
        assert_eq!(run.features.dropped(), 30);
        assert_eq!(run.importances.len(), 16);
        assert_eq!(
            run.result.pm25.current_date,
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
        );
    }
}
