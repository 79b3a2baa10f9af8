use chrono::NaiveDate;
use pm25_forecast::config::ForestConfig;
use pm25_forecast::{ForecastError, ForecastPipeline, PipelineConfig};

fn main() -> Result<(), ForecastError> {
    pretty_env_logger::init();

    let config = PipelineConfig {
        synthetic_end_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        forest: ForestConfig {
            n_estimators: 50,
            ..ForestConfig::default()
        },
        ..PipelineConfig::default()
    };
    let pipeline = ForecastPipeline::new(config)?;

    for location in ["Chicago, IL", "Denver, CO"] {
        let run = pipeline.execute(location, false)?;
        let result = &run.result;

        println!("=== {} ===", result.location);
        println!(
            "PM2.5 now {:.2}, in 5y {:.2} (95% CI {:.2} to {:.2})",
            result.pm25.current_avg_pm25,
            result.pm25.predicted_pm25_5y,
            result.pm25.confidence_interval_low,
            result.pm25.confidence_interval_high
        );
        println!(
            "FEV1 {} ml -> {} ml ({})",
            result.fev1.current_fev1, result.fev1.projected_fev1, result.fev1.risk_level
        );
        println!("{}", result.metrics);

        println!("Top features:");
        for (name, importance) in run.importances.iter().take(5) {
            println!("  {:<20} {:.3}", name, importance);
        }
        println!();
    }

    Ok(())
}
