//! CLI entry point: predict PM2.5 five years out and estimate the FEV1 impact.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use pm25_forecast::config::DEFAULT_POLLUTANT;
use pm25_forecast::{
    CsvSource, ElasticConfig, ElasticSource, ForecastPipeline, PipelineConfig, PipelineResult,
    SeriesSource,
};

/// Predict PM2.5 in 5 years and estimate FEV1 impact.
#[derive(Parser)]
#[command(name = "predict_pm25")]
#[command(about = "Predict PM2.5 in 5 years and estimate FEV1 impact")]
struct Cli {
    /// Location name, e.g. "Chicago, IL". Prompted for when omitted.
    #[arg(long)]
    location: Option<String>,

    /// Use Elasticsearch data (`ELASTIC_URL`, `ELASTIC_API_KEY`).
    #[arg(long)]
    real: bool,

    /// Read the historical series from a CSV export instead of Elasticsearch.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Days of history to use (default: 365).
    #[arg(long)]
    days: Option<u32>,

    /// TOML file with pipeline settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,

    /// Write the historical series used for training to this CSV file.
    #[arg(long)]
    history_out: Option<PathBuf>,

    /// Write the feature table to this CSV file.
    #[arg(long)]
    features_out: Option<PathBuf>,
}

fn prompt_location() -> io::Result<String> {
    print!("Enter a location (e.g., 'Chicago, IL'): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn live_source(
    cli: &Cli,
    config: &PipelineConfig,
) -> Result<Option<Box<dyn SeriesSource>>, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.csv {
        let pollutant = config
            .elastic
            .as_ref()
            .map_or(DEFAULT_POLLUTANT, |e| e.pollutant.as_str());
        return Ok(Some(Box::new(CsvSource::new(path.clone(), pollutant))));
    }
    if !cli.real {
        return Ok(None);
    }

    let elastic = match &config.elastic {
        Some(elastic) => elastic.clone(),
        None => match ElasticConfig::from_env() {
            Ok(elastic) => elastic,
            Err(e) => {
                log::warn!("Elasticsearch not configured ({}); using synthetic data", e);
                return Ok(None);
            }
        },
    };
    Ok(Some(Box::new(ElasticSource::new(elastic)?)))
}

fn print_summary(result: &PipelineResult) {
    println!("\n=== FINAL PREDICTION SUMMARY ===");
    println!("Location: {}", result.location);
    println!("Current PM2.5 (avg recent): {} µg/m³", result.pm25.current_avg_pm25);
    println!("Predicted PM2.5 (5y): {} µg/m³", result.pm25.predicted_pm25_5y);
    println!(
        "95% CI: [{}, {}]",
        result.pm25.confidence_interval_low, result.pm25.confidence_interval_high
    );
    println!("Projected FEV1 (5y): {} ml", result.fev1.projected_fev1);
    println!("Risk: {}", result.fev1.risk_level);
    println!("\n{}", result.metrics);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(days) = cli.days {
        config.lookback_days = days;
    }

    let location = match &cli.location {
        Some(location) => location.trim().to_string(),
        None => prompt_location()?,
    };
    if location.is_empty() {
        return Err("No location provided".into());
    }

    let use_real_data = cli.real || cli.csv.is_some();
    let mut pipeline = ForecastPipeline::new(config.clone())?;
    if let Some(source) = live_source(&cli, &config)? {
        pipeline = pipeline.with_live_source(source);
    }

    let run = pipeline.execute(&location, use_real_data)?;

    if let Some(path) = &cli.history_out {
        run.history.write_csv(path)?;
        log::info!("Wrote history to {}", path.display());
    }
    if let Some(path) = &cli.features_out {
        run.features.write_csv(path)?;
        log::info!("Wrote features to {}", path.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&run.result)?);
    } else {
        print_summary(&run.result);
        for (name, importance) in run.importances.iter().take(5) {
            log::debug!("importance {}: {:.3}", name, importance);
        }
    }

    Ok(())
}
