//! # Airtime
//!
//! `airtime_workspace` bundles the workspace crates behind one dependency:
//! [`air_math`] for window statistics and trend fitting, and
//! [`pm25_forecast`] for the forecasting pipeline.
//!
//! ## Example
//!
//! ```
//! use airtime_workspace::{estimate_health_impact, RiskLevel};
//!
//! let impact = estimate_health_impact(5.0).unwrap();
//! assert_eq!(impact.risk_level, RiskLevel::Low);
//! ```

pub use air_math;
pub use pm25_forecast;

pub use pm25_forecast::{
    estimate_health_impact, run, ForecastError, ForecastPipeline, HealthImpact, PipelineConfig,
    PipelineResult, RiskLevel,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_exposes_both_crates() {
        let fit = air_math::linear_fit(&[1.0, 2.0, 3.0]).unwrap();
        assert!((fit.slope - 1.0).abs() < 1e-12);

        let impact = estimate_health_impact(0.0).unwrap();
        assert_eq!(impact.projected_fev1, 3850.0);
    }

    #[test]
    fn test_documented_tiers() {
        assert_eq!(estimate_health_impact(5.0).unwrap().risk_level, RiskLevel::Low);
        // 236.4 ml decline leaves 94.09%
        assert_eq!(
            estimate_health_impact(12.0).unwrap().risk_level,
            RiskLevel::LowModerate
        );
    }

    #[test]
    fn test_empty_location_is_invalid() {
        let err = run("", false, 365).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }
}
