//! FEV1 lung-capacity impact of a projected PM2.5 concentration
//!
//! A fixed demonstration formula, not a clinical model: a natural age
//! related decline plus an exposure term that grows super-linearly above
//! 35 µg/m³.

use crate::error::{ForecastError, Result};
use crate::utils::round_to;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Baseline FEV1 in ml
pub const BASELINE_FEV1_ML: f64 = 4000.0;
/// Natural decline in ml per year
pub const NATURAL_DECLINE_ML_PER_YEAR: f64 = 30.0;
pub const HORIZON_YEARS: f64 = 5.0;
/// Concentration step (µg/m³) per [`DECLINE_PER_STEP_ML`]
pub const REFERENCE_STEP: f64 = 10.0;
pub const DECLINE_PER_STEP_ML: f64 = 72.0;
/// Above this concentration the exposure term is scaled non-linearly
pub const NONLINEAR_THRESHOLD: f64 = 35.0;
pub const NONLINEAR_EXPONENT: f64 = 1.3;

/// Risk tier derived from projected capacity percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Severe,
    High,
    Moderate,
    #[serde(rename = "Low-Moderate")]
    LowModerate,
    Low,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Severe,
        RiskLevel::High,
        RiskLevel::Moderate,
        RiskLevel::LowModerate,
        RiskLevel::Low,
    ];

    /// Tiers are bounded by strict `<` at 70, 80, 90 and 95
    pub fn from_capacity_percent(percent: f64) -> Self {
        if percent < 70.0 {
            RiskLevel::Severe
        } else if percent < 80.0 {
            RiskLevel::High
        } else if percent < 90.0 {
            RiskLevel::Moderate
        } else if percent < 95.0 {
            RiskLevel::LowModerate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Severe => "Severe",
            RiskLevel::High => "High",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::LowModerate => "Low-Moderate",
            RiskLevel::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthImpact {
    pub current_fev1: f64,
    pub projected_fev1: f64,
    pub current_capacity_percent: f64,
    pub projected_capacity_percent: f64,
    pub capacity_loss_percent: f64,
    pub total_decline_ml: f64,
    pub annual_decline_ml: f64,
    pub risk_level: RiskLevel,
}

impl HealthImpact {
    /// Copy rounded to one decimal; the risk tier is left as computed
    pub fn rounded(&self) -> Self {
        Self {
            current_fev1: round_to(self.current_fev1, 1),
            projected_fev1: round_to(self.projected_fev1, 1),
            current_capacity_percent: round_to(self.current_capacity_percent, 1),
            projected_capacity_percent: round_to(self.projected_capacity_percent, 1),
            capacity_loss_percent: round_to(self.capacity_loss_percent, 1),
            total_decline_ml: round_to(self.total_decline_ml, 1),
            annual_decline_ml: round_to(self.annual_decline_ml, 1),
            risk_level: self.risk_level,
        }
    }
}

/// Map a projected PM2.5 concentration to an FEV1 impact.
///
/// Negative or non-finite concentrations are rejected.
pub fn estimate_health_impact(concentration: f64) -> Result<HealthImpact> {
    if !concentration.is_finite() || concentration < 0.0 {
        return Err(ForecastError::InvalidInput(format!(
            "concentration must be a non-negative number, got {}",
            concentration
        )));
    }

    let excess = concentration / REFERENCE_STEP * DECLINE_PER_STEP_ML;
    let multiplier = if concentration > NONLINEAR_THRESHOLD {
        (concentration / NONLINEAR_THRESHOLD).powf(NONLINEAR_EXPONENT)
    } else {
        1.0
    };
    let total_decline = NATURAL_DECLINE_ML_PER_YEAR * HORIZON_YEARS + excess * multiplier;
    let projected = BASELINE_FEV1_ML - total_decline;
    let percent = projected / BASELINE_FEV1_ML * 100.0;

    Ok(HealthImpact {
        current_fev1: BASELINE_FEV1_ML,
        projected_fev1: projected,
        current_capacity_percent: 100.0,
        projected_capacity_percent: percent,
        capacity_loss_percent: 100.0 - percent,
        total_decline_ml: total_decline,
        annual_decline_ml: total_decline / HORIZON_YEARS,
        risk_level: RiskLevel::from_capacity_percent(percent),
    })
}
