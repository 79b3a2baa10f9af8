use approx::assert_relative_eq;
use pm25_forecast::health::{estimate_health_impact, RiskLevel, BASELINE_FEV1_ML};
use rstest::rstest;

#[rstest]
#[case(69.999, RiskLevel::Severe)]
#[case(70.0, RiskLevel::High)]
#[case(79.999, RiskLevel::High)]
#[case(80.0, RiskLevel::Moderate)]
#[case(89.999, RiskLevel::Moderate)]
#[case(90.0, RiskLevel::LowModerate)]
#[case(94.999, RiskLevel::LowModerate)]
#[case(95.0, RiskLevel::Low)]
#[case(100.0, RiskLevel::Low)]
fn test_risk_tier_boundaries(#[case] percent: f64, #[case] expected: RiskLevel) {
    assert_eq!(RiskLevel::from_capacity_percent(percent), expected);
}

#[rstest]
#[case(0.0, RiskLevel::Low)]
#[case(25.0, RiskLevel::LowModerate)]
#[case(40.0, RiskLevel::Moderate)]
#[case(80.0, RiskLevel::Severe)]
fn test_concentration_to_tier(#[case] concentration: f64, #[case] expected: RiskLevel) {
    let impact = estimate_health_impact(concentration).unwrap();
    assert_eq!(impact.risk_level, expected);
}

#[test]
fn test_impact_is_non_increasing_in_concentration() {
    let mut previous = estimate_health_impact(0.0).unwrap();
    for step in 1..=400 {
        let concentration = step as f64 * 0.5;
        let impact = estimate_health_impact(concentration).unwrap();
        assert!(
            impact.projected_fev1 <= previous.projected_fev1,
            "capacity rose between {} and {}",
            concentration - 0.5,
            concentration
        );
        previous = impact;
    }
}

#[test]
fn test_derived_fields_are_consistent() {
    let impact = estimate_health_impact(52.3).unwrap();

    assert_eq!(impact.current_fev1, BASELINE_FEV1_ML);
    assert_eq!(impact.current_capacity_percent, 100.0);
    assert_relative_eq!(
        impact.projected_fev1,
        BASELINE_FEV1_ML - impact.total_decline_ml,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        impact.capacity_loss_percent + impact.projected_capacity_percent,
        100.0,
        epsilon = 1e-9
    );
    assert_relative_eq!(impact.annual_decline_ml * 5.0, impact.total_decline_ml, epsilon = 1e-9);
}

#[test]
fn test_rounded_impact_serialises_original_names() {
    let impact = estimate_health_impact(35.0).unwrap().rounded();
    let json = serde_json::to_value(&impact).unwrap();

    assert_eq!(json["current_fev1"], 4000.0);
    assert_eq!(json["projected_fev1"], 3598.0);
    assert_eq!(json["total_decline_ml"], 402.0);
    assert_eq!(json["annual_decline_ml"], 80.4);
    assert_eq!(json["risk_level"], "Moderate");
}
