use approx::assert_relative_eq;
use pm25_forecast::metrics::{regression_metrics, ModelMetrics};

#[test]
fn test_perfect_prediction() {
    let actual = vec![10.0, 20.0, 30.0, 40.0];
    let metrics = regression_metrics(&actual, &actual).unwrap();

    assert_eq!(metrics.r2, 1.0);
    assert_eq!(metrics.rmse, 0.0);
    assert_eq!(metrics.mae, 0.0);
}

#[test]
fn test_known_errors() {
    let actual = vec![10.0, 20.0, 30.0, 40.0];
    let predicted = vec![12.0, 18.0, 33.0, 39.0];
    let metrics = regression_metrics(&actual, &predicted).unwrap();

    // errors: -2, 2, -3, 1
    assert_relative_eq!(metrics.mae, 2.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.rmse, (18.0_f64 / 4.0).sqrt(), epsilon = 1e-12);
    // ss_tot = 500
    assert_relative_eq!(metrics.r2, 1.0 - 18.0 / 500.0, epsilon = 1e-12);
}

#[test]
fn test_mean_prediction_scores_zero_r2() {
    let actual = vec![1.0, 2.0, 3.0];
    let predicted = vec![2.0, 2.0, 2.0];
    let metrics = regression_metrics(&actual, &predicted).unwrap();
    assert_relative_eq!(metrics.r2, 0.0, epsilon = 1e-12);
}

#[test]
fn test_worse_than_mean_is_negative() {
    let actual = vec![1.0, 2.0, 3.0];
    let predicted = vec![3.0, 2.0, 1.0];
    let metrics = regression_metrics(&actual, &predicted).unwrap();
    assert!(metrics.r2 < 0.0);
}

#[test]
fn test_constant_target() {
    let actual = vec![25.0, 25.0, 25.0];

    let exact = regression_metrics(&actual, &[25.0, 25.0, 25.0]).unwrap();
    assert_eq!(exact.r2, 1.0);

    let off = regression_metrics(&actual, &[24.0, 25.0, 26.0]).unwrap();
    assert_eq!(off.r2, 0.0);
    assert!(off.rmse > 0.0);
}

#[test]
fn test_mismatched_lengths() {
    assert!(regression_metrics(&[1.0, 2.0], &[1.0]).is_err());
    assert!(regression_metrics(&[], &[]).is_err());
}

#[test]
fn test_metrics_serialise_short_names() {
    let metrics = ModelMetrics {
        r2: 0.5,
        rmse: 2.0,
        mae: 1.5,
    };
    let json = serde_json::to_value(metrics).unwrap();
    assert_eq!(json, serde_json::json!({"r2": 0.5, "rmse": 2.0, "mae": 1.5}));
}
