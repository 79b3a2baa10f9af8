use chrono::NaiveDate;
use pm25_forecast::config::ForestConfig;
use pm25_forecast::features::{FeatureBuilder, FeatureTable, FeatureVector};
use pm25_forecast::models::forest::RandomForestRegressor;
use pm25_forecast::models::{train, FittedRegressor};
use pm25_forecast::source::SyntheticSource;
use pm25_forecast::ForecastError;

fn synthetic_table(days: u32) -> FeatureTable {
    let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let observations = SyntheticSource::new(42, end)
        .generate("Testville", days)
        .unwrap();
    FeatureBuilder::new().build(&observations).unwrap()
}

fn small_forest() -> RandomForestRegressor {
    RandomForestRegressor::new(ForestConfig {
        n_estimators: 12,
        ..ForestConfig::default()
    })
    .unwrap()
}

#[test]
fn test_train_on_synthetic_series() {
    let table = synthetic_table(365);
    assert_eq!(table.len(), 335);

    let (model, metrics) = train(&small_forest(), &table, 0.8).unwrap();

    assert!(metrics.r2.is_finite());
    assert!(metrics.rmse >= 0.0);
    assert!(metrics.mae >= 0.0);
    assert!(metrics.mae <= metrics.rmse + 1e-12);
    assert_eq!(model.estimator().trees().len(), 12);

    let prediction = model.predict_row(&table.rows()[0]).unwrap();
    assert!((5.0..=150.0).contains(&prediction));
}

#[test]
fn test_training_is_deterministic() {
    let table = synthetic_table(200);

    let (first, first_metrics) = train(&small_forest(), &table, 0.8).unwrap();
    let (second, second_metrics) = train(&small_forest(), &table, 0.8).unwrap();

    assert_eq!(first_metrics, second_metrics);
    for row in table.rows() {
        assert_eq!(first.predict_row(row).unwrap(), second.predict_row(row).unwrap());
    }
}

#[test]
fn test_feature_importances_are_ranked() {
    let table = synthetic_table(200);
    let (model, _) = train(&small_forest(), &table, 0.8).unwrap();

    let importances = model.feature_importances();
    assert_eq!(importances.len(), 16);
    assert!(importances.windows(2).all(|pair| pair[0].1 >= pair[1].1));

    let total: f64 = importances.iter().map(|(_, v)| v).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_short_series_has_no_trainable_data() {
    let table = synthetic_table(30);
    assert!(table.is_empty());

    let err = train(&small_forest(), &table, 0.8).unwrap_err();
    assert!(matches!(err, ForecastError::NoTrainableData(_)));
}

#[test]
fn test_single_row_leaves_empty_train_slice() {
    // 31 samples -> 1 feature row -> floor(0.8) = 0 training rows
    let table = synthetic_table(31);
    assert_eq!(table.len(), 1);

    let err = train(&small_forest(), &table, 0.8).unwrap_err();
    assert!(matches!(err, ForecastError::NoTrainableData(_)));
}

#[test]
fn test_empty_test_slice_zeroes_metrics() {
    let table = synthetic_table(60);
    let (model, metrics) = train(&small_forest(), &table, 1.0).unwrap();

    assert_eq!(metrics.r2, 0.0);
    assert_eq!(metrics.rmse, 0.0);
    assert_eq!(metrics.mae, 0.0);
    assert!(model.predict_row(&table.rows()[0]).is_ok());
}

#[test]
fn test_schema_mismatch_is_rejected() {
    let table = synthetic_table(120);
    let (model, _) = train(&small_forest(), &table, 0.8).unwrap();

    let mut vector = table.rows()[0].to_feature_vector();
    vector.columns.swap(0, 1);
    let err = model.predict(&vector).unwrap_err();
    assert!(matches!(err, ForecastError::SchemaMismatch { .. }));

    let short = FeatureVector {
        columns: vec!["year".to_string()],
        values: vec![2024.0],
    };
    assert!(model.predict(&short).is_err());
}

#[test]
fn test_forest_rejects_nan_input() {
    let table = synthetic_table(120);
    let (model, _) = train(&small_forest(), &table, 0.8).unwrap();

    let mut values = table.rows()[0].values().to_vec();
    values[3] = f64::NAN;
    assert!(model.estimator().predict_one(&values).is_err());
}
