//! Regression models for PM2.5 forecasting
//!
//! A [`Regressor`] holds hyperparameters and fits a [`FittedRegressor`].
//! [`train`] binds the fitted estimator to the feature schema it was trained
//! on, producing a [`TrainedModel`] that only accepts inputs in that schema.

use crate::error::{ForecastError, Result};
use crate::features::{FeatureRow, FeatureSchema, FeatureTable, FeatureVector};
use crate::metrics::{regression_metrics, ModelMetrics};
use crate::utils::chronological_split;
use std::fmt::Debug;

/// Fitted estimator mapping one feature row to a concentration
pub trait FittedRegressor: Debug + Send + Sync {
    /// Predict a single row
    fn predict_one(&self, features: &[f64]) -> Result<f64>;

    /// Predict many rows
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Relative importance of each input column, if the estimator tracks it
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// Name of the model
    fn name(&self) -> &str;
}

/// Regression model that can be fitted on a feature matrix
pub trait Regressor: Debug + Clone {
    /// The type of fitted model produced
    type Fitted: FittedRegressor;

    /// Fit on `features` (one row per sample) against `targets`
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Fitted estimator bound to its feature schema
#[derive(Debug)]
pub struct TrainedModel<F: FittedRegressor> {
    schema: FeatureSchema,
    estimator: F,
}

impl<F: FittedRegressor> TrainedModel<F> {
    pub fn new(schema: FeatureSchema, estimator: F) -> Self {
        Self { schema, estimator }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn estimator(&self) -> &F {
        &self.estimator
    }

    /// Predict one vector; its columns must match the schema exactly,
    /// including order
    pub fn predict(&self, vector: &FeatureVector) -> Result<f64> {
        if vector.columns.as_slice() != self.schema.columns() || vector.values.len() != self.schema.len() {
            return Err(ForecastError::SchemaMismatch {
                expected: self.schema.columns().to_vec(),
                actual: vector.columns.clone(),
            });
        }
        self.estimator.predict_one(&vector.values)
    }

    pub fn predict_row(&self, row: &FeatureRow) -> Result<f64> {
        self.predict(&row.to_feature_vector())
    }

    /// Importances keyed by column name, most important first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let Some(importances) = self.estimator.feature_importances() else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, f64)> = self
            .schema
            .columns()
            .iter()
            .cloned()
            .zip(importances)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Fit `regressor` on the leading `train_ratio` share of `table` and score
/// it on the remaining rows.
///
/// Rows are split chronologically, never shuffled.
pub fn train<R: Regressor>(
    regressor: &R,
    table: &FeatureTable,
    train_ratio: f64,
) -> Result<(TrainedModel<R::Fitted>, ModelMetrics)> {
    if table.is_empty() {
        return Err(ForecastError::NoTrainableData(format!(
            "no feature rows survived ({} dropped for incomplete history)",
            table.dropped()
        )));
    }

    let (train_rows, test_rows) = chronological_split(table.rows(), train_ratio);
    if train_rows.is_empty() {
        return Err(ForecastError::NoTrainableData(format!(
            "{} feature rows leave an empty training slice",
            table.len()
        )));
    }

    let x_train: Vec<Vec<f64>> = train_rows.iter().map(|r| r.values().to_vec()).collect();
    let y_train: Vec<f64> = train_rows.iter().map(|r| r.target).collect();
    let estimator = regressor.fit(&x_train, &y_train)?;

    let metrics = if test_rows.is_empty() {
        log::warn!("No test rows after the chronological split; metrics are zeroed");
        ModelMetrics::zeroed()
    } else {
        let x_test: Vec<Vec<f64>> = test_rows.iter().map(|r| r.values().to_vec()).collect();
        let y_test: Vec<f64> = test_rows.iter().map(|r| r.target).collect();
        let predicted = estimator.predict(&x_test)?;
        regression_metrics(&y_test, &predicted)?
    };

    log::info!(
        "Trained {} on {} rows, tested on {}: r2={:.3} rmse={:.3} mae={:.3}",
        regressor.name(),
        train_rows.len(),
        test_rows.len(),
        metrics.r2,
        metrics.rmse,
        metrics.mae
    );

    Ok((TrainedModel::new(table.schema().clone(), estimator), metrics))
}

pub mod forest;
