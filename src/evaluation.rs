//! Original-scale forecast accuracy metrics and residual whiteness
//! diagnostics.
//!
//! Forecasts are produced on the transformed scale, so scoring first undoes
//! the standardization with the train-fitted parameters, then rebuilds
//! levels by cumulative summation anchored at the last real value before
//! the scored window. Each lag order is evaluated in isolation: a failure
//! records all-NaN metrics for that lag and the loop moves on.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{VarAnalysisError, VarResult};
use crate::math_utils::calculate_mean;
use crate::preprocessing::{cumulative_reconstruct, StandardScaler};
use crate::series::MultivariateSeries;
use crate::statistical_tests::ljung_box_test;
use crate::var_model::FittedVarModel;

/// Accuracy metrics for one lag order and one partition. Any field may be
/// NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForecastScores {
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Coefficient of determination; NaN for degenerate references.
    pub r_squared: f64,
}

impl ForecastScores {
    /// All-NaN sentinel recorded for a failed lag order.
    pub fn nan() -> Self {
        ForecastScores {
            mae: f64::NAN,
            rmse: f64::NAN,
            r_squared: f64::NAN,
        }
    }

    /// Whether every metric is NaN.
    pub fn is_nan(&self) -> bool {
        self.mae.is_nan() && self.rmse.is_nan() && self.r_squared.is_nan()
    }
}

/// Mean absolute error between equally long slices.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> VarResult<f64> {
    check_same_length(actual, predicted)?;
    Ok(calculate_mean(
        &actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .collect::<Vec<f64>>(),
    ))
}

/// Root mean squared error between equally long slices.
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> VarResult<f64> {
    check_same_length(actual, predicted)?;
    let mse = calculate_mean(
        &actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).powi(2))
            .collect::<Vec<f64>>(),
    );
    Ok(mse.sqrt())
}

/// Coefficient of determination.
///
/// Returns NaN when the reference sample has fewer than 2 points or zero
/// variance; the degeneracy is checked explicitly rather than left to a
/// division error.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> VarResult<f64> {
    check_same_length(actual, predicted)?;
    if actual.len() < 2 {
        return Ok(f64::NAN);
    }
    let mean = calculate_mean(actual);
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(f64::NAN);
    }
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(1.0 - ss_res / ss_tot)
}

fn check_same_length(actual: &[f64], predicted: &[f64]) -> VarResult<()> {
    if actual.len() != predicted.len() {
        return Err(VarAnalysisError::DimensionMismatch {
            expected: actual.len(),
            actual: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(VarAnalysisError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    Ok(())
}

/// Original-scale train/test metrics for every fitted lag order.
///
/// `train`/`test` are the transformed (differenced, standardized)
/// partitions the models were fit on; `original` is the full untransformed
/// series supplying anchors and ground truth for `target`. Returns
/// `(train_metrics, test_metrics)` keyed by lag order in sorted order; a
/// lag whose evaluation fails anywhere records [`ForecastScores::nan`] in
/// both maps.
pub fn evaluate_models(
    models: &BTreeMap<usize, FittedVarModel>,
    train: &MultivariateSeries,
    test: &MultivariateSeries,
    forecast_steps: usize,
    target: &str,
    scaler: &StandardScaler,
    original: &MultivariateSeries,
) -> (
    BTreeMap<usize, ForecastScores>,
    BTreeMap<usize, ForecastScores>,
) {
    let mut train_metrics = BTreeMap::new();
    let mut test_metrics = BTreeMap::new();

    for (&p, model) in models {
        match evaluate_single_lag(model, train, test, forecast_steps, target, scaler, original) {
            Ok((train_scores, test_scores)) => {
                train_metrics.insert(p, train_scores);
                test_metrics.insert(p, test_scores);
            }
            Err(e) => {
                log::warn!("evaluation failed for p={}: {}", p, e);
                train_metrics.insert(p, ForecastScores::nan());
                test_metrics.insert(p, ForecastScores::nan());
            }
        }
    }

    (train_metrics, test_metrics)
}

fn evaluate_single_lag(
    model: &FittedVarModel,
    train: &MultivariateSeries,
    test: &MultivariateSeries,
    forecast_steps: usize,
    target: &str,
    scaler: &StandardScaler,
    original: &MultivariateSeries,
) -> VarResult<(ForecastScores, ForecastScores)> {
    let p = model.p();
    let target_pos = train
        .names()
        .iter()
        .position(|n| n == target)
        .ok_or_else(|| VarAnalysisError::VariableNotFound {
            name: target.to_string(),
        })?;
    let original_target = original.column(target)?;
    let train_len = train.len();

    if train_len < p + 1 {
        return Err(VarAnalysisError::InsufficientData {
            required: p + 1,
            actual: train_len,
        });
    }

    // Train window: forecast the last p rows from the p rows before them.
    let seed_train: Vec<Vec<f64>> = (train_len - p..train_len).map(|i| train.row(i)).collect();
    let pred_train = model.forecast(&seed_train, p)?;
    let pred_train = scaler.inverse_transform_rows(&pred_train)?;
    let pred_train_target: Vec<f64> = pred_train.iter().map(|row| row[target_pos]).collect();

    let anchor_idx = train_len
        .checked_sub(1 + p)
        .ok_or(VarAnalysisError::InsufficientData {
            required: p + 1,
            actual: train_len,
        })?;
    let window_end = train_len;
    let window_start = train_len - p;
    if window_end > original_target.len() {
        return Err(VarAnalysisError::DimensionMismatch {
            expected: window_end,
            actual: original_target.len(),
        });
    }
    let anchor_train = original_target[anchor_idx];
    let y_pred_train = cumulative_reconstruct(&pred_train_target, anchor_train);
    let y_real_train = &original_target[window_start..window_end];

    let train_scores = ForecastScores {
        mae: mean_absolute_error(y_real_train, &y_pred_train)?,
        rmse: root_mean_squared_error(y_real_train, &y_pred_train)?,
        r_squared: r_squared(y_real_train, &y_pred_train)?,
    };

    // Test window: forecast from the first p test rows, anchored at the
    // last original-scale training value.
    if test.len() < p {
        return Err(VarAnalysisError::InsufficientData {
            required: p,
            actual: test.len(),
        });
    }
    let seed_test: Vec<Vec<f64>> = (0..p).map(|i| test.row(i)).collect();
    let pred_test = model.forecast(&seed_test, forecast_steps)?;
    let pred_test = scaler.inverse_transform_rows(&pred_test)?;
    let pred_test_target: Vec<f64> = pred_test.iter().map(|row| row[target_pos]).collect();

    if train_len + forecast_steps > original_target.len() {
        return Err(VarAnalysisError::DimensionMismatch {
            expected: train_len + forecast_steps,
            actual: original_target.len(),
        });
    }
    let anchor_test = original_target[train_len - 1];
    let y_pred_test = cumulative_reconstruct(&pred_test_target, anchor_test);
    let y_real_test = &original_target[train_len..train_len + forecast_steps];

    let test_scores = ForecastScores {
        mae: mean_absolute_error(y_real_test, &y_pred_test)?,
        rmse: root_mean_squared_error(y_real_test, &y_pred_test)?,
        r_squared: r_squared(y_real_test, &y_pred_test)?,
    };

    Ok((train_scores, test_scores))
}

/// One row of the residual whiteness table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResidualDiagnostic {
    /// Lag order of the model the residuals came from.
    pub lag_order: usize,
    /// Variable whose residuals were tested.
    pub variable: String,
    /// Ljung-Box p-value.
    pub p_value: f64,
    /// Whether the residuals show autocorrelation at the 5% level.
    pub autocorrelated: bool,
}

/// Ljung-Box whiteness test on every model's residuals, one row per
/// (lag order, variable), sorted by lag order then variable name.
///
/// A variable whose test cannot be computed (residual sample too short) is
/// skipped with a warning.
pub fn residual_autocorrelation(
    models: &BTreeMap<usize, FittedVarModel>,
    ljung_lags: usize,
) -> Vec<ResidualDiagnostic> {
    let mut table = Vec::new();
    for (&p, model) in models {
        let mut rows = Vec::new();
        for (pos, name) in model.names().iter().enumerate() {
            let residuals = model.residual_column(pos);
            match ljung_box_test(&residuals, ljung_lags) {
                Ok((_, p_value)) => rows.push(ResidualDiagnostic {
                    lag_order: p,
                    variable: name.clone(),
                    p_value,
                    autocorrelated: p_value <= 0.05,
                }),
                Err(e) => {
                    log::warn!("Ljung-Box failed for p={} variable {}: {}", p, name, e)
                }
            }
        }
        rows.sort_by(|a, b| a.variable.cmp(&b.variable));
        table.extend(rows);
    }
    table
}
