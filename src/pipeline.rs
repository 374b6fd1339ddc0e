//! Sequential orchestration of the full analysis chain.
//!
//! The pipeline wires the components in their only valid order:
//! stationarity pass → correlation diagnostic → train/test split →
//! standardization → per-lag VAR fits → metric evaluation and residual
//! diagnostics. Everything is synchronous and value-passing; advisory
//! conditions are logged and never abort the run.

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::errors::{VarAnalysisError, VarResult};
use crate::evaluation::{evaluate_models, residual_autocorrelation, ForecastScores, ResidualDiagnostic};
use crate::preprocessing::{
    enforce_stationarity, high_correlation_pairs, standardize_train_test, StandardScaler,
    TransformRecord,
};
use crate::series::MultivariateSeries;
use crate::var_model::FittedVarModel;

/// Everything produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Per-variable stationarity verdicts from the ADF pass.
    pub stationary: BTreeMap<String, bool>,
    /// Variables that were first-differenced.
    pub differenced: Vec<String>,
    /// Variable pairs above the correlation threshold, strongest first.
    pub high_correlations: Vec<(String, String, f64)>,
    /// Per-variable transform records (differencing + standardization).
    pub records: BTreeMap<String, TransformRecord>,
    /// Scaler fit on the training partition.
    pub scaler: StandardScaler,
    /// Transformed training partition.
    pub train: MultivariateSeries,
    /// Transformed test partition.
    pub test: MultivariateSeries,
    /// Fitted models keyed by lag order; iteration is sorted by lag.
    pub models: BTreeMap<usize, FittedVarModel>,
    /// Original-scale training-window metrics per lag order.
    pub train_metrics: BTreeMap<usize, ForecastScores>,
    /// Original-scale test-window metrics per lag order.
    pub test_metrics: BTreeMap<usize, ForecastScores>,
    /// Ljung-Box whiteness table over all fitted models.
    pub residual_diagnostics: Vec<ResidualDiagnostic>,
}

/// Runs the sequential VAR analysis chain for one target variable.
#[derive(Debug, Clone, Default)]
pub struct VarPipeline {
    config: AnalysisConfig,
}

impl VarPipeline {
    /// Pipeline with the given configuration.
    pub fn new(config: AnalysisConfig) -> VarResult<Self> {
        config.validate()?;
        Ok(VarPipeline { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the full chain on an original-scale multivariate series.
    ///
    /// `target` names the variable whose forecasts are scored. Models that
    /// fail to fit for a lag order are skipped with a warning; evaluation
    /// failures are isolated per lag by the evaluator itself.
    pub fn run(&self, original: &MultivariateSeries, target: &str) -> VarResult<PipelineOutcome> {
        if !original.names().iter().any(|n| n == target) {
            return Err(VarAnalysisError::VariableNotFound {
                name: target.to_string(),
            });
        }

        let outcome = enforce_stationarity(original, self.config.adf_alpha)?;
        let transformed = outcome.series;
        let mut records = outcome.records;

        let high_correlations =
            high_correlation_pairs(&transformed, self.config.correlation_threshold);

        let split = ((transformed.len() as f64) * self.config.train_ratio).floor() as usize;
        if split == 0 || split >= transformed.len() {
            return Err(VarAnalysisError::InsufficientData {
                required: 2,
                actual: transformed.len(),
            });
        }
        let (train_raw, test_raw) = transformed.split_at(split);
        let (train, test, scaler) = standardize_train_test(&train_raw, &test_raw, &mut records)?;

        let mut models = BTreeMap::new();
        for &p in &self.config.lag_orders {
            match FittedVarModel::fit(&train, p) {
                Ok(model) => {
                    models.insert(p, model);
                }
                Err(e) => log::warn!("VAR(p={}) fit failed: {}", p, e),
            }
        }
        if models.is_empty() {
            return Err(VarAnalysisError::NumericalError {
                reason: "No lag order produced a fitted model".to_string(),
                operation: Some("pipeline".to_string()),
            });
        }

        let (train_metrics, test_metrics) = evaluate_models(
            &models,
            &train,
            &test,
            self.config.forecast_steps,
            target,
            &scaler,
            original,
        );
        let residual_diagnostics = residual_autocorrelation(&models, self.config.ljung_box_lags);

        Ok(PipelineOutcome {
            stationary: outcome.stationary,
            differenced: outcome.differenced,
            high_correlations,
            records,
            scaler,
            train,
            test,
            models,
            train_metrics,
            test_metrics,
            residual_diagnostics,
        })
    }
}
