//! Analysis configuration.
//!
//! Defaults mirror the conventional settings for macro-financial VAR work:
//! 5% ADF significance, 0.90 correlation screen, Ljung-Box at 10 lags, and
//! a 40-step decomposition horizon.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{VarAnalysisError, VarResult};

/// Configuration for the sequential VAR analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisConfig {
    /// Significance level for the ADF stationarity decision.
    pub adf_alpha: f64,
    /// Absolute correlation above which a variable pair is reported.
    pub correlation_threshold: f64,
    /// Lag count for the residual Ljung-Box test.
    pub ljung_box_lags: usize,
    /// Steps ahead forecast on the test window.
    pub forecast_steps: usize,
    /// Horizon count for the FEVD/IRF decomposition.
    pub fevd_steps: usize,
    /// Fraction of rows assigned to the training partition.
    pub train_ratio: f64,
    /// Lag orders to fit and compare.
    pub lag_orders: Vec<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            adf_alpha: 0.05,
            correlation_threshold: 0.90,
            ljung_box_lags: 10,
            forecast_steps: 5,
            fevd_steps: 40,
            train_ratio: 0.8,
            lag_orders: vec![1, 2, 3],
        }
    }
}

impl AnalysisConfig {
    /// Validate the configuration before running the pipeline.
    pub fn validate(&self) -> VarResult<()> {
        if !(self.adf_alpha > 0.0 && self.adf_alpha < 1.0) {
            return Err(VarAnalysisError::InvalidParameter {
                parameter: "adf_alpha".to_string(),
                value: self.adf_alpha,
                constraint: "0 < alpha < 1".to_string(),
            });
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(VarAnalysisError::InvalidParameter {
                parameter: "train_ratio".to_string(),
                value: self.train_ratio,
                constraint: "0 < ratio < 1".to_string(),
            });
        }
        if self.lag_orders.is_empty() {
            return Err(VarAnalysisError::InvalidParameter {
                parameter: "lag_orders".to_string(),
                value: 0.0,
                constraint: "at least one lag order".to_string(),
            });
        }
        if self.lag_orders.contains(&0) {
            return Err(VarAnalysisError::InvalidParameter {
                parameter: "lag_orders".to_string(),
                value: 0.0,
                constraint: "lag orders must be positive".to_string(),
            });
        }
        if self.forecast_steps == 0 || self.fevd_steps == 0 {
            return Err(VarAnalysisError::InvalidParameter {
                parameter: "steps".to_string(),
                value: 0.0,
                constraint: "forecast and FEVD steps must be positive".to_string(),
            });
        }
        Ok(())
    }
}
