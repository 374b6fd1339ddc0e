//! # VAR Dynamics
//!
//! Macro-financial multivariate time series analysis: frequency escalation
//! of annual data, reversible preprocessing for Vector Autoregression,
//! model estimation with stability certification, impulse response and
//! forecast-error variance decomposition, and original-scale forecast
//! accuracy metrics.
//!
//! The crate is built around one hard invariant: every transform applied
//! before modeling — log, stationarity differencing, standardization — is
//! recorded in an explicit [`TransformRecord`] and undone in exact reverse
//! order before any real-scale metric is computed.
//!
//! ## Key Features
//!
//! - **Frequency escalation**: annual series raised to quarterly, monthly,
//!   or daily grids through a stepwise ladder, with linear, quadratic,
//!   cubic-spline, or forward-fill interpolation, optionally in log space
//! - **Reversible transform stack**: ADF-driven differencing and
//!   train-fitted standardization with exact inversion
//! - **VAR estimation**: least-squares fit per equation, companion-matrix
//!   stability certification (advisory, never fatal)
//! - **Structural decomposition**: Cholesky-orthogonalized impulse
//!   responses and normalized forecast-error variance shares
//! - **Forecast evaluation**: MAE/RMSE/R² on the original scale, per lag
//!   order, with per-lag failure isolation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use var_dynamics::{
//!     AnalysisConfig, Frequency, MultivariateSeries, TimeSeries, VarPipeline,
//! };
//! use chrono::NaiveDate;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Two annual macro series on a shared index.
//!     let index = Frequency::Annual.date_range(
//!         NaiveDate::from_ymd_opt(1960, 1, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
//!     );
//!     let gdp = TimeSeries::from_parts("gdp", index.clone(), load_gdp())?;
//!     let debt = TimeSeries::from_parts("debt", index, load_debt())?;
//!     let series = MultivariateSeries::from_columns(vec![gdp, debt])?;
//!
//!     // Stationarity pass, standardization, VAR fits, metrics.
//!     let pipeline = VarPipeline::new(AnalysisConfig::default())?;
//!     let outcome = pipeline.run(&series, "gdp")?;
//!
//!     for (p, scores) in &outcome.test_metrics {
//!         println!("VAR({}): test MAE = {:.3}, RMSE = {:.3}", p, scores.mae, scores.rmse);
//!     }
//!
//!     // Structural decomposition of the best model.
//!     let model = &outcome.models[&1];
//!     let fevd = var_dynamics::fevd_cholesky(model, 40)?;
//!     for (label, shares) in fevd.to_columns() {
//!         println!("{}: {:.3} at the last horizon", label, shares.last().unwrap());
//!     }
//!     Ok(())
//! }
//! # fn load_gdp() -> Vec<f64> { unimplemented!() }
//! # fn load_debt() -> Vec<f64> { unimplemented!() }
//! ```
//!
//! ## Architecture
//!
//! Components form one sequential chain per series: the interpolator
//! ([`escalate`]) feeds the transform stack ([`enforce_stationarity`],
//! [`standardize_train_test`]), whose output is consumed by the estimator
//! ([`FittedVarModel::fit`]). The fitted model feeds both the
//! decomposition engine ([`impulse_responses`], [`fevd_cholesky`]) and the
//! metric evaluator ([`evaluate_models`]). [`VarPipeline`] wires the chain
//! end to end; each piece is also usable on its own.
//!
//! Rendering of plots and file export are deliberately out of scope; the
//! decomposition and diagnostic types expose labeled tabular views
//! (`to_columns`) for an external exporter.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod errors;
pub mod evaluation;
pub mod interpolation;
pub mod irf_fevd;
pub mod linear_algebra;
pub mod math_utils;
pub mod pipeline;
pub mod preprocessing;
pub mod series;
pub mod var_model;

// Core type exports
pub use config::AnalysisConfig;
pub use errors::{VarAnalysisError, VarResult};
pub use series::{Frequency, MultivariateSeries, TimeSeries, DATE_INDEX_LABEL};

// Interpolation exports
pub use interpolation::{escalate, InterpolationMethod, InterpolationOptions};

// Preprocessing exports
pub use preprocessing::{
    cumulative_reconstruct, enforce_stationarity, high_correlation_pairs,
    log_transform_candidates, standardize_train_test, StandardScaler, StationarityOutcome,
    TransformOp, TransformRecord,
};

// Statistical test exports
pub use statistical_tests::{
    augmented_dickey_fuller, augmented_dickey_fuller_with_max_lag, ljung_box_test, TestResult,
};

// Model exports
pub use var_model::FittedVarModel;

// Decomposition exports
pub use irf_fevd::{fevd_cholesky, impulse_responses, FevdTable, ImpulseResponseSet};

// Evaluation exports
pub use evaluation::{
    evaluate_models, mean_absolute_error, r_squared, residual_autocorrelation,
    root_mean_squared_error, ForecastScores, ResidualDiagnostic,
};

// Pipeline exports
pub use pipeline::{PipelineOutcome, VarPipeline};
