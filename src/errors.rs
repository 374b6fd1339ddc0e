//! Error types and validation functions for VAR time series analysis.
//!
//! This module provides error handling for the whole pipeline: input
//! validation, numerical preconditions, and operation-specific failures.
//! Validation and numerical-precondition errors abort the specific operation
//! without partially mutating caller state; advisory conditions (non-annual
//! input, model instability) are logged by the components instead and never
//! appear here.

use thiserror::Error;

/// Error types for VAR analysis operations.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum VarAnalysisError {
    /// Interpolation target frequency is not on the escalation ladder.
    #[error("Invalid target frequency: '{frequency}', expected one of Annual, Quarterly, Monthly, Daily")]
    InvalidFrequency {
        /// The rejected frequency label
        frequency: String,
    },

    /// Log-transform requested on a series containing zeros or negatives.
    #[error("Series contains zero or negative values: log-transform is not applicable")]
    NonPositiveForLog,

    /// Higher-order interpolation called with too few known points.
    #[error("Interpolation with '{method}' requires at least {required} non-missing points, got {actual}")]
    InsufficientPoints {
        /// Interpolation method that was rejected
        method: String,
        /// Minimum required known points
        required: usize,
        /// Known points available when the method ran
        actual: usize,
    },

    /// Residual covariance matrix has no Cholesky factorization.
    #[error("Residual covariance matrix ({size}x{size}) is not positive definite")]
    NonPositiveDefiniteCovariance {
        /// Dimension of the offending matrix
        size: usize,
    },

    /// Insufficient data for the requested operation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid parameter value.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Numerical computation failed due to instability or degeneracy.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for the failure
        reason: String,
        /// Operation that failed
        operation: Option<String>,
    },

    /// Matrix or vector dimensions do not match the variable count.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Named variable does not exist in the multivariate series.
    #[error("Variable not found: {name}")]
    VariableNotFound {
        /// Name of the missing variable
        name: String,
    },
}

/// Result type for VAR analysis operations.
pub type VarResult<T> = Result<T, VarAnalysisError>;

/// Validates that data has sufficient length for an operation.
pub fn validate_data_length(data: &[f64], min_required: usize) -> VarResult<()> {
    if data.len() < min_required {
        return Err(VarAnalysisError::InsufficientData {
            required: min_required,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Validates that a slice contains only finite values.
pub fn validate_all_finite(data: &[f64], operation: &str) -> VarResult<()> {
    for (i, &val) in data.iter().enumerate() {
        if !val.is_finite() {
            return Err(VarAnalysisError::NumericalError {
                reason: format!("Non-finite value ({}) at position [{}]", val, i),
                operation: Some(operation.to_string()),
            });
        }
    }
    Ok(())
}
