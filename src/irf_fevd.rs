//! Impulse responses and Cholesky-orthogonalized forecast-error variance
//! decomposition.
//!
//! Both structures are pure functions of a fitted model and a horizon
//! count. Shocks are orthogonalized through the lower-triangular Cholesky
//! factor of the residual covariance, so the variable ordering of the model
//! is also the causal ordering of the decomposition.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{VarAnalysisError, VarResult};
use crate::linear_algebra::{cholesky_lower, identity, mat_mul};
use crate::var_model::FittedVarModel;

/// Raw and orthogonalized dynamic multipliers up to a horizon.
///
/// Indexed `[horizon][responding variable][impulse variable]`, horizons
/// `0..=steps` as produced by [`impulse_responses`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImpulseResponseSet {
    names: Vec<String>,
    raw: Vec<Vec<Vec<f64>>>,
    orthogonalized: Vec<Vec<Vec<f64>>>,
}

impl ImpulseResponseSet {
    /// Variable names defining both matrix axes.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of horizons, including horizon 0.
    pub fn horizons(&self) -> usize {
        self.raw.len()
    }

    /// Raw multipliers Ψ, `[horizon][responding][impulse]`.
    pub fn raw(&self) -> &[Vec<Vec<f64>>] {
        &self.raw
    }

    /// Orthogonalized multipliers Θ = Ψ·P, `[horizon][responding][impulse]`.
    pub fn orthogonalized(&self) -> &[Vec<Vec<f64>>] {
        &self.orthogonalized
    }

    /// Tabular view for the external exporter: one column per ordered
    /// (responding, impulse) pair named `"{responding}_resp_to_{impulse}"`,
    /// one value per horizon.
    pub fn to_columns(&self) -> Vec<(String, Vec<f64>)> {
        let k = self.names.len();
        let mut columns = Vec::with_capacity(k * k);
        for i in 0..k {
            for j in 0..k {
                let label = format!("{}_resp_to_{}", self.names[i], self.names[j]);
                let values = self.raw.iter().map(|m| m[i][j]).collect();
                columns.push((label, values));
            }
        }
        columns
    }
}

/// Normalized forecast-error variance shares.
///
/// Indexed `[horizon][affected variable][causing variable]`, horizons
/// `0..steps` as produced by [`fevd_cholesky`]. For every horizon ≥ 1 each
/// affected variable's shares sum to 1 (or are uniformly 1/n when the
/// accumulated variance is exactly zero).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FevdTable {
    names: Vec<String>,
    shares: Vec<Vec<Vec<f64>>>,
}

impl FevdTable {
    /// Variable names defining both matrix axes.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of horizons.
    pub fn horizons(&self) -> usize {
        self.shares.len()
    }

    /// Share of `affected`'s forecast-error variance attributed to
    /// `causing` at `horizon`.
    pub fn share(&self, horizon: usize, affected: usize, causing: usize) -> f64 {
        self.shares[horizon][affected][causing]
    }

    /// All shares, `[horizon][affected][causing]`.
    pub fn shares(&self) -> &[Vec<Vec<f64>>] {
        &self.shares
    }

    /// Tabular view for the external exporter: one column per ordered
    /// (affected, causing) pair named `"{affected}_caused_by_{causing}"`,
    /// one value per horizon.
    pub fn to_columns(&self) -> Vec<(String, Vec<f64>)> {
        let k = self.names.len();
        let mut columns = Vec::with_capacity(k * k);
        for i in 0..k {
            for j in 0..k {
                let label = format!("{}_caused_by_{}", self.names[i], self.names[j]);
                let values = self.shares.iter().map(|m| m[i][j]).collect();
                columns.push((label, values));
            }
        }
        columns
    }
}

/// MA coefficient matrices Ψ_0..Ψ_{count-1} from the recursion
/// Ψ_0 = I, Ψ_s = Σ_{j=1..min(s,p)} A_j · Ψ_{s-j}.
fn ma_coefficients(model: &FittedVarModel, count: usize) -> VarResult<Vec<Vec<Vec<f64>>>> {
    let k = model.num_vars();
    let mut psi: Vec<Vec<Vec<f64>>> = Vec::with_capacity(count);
    if count == 0 {
        return Ok(psi);
    }
    psi.push(identity(k));
    for s in 1..count {
        let mut acc = vec![vec![0.0; k]; k];
        for j in 1..=model.p().min(s) {
            let term = mat_mul(model.coef_matrix(j), &psi[s - j])?;
            for i in 0..k {
                for c in 0..k {
                    acc[i][c] += term[i][c];
                }
            }
        }
        psi.push(acc);
    }
    Ok(psi)
}

/// Raw and Cholesky-orthogonalized impulse responses for horizons
/// `0..=steps`.
///
/// # Errors
/// `NonPositiveDefiniteCovariance` when Σ has no Cholesky factor,
/// `DimensionMismatch` when Σ does not match the variable count.
pub fn impulse_responses(model: &FittedVarModel, steps: usize) -> VarResult<ImpulseResponseSet> {
    validate_sigma_shape(model)?;
    let p_factor = cholesky_lower(model.sigma_u())?;

    let raw = ma_coefficients(model, steps + 1)?;
    let orthogonalized = raw
        .iter()
        .map(|psi| mat_mul(psi, &p_factor))
        .collect::<VarResult<Vec<_>>>()?;

    Ok(ImpulseResponseSet {
        names: model.names().to_vec(),
        raw,
        orthogonalized,
    })
}

/// Cholesky-orthogonalized FEVD for horizons `0..steps`.
///
/// Horizon 0 attributes all variance to the variable itself (identity
/// share matrix) by convention, rather than deriving the shares from Θ_0;
/// downstream consumers rely on that fixed point. For `h ≥ 1` the
/// share of variable `i`'s variance attributed to shock `j` is the running
/// sum of Θ_s[i][j]² over `s = 0..h`, normalized across `j`; a zero total
/// falls back to a uniform 1/n split.
pub fn fevd_cholesky(model: &FittedVarModel, steps: usize) -> VarResult<FevdTable> {
    let k = model.num_vars();
    validate_sigma_shape(model)?;
    if steps == 0 {
        return Err(VarAnalysisError::InvalidParameter {
            parameter: "steps".to_string(),
            value: 0.0,
            constraint: "must be > 0".to_string(),
        });
    }

    let p_factor = cholesky_lower(model.sigma_u())?;
    let psi = ma_coefficients(model, steps)?;
    let theta: Vec<Vec<Vec<f64>>> = psi
        .iter()
        .map(|m| mat_mul(m, &p_factor))
        .collect::<VarResult<Vec<_>>>()?;

    let mut shares = Vec::with_capacity(steps);
    shares.push(identity(k));
    for h in 1..steps {
        let mut acc = vec![vec![0.0; k]; k];
        let mut totals = vec![0.0; k];
        for theta_s in theta.iter().take(h + 1) {
            for i in 0..k {
                for j in 0..k {
                    let sq = theta_s[i][j] * theta_s[i][j];
                    acc[i][j] += sq;
                    totals[i] += sq;
                }
            }
        }
        normalize_shares(&mut acc, &totals);
        shares.push(acc);
    }

    Ok(FevdTable {
        names: model.names().to_vec(),
        shares,
    })
}

/// Normalize each affected variable's accumulated contributions to sum to
/// one; a zero total splits uniformly across causes instead of dividing by
/// zero.
fn normalize_shares(acc: &mut [Vec<f64>], totals: &[f64]) {
    let k = totals.len();
    for (row, &total) in acc.iter_mut().zip(totals) {
        if total == 0.0 {
            for v in row.iter_mut() {
                *v = 1.0 / k as f64;
            }
        } else {
            for v in row.iter_mut() {
                *v /= total;
            }
        }
    }
}

fn validate_sigma_shape(model: &FittedVarModel) -> VarResult<()> {
    let k = model.num_vars();
    let sigma = model.sigma_u();
    if sigma.len() != k || sigma.iter().any(|row| row.len() != k) {
        return Err(VarAnalysisError::DimensionMismatch {
            expected: k,
            actual: sigma.len(),
        });
    }
    Ok(())
}
